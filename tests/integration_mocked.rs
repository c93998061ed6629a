/// Integration tests with a mocked gated content edge function
/// Exercises the upstream client and the full router without network access
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use gated_content_analytics::config::{hash_password, Config};
use gated_content_analytics::errors::AppError;
use gated_content_analytics::gated_content_client::{GatedContentClient, LeadsQuery};
use gated_content_analytics::handlers::AppState;
use gated_content_analytics::routes::build_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{header as header_matcher, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PASSWORD: &str = "quarter-close";

/// Helper function to create test config
fn create_test_config(api_url: String) -> Config {
    Config {
        port: 3000,
        gated_content_api_url: api_url,
        gated_content_api_key: Some("anon-key".to_string()),
        dashboard_password_sha256: hash_password(PASSWORD),
        session_ttl_secs: 3600,
        upstream_timeout_secs: 5,
        response_cache_ttl_secs: 0,
        leads_limit: 200,
        trend_days: 30,
        rate_limit_enabled: false,
    }
}

fn overview_body() -> Value {
    json!({
        "total_downloads": 42,
        "high_quality_count": 12,
        "high_quality_pct": 28.6,
        "converted_count": 3,
        "converted_pct": 7.1,
        "avg_score": 88.5,
        "by_tier": {"P0": 4, "P1": 8, "P2": 10, "P3": 20},
        "by_status": {"new": 30, "working": 5, "researching": 2, "done": 3, "rejected": 2},
        "by_signal_type": [],
        "by_content": [
            {"content_name": "Close Playbook", "signal_type": "webflow_content_download",
             "downloads": 20, "high_quality": 8, "quality_pct": 40.0, "converted": 2, "converted_pct": 10.0}
        ],
        "by_persona": [
            {"persona": "CFO", "downloads": 15, "pct": 35.7}
        ],
        "available_signal_types": [
            {"value": "webflow_content_download", "label": "Gated Content"}
        ]
    })
}

fn leads_body() -> Value {
    json!({
        "leads": [
            {
                "id": "lead-mql",
                "email": "cfo@acme.io",
                "first_name": "Dana",
                "last_name": "Reyes",
                "company_name": "Acme",
                "signal_tier": "P0",
                "action_status": "done",
                "rejection_reason": "auto_linked_to_discovery",
                "icp_fit_score": 65,
                "persona_score": 35,
                "intent_score": 30,
                "total_score": 170,
                "content_name": "Close Playbook",
                "created_at": "2026-01-10T12:00:00Z"
            },
            {
                "id": "lead-new",
                "email": "analyst@globex.com",
                "company_name": "Globex",
                "signal_tier": "P3",
                "action_status": "new",
                "total_score": 40,
                "content_name": "Webinar",
                "created_at": "2026-01-12T09:30:00Z",
                "ai_research": "not an object"
            }
        ]
    })
}

async fn mount_action(server: &MockServer, action: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path("/gated-content-api"))
        .and(query_param("action", action))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

async fn app_for(server: &MockServer) -> Router {
    let state = AppState::new(create_test_config(server.uri())).unwrap();
    build_router(Arc::new(state)).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(app: &Router) -> String {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "password": PASSWORD }).to_string()))
        .unwrap();
    let (status, headers, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    let cookie = headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("gca_session="));
    assert!(cookie.contains("HttpOnly"));
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_client_sends_action_and_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gated-content-api"))
        .and(query_param("action", "overview"))
        .and(header_matcher("apikey", "anon-key"))
        .and(header_matcher("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GatedContentClient::new(&create_test_config(mock_server.uri())).unwrap();
    let overview = client.overview().await.unwrap();

    assert_eq!(overview.total_downloads, 42);
    assert_eq!(overview.by_tier.p3, 20);
    assert_eq!(overview.by_persona[0].persona, "CFO");
}

#[tokio::test]
async fn test_leads_query_is_forwarded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gated-content-api"))
        .and(query_param("action", "leads"))
        .and(query_param("limit", "50"))
        .and(query_param("tier", "P0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(leads_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = GatedContentClient::new(&create_test_config(mock_server.uri())).unwrap();
    let query = LeadsQuery {
        limit: 50,
        tier: Some("P0".to_string()),
        ..Default::default()
    };
    let leads = client.leads(&query).await.unwrap();

    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0].signal_tier, "P0");
    // Malformed research payloads decode as absent
    assert!(leads[1].ai_research.is_none());
}

#[tokio::test]
async fn test_missing_envelope_arrays_decode_empty() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "trend", 200, json!({})).await;
    mount_action(&mock_server, "content-summary", 200, json!({"content": null})).await;

    let client = GatedContentClient::new(&create_test_config(mock_server.uri())).unwrap();
    assert!(client.trend(30).await.unwrap().is_empty());
    assert!(client.content_summary().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_error_message_is_verbatim() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "overview", 400, json!({"error": "Unknown action: overview"})).await;
    mount_action(&mock_server, "trend", 500, json!({"detail": "boom"})).await;

    let client = GatedContentClient::new(&create_test_config(mock_server.uri())).unwrap();

    match client.overview().await {
        Err(AppError::Upstream { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Unknown action: overview");
        }
        other => panic!("expected upstream error, got {:?}", other.map(|_| ())),
    }

    match client.trend(7).await {
        Err(AppError::Upstream { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "API request failed");
        }
        other => panic!("expected upstream error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_circuit_opens_after_repeated_outages() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "overview", 503, json!({"error": "edge function down"})).await;

    let client = GatedContentClient::new(&create_test_config(mock_server.uri())).unwrap();

    for _ in 0..5 {
        assert!(matches!(
            client.overview().await,
            Err(AppError::Upstream { status: 503, .. })
        ));
    }
    assert!(matches!(
        client.overview().await,
        Err(AppError::UpstreamUnavailable(_))
    ));
}

#[tokio::test]
async fn test_client_errors_do_not_open_circuit() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "overview", 404, json!({"error": "not found"})).await;

    let client = GatedContentClient::new(&create_test_config(mock_server.uri())).unwrap();

    for _ in 0..8 {
        assert!(matches!(
            client.overview().await,
            Err(AppError::Upstream { status: 404, .. })
        ));
    }
}

#[tokio::test]
async fn test_response_cache_serves_repeat_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gated-content-api"))
        .and(query_param("action", "overview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(overview_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(mock_server.uri());
    config.response_cache_ttl_secs = 60;
    let client = GatedContentClient::new(&config).unwrap();

    let first = client.overview().await.unwrap();
    let second = client.overview().await.unwrap();
    assert_eq!(first.total_downloads, second.total_downloads);
}

#[tokio::test]
async fn test_health_is_public() {
    let mock_server = MockServer::start().await;
    let app = app_for(&mock_server).await;

    let (status, _, body) = send(&app, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_dashboard_requires_session() {
    let mock_server = MockServer::start().await;
    let app = app_for(&mock_server).await;

    let (status, _, body) = send(&app, get("/api/v1/overview", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _, _) = send(&app, get("/api/v1/overview", Some("forged"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let mock_server = MockServer::start().await;
    let app = app_for(&mock_server).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "password": "guess" }).to_string()))
        .unwrap();
    let (status, headers, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid password");
    assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_overview_page_end_to_end() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "overview", 200, overview_body()).await;
    Mock::given(method("GET"))
        .and(path("/gated-content-api"))
        .and(query_param("action", "trend"))
        .and(query_param("days", "14"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "trend": [{"date": "2026-01-09", "downloads": 5, "high_quality": 2, "converted": 0}]
        })))
        .mount(&mock_server)
        .await;

    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(&app, get("/api/v1/overview?days=14", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["days"], 14);
    assert_eq!(body["metrics"][0]["value"], "42");
    assert_eq!(body["metrics"][3]["value"], "CFO");
    assert_eq!(body["trend"]["items"][0]["label"], "01/09");
    assert_eq!(body["trend"]["items"][0]["low_quality"], 3);
    assert_eq!(body["quality_distribution"]["items"].as_array().unwrap().len(), 4);
    assert_eq!(body["top_content"]["items"][0]["quality_band"], "high");
}

#[tokio::test]
async fn test_overview_fails_as_a_whole() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "overview", 200, overview_body()).await;
    mount_action(&mock_server, "trend", 502, json!({"error": "trend query timed out"})).await;

    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(&app, get("/api/v1/overview", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "trend query timed out");
}

#[tokio::test]
async fn test_leads_page_filters_sorts_and_classifies() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "leads", 200, leads_body()).await;

    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(
        &app,
        get("/api/v1/leads?sort=total_score&dir=asc", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fetched"], 2);
    assert_eq!(body["rows"]["items"][0]["id"], "lead-new");
    assert_eq!(body["rows"]["items"][1]["classification"]["stage"], "mql");
    assert_eq!(body["rows"]["items"][1]["display_name"], "Dana Reyes");
    assert_eq!(body["funnel"]["mql"], 1);
    assert_eq!(body["funnel"]["conversion_rate"], 50.0);

    let (_, _, body) = send(&app, get("/api/v1/leads?q=GLOBEX", Some(&token))).await;
    assert_eq!(body["matching"], 1);
    assert_eq!(body["rows"]["items"][0]["status_label"], "New");

    let (_, _, body) = send(&app, get("/api/v1/leads?q=nobody", Some(&token))).await;
    assert_eq!(body["rows"]["empty_message"], "No leads found");

    let (status, _, _) = send(&app, get("/api/v1/leads?stage=sql", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lead_detail_and_missing_lead() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "leads", 200, leads_body()).await;

    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(&app, get("/api/v1/leads/lead-mql", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"]["mql"], true);
    assert_eq!(body["rejection"]["group"], "auto_linked");
    assert_eq!(body["scores"]["total"]["band"], "strong");

    let (status, _, body) = send(&app, get("/api/v1/leads/unknown", Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Lead unknown not found");
}

#[tokio::test]
async fn test_funnel_and_signal_types() {
    let mock_server = MockServer::start().await;
    mount_action(&mock_server, "leads", 200, leads_body()).await;

    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) =
        send(&app, get("/api/v1/funnel?content=Webinar", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["mql"], 0);

    let (status, _, body) = send(&app, get("/api/v1/signal-types", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let mock_server = MockServer::start().await;
    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(&app, get("/api/v1/auth/session", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], true);

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/logout")
        .header(header::COOKIE, format!("gca_session={}", token))
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .contains("Max-Age=0"));

    let (status, _, _) = send(&app, get("/api/v1/auth/session", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_null_fields_do_not_fail_pages() {
    let mock_server = MockServer::start().await;
    mount_action(
        &mock_server,
        "overview",
        200,
        json!({
            "total_downloads": 0,
            "avg_score": null,
            "high_quality_pct": null,
            "by_persona": null
        }),
    )
    .await;
    mount_action(&mock_server, "trend", 200, json!({ "trend": [] })).await;
    mount_action(
        &mock_server,
        "leads",
        200,
        json!({ "leads": [{
            "id": "lead-null",
            "email": null,
            "signal_tier": null,
            "action_status": null,
            "has_research": null,
            "in_salesforce": null,
            "in_discovery": null
        }] }),
    )
    .await;

    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(&app, get("/api/v1/overview", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trend"]["items"], json!([]));
    assert!(body["trend"]["empty_message"].is_string());

    let (status, _, body) = send(&app, get("/api/v1/leads", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matching"], 1);
    assert_eq!(body["rows"]["items"][0]["id"], "lead-null");
}

#[tokio::test]
async fn test_malformed_input_gets_json_error_body() {
    let mock_server = MockServer::start().await;
    let app = app_for(&mock_server).await;
    let token = login(&app).await;

    let (status, _, body) = send(&app, get("/api/v1/leads?limit=abc", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _, body) = send(&app, get("/api/v1/overview?days=-3", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap_or_default().contains("password"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_truncated_body_counts_as_outage() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Announces more bytes than it sends, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let response = concat!(
                "HTTP/1.1 200 OK\r\n",
                "content-type: application/json\r\n",
                "content-length: 512\r\n",
                "\r\n",
                "{\"total_dow",
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    let client =
        GatedContentClient::new(&create_test_config(format!("http://{}", addr))).unwrap();

    for _ in 0..5 {
        match client.overview().await {
            Err(err @ AppError::Upstream { status: 0, .. }) => assert!(err.is_upstream_outage()),
            other => panic!("expected transport error, got {:?}", other.map(|_| ())),
        }
    }
    assert!(matches!(
        client.overview().await,
        Err(AppError::UpstreamUnavailable(_))
    ));
}
