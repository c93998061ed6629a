use crate::auth;
use crate::handlers::{self, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest request body accepted (login payloads only).
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the application router.
///
/// `/health` stays outside the session check and the rate limiter. The governor
/// keys on the client IP, so the server must be run with connect info.
pub fn build_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let dashboard_routes = Router::new()
        .route("/api/v1/overview", get(handlers::overview))
        .route("/api/v1/content", get(handlers::content))
        .route("/api/v1/leads", get(handlers::leads))
        .route("/api/v1/leads/:id", get(handlers::lead_detail))
        .route("/api/v1/funnel", get(handlers::funnel))
        .route("/api/v1/signal-types", get(handlers::signal_types))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_session,
        ));

    let mut api_routes = Router::new()
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/session", get(auth::session))
        .merge(dashboard_routes)
        // Request size limit
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    if state.config.rate_limit_enabled {
        // Rate limiting: 10 req/sec per IP, burst of 20
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(10)
                .burst_size(20)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
        );
        api_routes = api_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }));
    } else {
        tracing::warn!("Rate limiting disabled");
    }

    Ok(Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()))
}
