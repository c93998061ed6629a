//! Shared-password login backed by server-side sessions.
//!
//! The password is checked against its configured SHA-256 digest. A successful
//! login issues an opaque token kept in a TTL cache; protected routes accept it
//! as `Authorization: Bearer <token>` or as the `gca_session` cookie.

use crate::config::hash_password;
use crate::errors::{ApiJson, AppError};
use crate::handlers::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "gca_session";

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Session {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-memory session store. Entries expire with the configured TTL.
#[derive(Clone)]
pub struct SessionStore {
    password_sha256: String,
    ttl: Duration,
    sessions: Cache<String, Session>,
}

impl SessionStore {
    pub fn new(password_sha256: String, ttl_secs: u64) -> Self {
        let ttl = Duration::from_secs(ttl_secs.max(1));
        let sessions = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self {
            password_sha256: password_sha256.to_ascii_lowercase(),
            ttl,
            sessions,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn verify_password(&self, password: &str) -> bool {
        constant_time_compare(&hash_password(password), &self.password_sha256)
    }

    /// Checks the password and opens a session, returning its token.
    pub async fn login(&self, password: &str) -> Result<(String, Session), AppError> {
        if !self.verify_password(password) {
            tracing::warn!("Rejected dashboard login attempt");
            return Err(AppError::Unauthorized("Invalid password".to_string()));
        }

        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let created_at = Utc::now();
        let expires_at = created_at
            + ChronoDuration::from_std(self.ttl).unwrap_or_else(|_| ChronoDuration::hours(8));
        let session = Session {
            created_at,
            expires_at,
        };

        self.sessions.insert(token.clone(), session).await;
        tracing::info!("Dashboard session opened, expires at {}", expires_at);
        Ok((token, session))
    }

    /// Returns the live session for `token`, if any.
    pub async fn validate(&self, token: &str) -> Option<Session> {
        let session = self.sessions.get(token).await?;
        if session.expires_at <= Utc::now() {
            self.sessions.invalidate(token).await;
            return None;
        }
        Some(session)
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.sessions.remove(token).await.is_some()
    }
}

/// Token from `Authorization: Bearer` or, failing that, the session cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// Middleware guarding the dashboard API.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Missing session".to_string()))?;

    if state.sessions.validate(&token).await.is_none() {
        return Err(AppError::Unauthorized("Invalid or expired session".to_string()));
    }

    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Response, AppError> {
    let (token, session) = state.sessions.login(&payload.password).await?;

    let cookie = HeaderValue::from_str(&session_cookie(&token, state.sessions.ttl().as_secs()))
        .map_err(|e| AppError::InternalError(format!("Invalid session cookie: {}", e)))?;

    let mut response = Json(LoginResponse {
        token,
        expires_at: session.expires_at,
    })
    .into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// POST /api/v1/auth/logout
///
/// Always clears the cookie; the token, if any, is invalidated.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(token) = extract_token(&headers) {
        if state.sessions.logout(&token).await {
            tracing::info!("Dashboard session closed");
        }
    }

    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, session_cookie("", 0))],
    )
        .into_response()
}

/// GET /api/v1/auth/session
pub async fn session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let token = extract_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing session".to_string()))?;
    let session = state
        .sessions
        .validate(&token)
        .await
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

    Ok(Json(SessionResponse {
        authenticated: true,
        created_at: session.created_at,
        expires_at: session.expires_at,
    }))
}
