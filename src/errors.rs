use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Resource not found error.
    NotFound(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Missing, invalid or expired session, or a wrong password.
    Unauthorized(String),
    /// The gated content API answered, but not with a 2xx.
    ///
    /// `message` is the `error` field of the upstream body, kept verbatim.
    Upstream {
        /// HTTP status returned upstream (0 when the request never completed).
        status: u16,
        /// Message shown to the user.
        message: String,
    },
    /// Upstream calls are being short-circuited after repeated outages.
    UpstreamUnavailable(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Whether the failure points at the upstream being down rather than at the request.
    ///
    /// Only these count towards opening the upstream circuit breaker.
    pub fn is_upstream_outage(&self) -> bool {
        match self {
            AppError::Upstream { status, .. } => *status == 0 || *status >= 500,
            AppError::WithContext { source, .. } => source.is_upstream_outage(),
            _ => false,
        }
    }

    /// Message surfaced in the `{"error": ...}` body.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::UpstreamUnavailable(msg) => msg.clone(),
            AppError::Upstream { message, .. } => message.clone(),
            AppError::InternalError(_) => "Internal server error".to_string(),
            AppError::WithContext { source, .. } => source.user_message(),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::WithContext { source, .. } => source.status_code(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Upstream { status, message } => {
                write!(f, "Gated content API error ({}): {}", status, message)
            }
            AppError::UpstreamUnavailable(msg) => write!(f, "Upstream unavailable: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Every variant renders as `{"error": "<message>"}`. Upstream messages pass
    /// through untouched so the dashboard shows what the edge function said.
    fn into_response(self) -> Response {
        match &self {
            AppError::Upstream { .. } | AppError::UpstreamUnavailable(_) => {
                tracing::error!("{}", self);
            }
            AppError::InternalError(msg) => tracing::error!("Internal error: {}", msg),
            AppError::Unauthorized(msg) => tracing::warn!("Unauthorized access: {}", msg),
            AppError::WithContext { source, context } => {
                // Log full context chain for debugging
                tracing::error!("Error with context: {} -> {}", context, source);
            }
            AppError::NotFound(_) | AppError::BadRequest(_) => {}
        }

        let body = Json(json!({
            "error": self.user_message(),
        }));

        (self.status_code(), body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    /// Transport-level failures carry status 0 so they count as outages.
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream {
            status: err.status().map(|s| s.as_u16()).unwrap_or(0),
            message: err.to_string(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Query-string extractor that rejects with an [`AppError`] body.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// JSON body extractor that rejects with an [`AppError`] body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_is_verbatim() {
        let err = AppError::Upstream {
            status: 400,
            message: "Unknown action: foo".to_string(),
        };
        assert_eq!(err.user_message(), "Unknown action: foo");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_outage_classification() {
        let server = AppError::Upstream {
            status: 503,
            message: "down".to_string(),
        };
        let transport = AppError::Upstream {
            status: 0,
            message: "connection refused".to_string(),
        };
        let client = AppError::Upstream {
            status: 404,
            message: "not found".to_string(),
        };
        assert!(server.is_upstream_outage());
        assert!(transport.is_upstream_outage());
        assert!(!client.is_upstream_outage());
        assert!(!AppError::BadRequest("x".to_string()).is_upstream_outage());
    }

    #[test]
    fn test_context_keeps_source_status() {
        let result: Result<(), AppError> = Err(AppError::NotFound("lead abc".to_string()));
        let err = result.context("loading lead detail").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.user_message(), "lead abc");
        assert!(err.to_string().starts_with("loading lead detail: "));
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err = AppError::InternalError("mutex poisoned".to_string());
        assert_eq!(err.user_message(), "Internal server error");
    }
}
