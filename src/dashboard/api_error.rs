//! JSON error responses for dashboard API routes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::{error, warn};

use crate::paymo::UpstreamError;
use crate::time::DateWindowError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("API key not provided")]
    MissingCredential,
    #[error("{0}")]
    NotFound(String),
    /// An upstream failure; `context` is the message shown to the client.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
    },
}

impl ApiError {
    /// Adapter for `map_err` that tags an upstream error with a client-facing message.
    pub fn upstream(context: &'static str) -> impl FnOnce(UpstreamError) -> ApiError {
        move |source| ApiError::Upstream { context, source }
    }
}

impl From<DateWindowError> for ApiError {
    fn from(err: DateWindowError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::MissingCredential => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Upstream { source, .. } if source.is_unauthorized() => {
                warn!(error = %source, "Paymo rejected credentials");
                (
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized - check PAYMO_API_KEY".to_string(),
                )
            }
            ApiError::Upstream {
                source: UpstreamError::NotFound(path),
                ..
            } => {
                warn!(path = %path, "Paymo resource not found");
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            ApiError::Upstream { context, source } => {
                error!(error = %source, "{}", context);
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
