//! Upstream failure taxonomy.

use thiserror::Error;

/// Errors returned by [`super::PaymoClient`].
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// HTTP 429. Callers decide whether to back off and retry.
    #[error("rate limited by Paymo")]
    RateLimited,
    /// HTTP 401 or 403: the API key is missing, wrong, or lacks access.
    #[error("Paymo rejected the credentials (HTTP {0})")]
    Unauthorized(u16),
    #[error("Paymo resource not found: {0}")]
    NotFound(String),
    #[error("Paymo returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request to Paymo failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Paymo response was not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, UpstreamError::RateLimited)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, UpstreamError::Unauthorized(_))
    }

    /// Short label used for the `outcome` metric dimension.
    pub fn outcome(&self) -> &'static str {
        match self {
            UpstreamError::RateLimited => "rate_limited",
            UpstreamError::Unauthorized(_) => "unauthorized",
            UpstreamError::NotFound(_) => "not_found",
            UpstreamError::Status { .. } => "http_error",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::Decode(_) => "decode",
        }
    }
}
