// Service error taxonomy.
//
// Transient errors (timeouts, 429, 5xx, network) are retried inside the
// client; permanent errors (other 4xx, unparseable responses) fail the
// request immediately. Neither ever propagates past the client boundary —
// after the retry budget is spent, the client returns a Failed result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("server error (HTTP {0})")]
    Server(u16),

    #[error("request rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ServiceError {
    /// Whether retrying this request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout
                | ServiceError::Network(_)
                | ServiceError::RateLimited
                | ServiceError::Server(_)
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, detail: String) -> Self {
        match status {
            429 => ServiceError::RateLimited,
            s if s >= 500 => ServiceError::Server(s),
            s => ServiceError::Rejected { status: s, detail },
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceError::Timeout
        } else if err.is_decode() {
            ServiceError::MalformedResponse(err.to_string())
        } else {
            ServiceError::Network(err.to_string())
        }
    }
}
