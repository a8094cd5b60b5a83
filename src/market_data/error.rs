use thiserror::Error;

use crate::engine::types::Venue;

pub type FetchResult<T> = Result<T, FetchError>;

/// Failures surfaced by venue acquisition. Throttling is handled inside the
/// retry loop and only shows up here once retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("rate limit exceeded for {endpoint} after {attempts} attempts")]
    RateLimitExceeded { endpoint: String, attempts: u32 },

    #[error("unexpected response from {endpoint}: {detail}")]
    UnexpectedResponse { endpoint: String, detail: String },

    #[error("malformed payload from {venue}: {detail}")]
    MalformedPayload { venue: Venue, detail: String },
}

impl FetchError {
    pub fn malformed(venue: Venue, detail: impl ToString) -> Self {
        FetchError::MalformedPayload { venue, detail: detail.to_string() }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            FetchError::UnexpectedResponse { .. } => "unexpected_response",
            FetchError::MalformedPayload { .. } => "malformed_payload",
        }
    }
}
