//! Bokhylla error types

use std::sync::Arc;
use std::time::Duration;

/// Bokhylla error types.
///
/// The enum is `Clone` so that singleflight can broadcast a failure to every
/// waiter of a coalesced fetch. Source errors that are not themselves `Clone`
/// (serde, reqwest) are captured as strings at the conversion boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BokhyllaError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    // Data errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Upstream responded 2xx but the body matched none of the expected
    /// shapes. Distinct from [`Json`](Self::Json) so structural mismatches
    /// are never silently swallowed.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Cache/coalescing errors
    /// No fresh, stale, or expired value exists and the live fetch failed.
    /// The only error that surfaces past the catalog cache.
    #[error("no cached value and live fetch failed: {0}")]
    CacheExhausted(Arc<BokhyllaError>),

    /// The leader of a coalesced fetch was cancelled before completing.
    #[error("in-flight fetch abandoned before completion")]
    FlightAbandoned,
}

impl BokhyllaError {
    /// Whether the error is transient (worth retrying or falling back on).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BokhyllaError::Http(_)
                | BokhyllaError::RateLimited { .. }
                | BokhyllaError::Timeout(_)
                | BokhyllaError::FlightAbandoned
                | BokhyllaError::Api {
                    status: 500..=599,
                    ..
                }
        )
    }

    /// Whether the error is an explicit upstream rate-limit signal.
    ///
    /// Rate limits are handled differently from generic transient failures:
    /// they trip the per-provider cooldown guard instead of being retried.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, BokhyllaError::RateLimited { .. })
    }

    /// Extract the `retry_after` hint from a rate-limit error, if present.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BokhyllaError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for BokhyllaError {
    fn from(err: serde_json::Error) -> Self {
        BokhyllaError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for BokhyllaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            // reqwest does not expose the configured timeout here; callers
            // that know it attach their own duration.
            BokhyllaError::Timeout(Duration::ZERO)
        } else {
            BokhyllaError::Http(err.to_string())
        }
    }
}

/// Result type alias for bokhylla operations
pub type Result<T> = std::result::Result<T, BokhyllaError>;
