use thiserror::Error;

/// Why a single fetch of the queue produced no snapshot.
///
/// None of these are fatal. Rate limits drive backoff; the other two only bump
/// the failure counter and the next tick retries at the existing cadence.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("rate limited by queue api")]
    RateLimited,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    pub fn transport<E: std::fmt::Display>(e: E) -> Self {
        Self::Transport(e.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(e: E) -> Self {
        Self::MalformedResponse(e.to_string())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min interval must be positive")]
    ZeroMinInterval,
    #[error("min interval {min_ms}ms exceeds max interval {max_ms}ms")]
    InvertedBounds { min_ms: u64, max_ms: u64 },
    #[error("{0} must be positive")]
    ZeroPeriod(&'static str),
    #[error("max health failures must be at least 1")]
    ZeroHealthFailures,
}
