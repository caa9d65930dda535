//! Fetch failure taxonomy.

use thiserror::Error;

/// Why a remote page could not be retrieved.
///
/// None of these messages are shown to proxy clients; they are logged.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The whole fetch did not finish within the deadline.
    #[error("upstream timed out after {0} seconds")]
    Timeout(u64),

    /// The remote site answered with a non-2xx status.
    #[error("upstream responded with status {0}")]
    UpstreamError(u16),

    /// The remote body exceeded the configured size limit.
    #[error("upstream body exceeds {0} bytes")]
    TooLarge(usize),

    /// DNS, connect, TLS or body transfer failure.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The HTTP client could not be constructed.
    #[error("fetch client setup failed: {0}")]
    Setup(String),
}

impl FetchError {
    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::UpstreamError(_) => "upstream_status",
            FetchError::TooLarge(_) => "too_large",
            FetchError::NetworkError(_) => "network",
            FetchError::Setup(_) => "setup",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return FetchError::UpstreamError(status.as_u16());
        }
        FetchError::NetworkError(err.to_string())
    }
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
