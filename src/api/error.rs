//! Errors from the clinic REST backend.
//!
//! Any of these means the fetch produced no usable data. Callers keep their
//! previous notification state and surface a transient error instead.

/// Upstream fetch or mutation failure.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Cannot reach clinic backend at {0}")]
    Connection(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected response body: {0}")]
    ResponseParsing(String),
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl ApiError {
    /// Whether retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::ResponseParsing(_) | Self::HttpClient(_) => false,
        }
    }
}
