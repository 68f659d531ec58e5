//! Error types for the probing and messaging boundaries
//!
//! Probe and fallback failures never leave the classifier; they exist so the
//! monitor can log what went wrong before degrading an endpoint to offline.

use thiserror::Error;

/// Errors raised by the native status query
#[derive(Error, Debug)]
pub enum ProbeError {
    /// The query did not answer within the caller's deadline
    #[error("Probe timed out after {0} ms")]
    Timeout(u64),

    /// Socket-level failure (refused, reset, DNS)
    #[error("Probe I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend answered with something it could not make sense of
    #[error("Probe backend error: {0}")]
    Backend(String),

    /// No native query backend is wired in
    #[error("Native probing unavailable: {0}")]
    Unavailable(String),

    /// The isolated worker running the query panicked or was cancelled
    #[error("Probe worker failed: {0}")]
    Join(String),
}

/// Errors raised by the third-party aggregator lookup
#[derive(Error, Debug)]
pub enum FallbackError {
    /// Timeout, transport error, bad payload, or the aggregator reports the
    /// server as unreachable
    #[error("Fallback unavailable: {0}")]
    Unavailable(String),
}

impl FallbackError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }
}

impl From<reqwest::Error> for FallbackError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Unavailable("request timed out".to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }
}

/// Errors raised by the messaging platform
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The referenced message was deleted or never existed
    #[error("Message not found: {0}")]
    MessageNotFound(String),

    /// The platform refused the operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The channel reference no longer resolves
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Rate limit exceeded
    #[error("Rate limited")]
    RateLimited,

    /// Server error with status code
    #[error("Server error: {0}")]
    Server(u16),

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not carry what we expected
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Whether retrying the same call may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Server(_) | Self::Http(_))
    }
}
