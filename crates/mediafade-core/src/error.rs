//! Error types for mediafade

use thiserror::Error;

/// Result type alias for mediafade operations
pub type Result<T> = std::result::Result<T, Error>;

/// Component error types
///
/// Most runtime failures never reach the caller: missing playback capability
/// and failed or stale probes are absorbed by the state machines. The variants
/// that do surface come from configuration, construction and renderer misuse.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),

    // Source errors
    #[error("Invalid media source: {0}")]
    InvalidSource(String),

    #[error("Probe of {url} returned HTTP {status}")]
    ProbeStatus { url: String, status: u16 },

    #[error("Probe of {media} failed: {reason}")]
    ProbeFailed { media: String, reason: String },

    // Media element errors
    #[error("Media element does not support {operation}")]
    Unsupported { operation: &'static str },

    #[error("Video element attached while not mounted")]
    NotMounted,

    // Runtime errors
    #[error("No async runtime available")]
    NoRuntime,

    // Network errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an unsupported-operation error
    pub fn unsupported(operation: &'static str) -> Self {
        Error::Unsupported { operation }
    }

    /// Create a probe failure for a media source
    pub fn probe(media: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ProbeFailed {
            media: media.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if a later attempt could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ProbeStatus { .. }
                | Error::ProbeFailed { .. }
                | Error::Network(_)
                | Error::Io(_)
                | Error::NotMounted
        )
    }

    /// Returns a stable error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Json(_) => "INVALID_JSON",
            Error::InvalidSource(_) => "INVALID_SOURCE",
            Error::ProbeStatus { .. } => "PROBE_STATUS",
            Error::ProbeFailed { .. } => "PROBE_FAILED",
            Error::Unsupported { .. } => "UNSUPPORTED",
            Error::NotMounted => "NOT_MOUNTED",
            Error::NoRuntime => "NO_RUNTIME",
            Error::Network(_) => "NETWORK",
            Error::Io(_) => "IO",
        }
    }
}
