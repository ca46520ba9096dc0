//! Error types for the QR Nexus domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error type so callers can tell a bad
//! payload from an unknown command from an upstream outage.

use thiserror::Error;

/// The top-level error type for all QR Nexus operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Payload decoding ---
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    // --- Command dispatch ---
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // --- Generation provider ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Stage errors ---

/// Failure to turn a transport string into a command.
///
/// A failed decryption is *not* an error on its own; it only becomes a
/// `DecodeFailure` once the plain-decode fallback has failed too.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Could not decode payload: {0}")]
    DecodeFailure(String),

    #[error("AI command (cmd) is missing from payload")]
    MissingCommand,

    #[error("Could not seal payload: {0}")]
    Seal(String),
}

/// Discriminant of [`PayloadError`], for matching without the detail string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadErrorKind {
    DecodeFailure,
    MissingCommand,
    Seal,
}

impl PayloadError {
    pub fn kind(&self) -> PayloadErrorKind {
        match self {
            Self::DecodeFailure(_) => PayloadErrorKind::DecodeFailure,
            Self::MissingCommand => PayloadErrorKind::MissingCommand,
            Self::Seal(_) => PayloadErrorKind::Seal,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown AI command: {0}")]
    UnknownCommand(String),

    #[error("Command {command} requires parameter {parameter}")]
    MissingParameter { command: String, parameter: String },
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
