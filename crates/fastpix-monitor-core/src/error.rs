//! Error types for FastPix Monitor Core

use thiserror::Error;

/// Result type alias for instrumentation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Instrumentation error types
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors
    #[error("A valid Video.js player instance must be provided to enable data analytics tracking.")]
    InvalidPlayer,

    #[error("A valid Video.js instance (either imported from the package or provided via CDN) must be provided to enable data analytics tracking.")]
    InvalidHostFramework,

    #[error("Unrecognised framework version: {0}")]
    InvalidVersion(String),

    // Request errors
    #[error("Response body mismatch: expected {expected}, found {found}")]
    ResponseMismatch {
        expected: &'static str,
        found: &'static str,
    },

    // Streaming engine errors
    #[error("No active media playlist")]
    MissingPlaylist,

    #[error("No streaming engine attached to tech")]
    MissingEngine,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Returns true if this error rejects an attach attempt
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidPlayer | Error::InvalidHostFramework)
    }

    /// Returns the error code used in debug logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidPlayer => "INVALID_PLAYER",
            Error::InvalidHostFramework => "INVALID_FRAMEWORK",
            Error::InvalidVersion(_) => "INVALID_VERSION",
            Error::ResponseMismatch { .. } => "RESPONSE_MISMATCH",
            Error::MissingPlaylist => "MISSING_PLAYLIST",
            Error::MissingEngine => "MISSING_ENGINE",
            Error::Config(_) => "INVALID_CONFIG",
        }
    }
}
