//! Error types for gsw-core
//!
//! Provides a unified error type that can be converted to appropriate exit codes.

use thiserror::Error;

/// Result type alias for gsw-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for gsw-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Address scheme is neither local nor the cloud scheme
    #[error("Unsupported scheme '{scheme}' in {address}")]
    UnsupportedScheme { scheme: String, address: String },

    /// Address contains glob metacharacters
    #[error("Wildcards are not supported: {0}")]
    WildcardRejected(String),

    /// Listing, copy or remove matched nothing
    #[error("No URL matched: {0}")]
    NoMatch(String),

    /// More than one source item matched a non-recursive copy
    #[error("Cannot copy {src} to {dst} (Did you mean to do cp recursive?)")]
    AmbiguousCopy { src: String, dst: String },

    /// Local destination cannot receive a multi-file result
    #[error("Destination is not a directory: {0}")]
    NotADirectory(String),

    /// Local source does not exist
    #[error("Source not found: {0}")]
    SourceMissing(String),

    /// Remote object not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Object content could not be decoded
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Conflict error
    #[error("Conflict: {0}")]
    Conflict(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_)
            | Error::Config(_)
            | Error::UnsupportedScheme { .. }
            | Error::WildcardRejected(_)
            | Error::AmbiguousCopy { .. }
            | Error::NotADirectory(_) => 2, // UsageError
            Error::Network(_) => 3, // NetworkError
            Error::Auth(_) => 4,    // AuthError
            Error::NotFound(_) | Error::NoMatch(_) | Error::SourceMissing(_) => 5, // NotFound
            Error::Conflict(_) => 6, // Conflict
            _ => 1,                  // GeneralError
        }
    }

    /// Whether this error reports a missing object or path
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::NoMatch(_) | Error::SourceMissing(_)
        )
    }
}
