//! Error types for vocab-sync
//!
//! One crate-wide [`Error`] enum covers every failure a pipeline stage can
//! observe. The variants map onto four propagation classes:
//! - transport failures ([`Error::Network`], [`Error::TransientStatus`],
//!   [`Error::HttpStatus`]) are retried by the HTTP client and then surface as
//!   item-level failures of the calling stage
//! - [`Error::Auth`] is terminal for the current run
//! - [`Error::Parse`] is caught per field inside the enrichment parser
//! - [`Error::Config`] and [`Error::InvalidState`] halt the pipeline until the
//!   caller intervenes

use thiserror::Error;

/// Result type alias for vocab-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for vocab-sync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "sync.deck")
        key: Option<String>,
    },

    /// Transport-level failure (connect, timeout, body read)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Server answered with a status from the transient set (500/502/503/504 by default)
    #[error("transient HTTP status {status} from {url}")]
    TransientStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Server answered with a non-success status outside the transient set
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Session token rejected by the remote word-list service
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Malformed or unexpected document
    #[error("parse error: {0}")]
    Parse(String),

    /// Coordinator operation called in a state that does not allow it
    #[error("cannot {operation} while pipeline is {state}")]
    InvalidState {
        /// The operation that was attempted (e.g., "query", "sync")
        operation: String,
        /// The current pipeline state
        state: String,
    },

    /// Local note store collaborator failed
    #[error("note store error: {0}")]
    Store(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run was cancelled before the stage finished
    #[error("pipeline run cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a configuration error tied to a key
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code, stable across releases
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::TransientStatus { .. } => "transient_status",
            Error::HttpStatus { .. } => "http_status",
            Error::Auth(_) => "auth_error",
            Error::Parse(_) => "parse_error",
            Error::InvalidState { .. } => "invalid_state",
            Error::Store(_) => "store_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Cancelled => "cancelled",
            Error::Other(_) => "internal_error",
        }
    }

    /// Whether this error ends the run and needs the caller to act
    /// (fresh credentials, a fixed configuration, a different call order).
    pub fn halts_pipeline(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::Config { .. } | Error::InvalidState { .. } | Error::Store(_)
        )
    }
}
