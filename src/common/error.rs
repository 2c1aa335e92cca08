//! Error types for the differential harness
//!
//! Only setup-time problems are errors. Everything that goes wrong while
//! running a single corpus entry is recorded as data on that entry's
//! verdict so the rest of the run can continue.

use std::io;
use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Usage Errors ===
    #[error("Corpus root '{0}' does not exist")]
    RootNotFound(String),

    #[error("Corpus root '{0}' is neither a directory nor a descriptor file inside a <vendor>.<name>.<version> directory")]
    InvalidRoot(String),

    #[error("Cannot read corpus root '{path}': {error}")]
    RootUnreadable { path: String, error: String },

    #[error("No corpus entries found under '{0}'")]
    EmptyCorpus(String),

    #[error("No {role} tool configured. Pass --{role} <path> or set [tools.{role}] in the config file")]
    ToolNotConfigured { role: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Failed to write '{path}': {error}")]
    FileWrite { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a file write error
    pub fn file_write(path: &Path, error: io::Error) -> Self {
        Self::FileWrite {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Whether this error is the user's fault (bad arguments, bad config,
    /// nothing to do) rather than a failure of the harness itself
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Error::RootNotFound(_)
                | Error::InvalidRoot(_)
                | Error::RootUnreadable { .. }
                | Error::EmptyCorpus(_)
                | Error::ToolNotConfigured { .. }
                | Error::Config(_)
                | Error::ConfigParse(_)
                | Error::FileRead { .. }
        )
    }
}
