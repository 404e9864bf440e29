//! Error types shared across profd crates.
//!
//! Capture failures reported by tracing backends are not errors: they travel
//! as status values inside events. `ProfdError` covers infrastructure
//! failures around them (files, configuration, serialization).

use std::path::PathBuf;

/// Top-level error type for profd operations.
#[derive(Debug, thiserror::Error)]
pub enum ProfdError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File cache error: {message}")]
    FileCache { message: String },

    #[error("Invalid command: {message}")]
    InvalidCommand { message: String },

    #[error("Runtime error: {message}")]
    Runtime { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ProfdError.
pub type ProfdResult<T> = Result<T, ProfdError>;

impl ProfdError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn file_cache(msg: impl Into<String>) -> Self {
        Self::FileCache {
            message: msg.into(),
        }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime {
            message: msg.into(),
        }
    }

    pub fn invalid_command(msg: impl Into<String>) -> Self {
        Self::InvalidCommand {
            message: msg.into(),
        }
    }
}
