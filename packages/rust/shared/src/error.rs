//! Error types for scriptcrew.
//!
//! Library crates use [`ScriptCrewError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all scriptcrew operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptCrewError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to a tool backend.
    #[error("network error: {0}")]
    Network(String),

    /// Language-model request or response error.
    #[error("llm error: {0}")]
    Llm(String),

    /// Crew construction or execution error (cycles, missing agents, ...).
    #[error("crew error: {message}")]
    Crew { message: String },

    /// Free-text to structured data extraction failed.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScriptCrewError>;

impl ScriptCrewError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a crew error from any displayable message.
    pub fn crew(msg: impl Into<String>) -> Self {
        Self::Crew {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error happened while loading or validating configuration.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}
