//! Error types for the lead-generation claims workspace.
//!
//! Library crates use [`LeadgenError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all claims-merge operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadgenError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Input could not be parsed (wrong JSON shape, no payload in an LLM response).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (schema mismatch, checksum mismatch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Strict mode refused a run: patches were skipped or input claims lost.
    #[error("strict merge rejected {count} issue(s): {summary}")]
    PatchRejected { count: usize, summary: String },

    /// JSON serialization error while writing output.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadgenError>;

impl LeadgenError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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
}
