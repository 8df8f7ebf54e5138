//! Error types for epicreport.
//!
//! Library crates use [`ReportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Top-level error type for all epicreport operations.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error outside of the work-item fetch itself.
    #[error("network error: {0}")]
    Network(String),

    /// The work-item source could not deliver data. Fatal for the run.
    #[error("data source unavailable at {}: {message}", at.format("%Y-%m-%d %H:%M:%S UTC"))]
    SourceUnavailable { at: DateTime<Utc>, message: String },

    /// Malformed work-item payload or snapshot file.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Failure while turning a report model into bytes.
    #[error("render error: {0}")]
    Render(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad arguments, unsupported values, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
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

    /// Signal that the data source failed, stamped with the current time.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            at: Utc::now(),
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
