//! Error types for Support Copilot.
//!
//! Library crates use [`CopilotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::Stage;

/// Maximum number of characters of a remote error body kept in a [`CopilotError::Gateway`].
pub const ERROR_BODY_EXCERPT_CHARS: usize = 2000;

/// Top-level error type for all Support Copilot operations.
#[derive(Debug, thiserror::Error)]
pub enum CopilotError {
    /// Setup mistake: missing credential, empty knowledge base, unreadable input.
    #[error("config error: {message}")]
    Config { message: String },

    /// The completion service answered with a non-success status.
    #[error("gateway error: HTTP {status}: {body}")]
    Gateway { status: u16, body: String },

    /// Network-level failure (timeout, refused connection, broken body).
    #[error("transport error: {0}")]
    Transport(String),

    /// A stage produced no output text and empty output is not allowed.
    #[error("stage {stage} returned no output text")]
    EmptyOutput { stage: Stage },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (out-of-range parameter, serialization failure, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CopilotError>;

impl CopilotError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a gateway error, keeping only a bounded excerpt of the body.
    pub fn gateway(status: u16, body: &str) -> Self {
        Self::Gateway {
            status,
            body: excerpt(body, ERROR_BODY_EXCERPT_CHARS),
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

/// First `max_chars` characters of `text`, cut on a char boundary.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
