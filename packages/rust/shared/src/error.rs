//! Error types for rosbot-collector.
//!
//! Library crates use [`RosbotError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all collector operations.
#[derive(Debug, thiserror::Error)]
pub enum RosbotError {
    /// The login form was accepted but the site kept us on the login page.
    #[error("provided user credentials are invalid")]
    BadCredentials,

    /// The login page did not carry a `form_build_id` hidden input.
    #[error("could not parse 'form_build_id' from the login page")]
    MissingLoginToken,

    /// The landing page after login had no bot-activity navigation link.
    #[error("could not parse the bot activity endpoint from the landing page")]
    MissingActivityEndpoint,

    /// Logging in again after an expired session failed.
    #[error("error refreshing session: {message}")]
    SessionRefreshFailure { message: String },

    /// Transport-level failure (connect, timeout, body read, client setup).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("{url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Markup could not be turned into records (task failure, bad selector).
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Parsing was aborted by the caller before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RosbotError>;

impl RosbotError {
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

    /// Wrap the cause of a failed re-authentication.
    pub fn refresh(cause: &RosbotError) -> Self {
        Self::SessionRefreshFailure {
            message: cause.to_string(),
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
