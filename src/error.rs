//! Centralized error types for mailsift.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsift library.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O error with the associated path (relative to the output root
    /// when raised by a [`Storage`](crate::storage::Storage)).
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Listing, opening, searching or fetching on the mail server failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A fetched message could not be decoded.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The configuration is inconsistent. Always fatal, raised before any
    /// folder is touched.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The metadata report could not be serialized.
    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, ExtractError>`.
pub type Result<T> = std::result::Result<T, ExtractError>;

impl ExtractError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a `Configuration` error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Configuration(reason.into())
    }

    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Authentication(_))
    }
}

impl From<imap::Error> for ExtractError {
    fn from(source: imap::Error) -> Self {
        match source {
            imap::Error::No(reason) => Self::Transport(format!("server said NO: {reason}")),
            imap::Error::Bad(reason) => Self::Transport(format!("server said BAD: {reason}")),
            other => Self::Transport(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ExtractError::config("bad").is_fatal());
        assert!(ExtractError::Authentication("nope".into()).is_fatal());
        assert!(!ExtractError::Transport("timeout".into()).is_fatal());
        assert!(!ExtractError::MalformedMessage("empty".into()).is_fatal());
        let io = ExtractError::io("a/b.pdf", std::io::Error::other("disk full"));
        assert!(!io.is_fatal());
    }

    #[test]
    fn test_display_includes_path() {
        let err = ExtractError::io("INBOX/01_a.pdf", std::io::Error::other("denied"));
        let msg = err.to_string();
        assert!(msg.contains("INBOX/01_a.pdf"));
        assert!(msg.contains("denied"));
    }
}
