//! Error types for the identity layer.

use std::path::PathBuf;

/// Errors from loading, storing, or validating a participant's identity.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Reading or writing the backing file failed.
    #[error("identity store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing file exists but is not a JSON object of strings.
    #[error("identity store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The in-memory values could not be rendered as JSON for writing.
    #[error("failed to serialize identity store for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The display name is outside the allowed length after trimming.
    #[error("display name must be {min}..={max} characters, got {len}")]
    InvalidDisplayName { len: usize, min: usize, max: usize },

    /// A display name is already stored. Clear it first to change it.
    #[error("display name already set to {0:?}")]
    DisplayNameAlreadySet(String),
}

/// Why a chat message's content was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// Nothing left after trimming whitespace.
    #[error("message is empty")]
    Empty,

    /// Longer than the allowed maximum.
    #[error("message is {len} characters, maximum is {max}")]
    TooLong { len: usize, max: usize },
}
