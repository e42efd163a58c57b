// error.rs — Error types for the versioned store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file I/O operation failed. Always fatal to the current operation;
    /// a failed commit is never partially applied.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize or deserialize a store record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The project key does not match the allowed pattern.
    #[error("invalid project key '{key}': must match [A-Za-z0-9_-], 1-64 chars")]
    InvalidKey { key: String },

    /// A file path is absolute, escapes the namespace, or is otherwise malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A project with this key already exists.
    #[error("project '{key}' already exists")]
    ProjectExists { key: String },

    /// No project with this key exists.
    #[error("unknown project '{key}'")]
    UnknownProject { key: String },

    /// The requested file has no live entry at the current head.
    #[error("file not found in project '{project}': '{path}'")]
    NotFound { project: String, path: String },

    /// The head moved between the caller's read and this commit. Nothing was
    /// written; re-reading and retrying is always safe.
    #[error(
        "head of project '{project}' moved: expected {}, found {}",
        .expected.as_deref().unwrap_or("no commits"),
        .actual.as_deref().unwrap_or("no commits")
    )]
    HeadMoved {
        project: String,
        expected: Option<String>,
        actual: Option<String>,
    },

    /// A commit log line failed to parse — the log is damaged.
    #[error("corrupt commit log for project '{project}' at line {line}")]
    CorruptCommit { project: String, line: usize },
}
