// error.rs — Error types for diff parsing and application.

use thiserror::Error;

/// Errors that can occur while parsing or applying a diff.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The diff text is not structurally valid for the change type.
    #[error("malformed diff at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    /// A create change targets a path that already has content.
    #[error("target already exists; a create cannot overwrite it")]
    TargetExists,

    /// An update or delete change targets a path with no current content.
    #[error("target has no current content")]
    MissingTarget,

    /// A hunk's context no longer matches the current content — the content
    /// has drifted since the diff was produced.
    #[error("hunk {hunk} does not apply at line {line}: {reason}")]
    HunkMismatch {
        hunk: usize,
        line: usize,
        reason: String,
    },
}

impl DiffError {
    /// Whether this error is a conflict (drift or duplicate target) rather
    /// than a structural problem with the diff text.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DiffError::TargetExists | DiffError::MissingTarget | DiffError::HunkMismatch { .. }
        )
    }
}
