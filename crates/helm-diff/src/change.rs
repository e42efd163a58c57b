// change.rs — The closed set of artifact change types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What kind of mutation a proposed change performs.
///
/// The set is closed: every consumer matches exhaustively, so adding a
/// variant is a compile-time event across the codebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// A new artifact is created; the target must not exist yet.
    Create,
    /// An existing artifact is patched with a unified diff.
    Update,
    /// An existing artifact is deleted (tombstoned; history is retained).
    Delete,
}

impl ChangeType {
    /// Parse an external change-type string. Returns `None` for unknown
    /// values so the caller can reject them as a validation failure.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(ChangeType::Create),
            "update" => Some(ChangeType::Update),
            "delete" => Some(ChangeType::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Create => "create",
            ChangeType::Update => "update",
            ChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
