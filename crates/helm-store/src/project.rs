// project.rs — Project identity, key validation, and the versioned meta record.
//
// A project is identified by a pattern-restricted key which doubles as its
// namespace directory name. The key is immutable; the display name and
// timestamps live in a meta record stored at a reserved versioned path so
// that renames are ordinary commits.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Versioned path of the project meta record.
pub const PROJECT_META_PATH: &str = ".helm/project.json";

/// Reserved path prefix for engine-owned records. Artifact paths must not
/// start with this.
pub const RESERVED_PREFIX: &str = ".helm/";

const PROJECT_KEY_PATTERN: &str = r"^[A-Za-z0-9_-]{1,64}$";

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PROJECT_KEY_PATTERN).expect("project key pattern compiles"))
}

/// Validate a project key: alphanumerics, `_`, `-`, 1-64 characters.
pub fn validate_project_key(key: &str) -> Result<(), StoreError> {
    if key_regex().is_match(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey {
            key: key.to_string(),
        })
    }
}

/// Validate a path for use inside a project namespace: relative, no parent
/// escapes, no empty segments.
pub fn validate_path(path: &str) -> Result<(), StoreError> {
    let invalid = |reason: &str| StoreError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if path.is_empty() {
        return Err(invalid("empty path"));
    }
    if path.starts_with('/') || path.contains('\\') || path.contains(':') {
        return Err(invalid("path must be relative with '/' separators"));
    }
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(invalid("empty path segment"));
        }
        if segment == ".." || segment == "." {
            return Err(invalid("path traversal segment"));
        }
    }
    Ok(())
}

/// The mutable metadata of a project, stored at [`PROJECT_META_PATH`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectMeta {
    /// Immutable identity; also the namespace directory name.
    pub key: String,
    /// Human-readable display name.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectMeta {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// A copy with a new display name and refreshed update timestamp.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            key: self.key.clone(),
            name: name.into(),
            created_at: self.created_at,
            updated_at: Utc::now(),
        }
    }
}
