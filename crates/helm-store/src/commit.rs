// commit.rs — Commit records and the staged working set.
//
// A Commit is one durable checkpoint of a project's file state. Each commit
// carries the FULL path -> entry map (snapshot model), so reading any file at
// head is a single map lookup and no chain walking is ever required. Commits
// are append-only and never amended; the hash identifies the commit body.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hasher;

/// What a commit records for a single path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileEntry {
    /// Live content, stored as a content-addressed blob.
    Blob { hash: String },
    /// The file was deleted. The entry stays in the map so history shows
    /// the deletion; prior versions remain reachable via older commits.
    Tombstone,
}

impl FileEntry {
    /// Whether this entry represents live content.
    pub fn is_live(&self) -> bool {
        matches!(self, FileEntry::Blob { .. })
    }
}

/// A storage-level checkpoint: ordered, content-addressed, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// SHA-256 of the canonical JSON of the commit body (all fields below).
    pub hash: String,
    /// Hash of the preceding commit; None for a project's first commit.
    pub parent: Option<String>,
    /// Commit message.
    pub message: String,
    /// Who produced this checkpoint.
    pub author: String,
    /// When the commit was recorded (UTC).
    pub timestamp: DateTime<Utc>,
    /// Full file state at this commit. BTreeMap keeps serialization
    /// deterministic, which the commit hash depends on.
    pub files: BTreeMap<String, FileEntry>,
}

impl Commit {
    /// Assemble a commit and compute its identity hash.
    pub fn new(
        parent: Option<String>,
        message: impl Into<String>,
        author: impl Into<String>,
        files: BTreeMap<String, FileEntry>,
    ) -> Result<Self, serde_json::Error> {
        let message = message.into();
        let author = author.into();
        let timestamp = Utc::now();
        let digest = CommitDigest {
            parent: &parent,
            message: &message,
            author: &author,
            timestamp: &timestamp,
            files: &files,
        };
        let hash = hasher::hash_str(&serde_json::to_string(&digest)?);
        Ok(Self {
            hash,
            parent,
            message,
            author,
            timestamp,
            files,
        })
    }

    /// The entry recorded for a path, if any (live or tombstone).
    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.files.get(path)
    }

    /// A lightweight reference to this commit for history listings.
    pub fn to_ref(&self) -> CommitRef {
        CommitRef {
            hash: self.hash.clone(),
            message: self.message.clone(),
            author: self.author.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// The hashed portion of a commit — everything except the hash itself.
#[derive(Serialize)]
struct CommitDigest<'a> {
    parent: &'a Option<String>,
    message: &'a str,
    author: &'a str,
    timestamp: &'a DateTime<Utc>,
    files: &'a BTreeMap<String, FileEntry>,
}

/// A commit reference as returned by history queries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRef {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

/// A caller-held working set of staged file changes.
///
/// Nothing in a StagedChanges is visible to readers until it is committed;
/// dropping the value discards the staged work. This is what makes a failed
/// commit leave no trace.
#[derive(Debug, Clone, Default)]
pub struct StagedChanges {
    entries: BTreeMap<String, StagedEntry>,
}

#[derive(Debug, Clone)]
pub(crate) enum StagedEntry {
    Put(String),
    Remove,
}

impl StagedChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage new content for a path. A later put to the same path replaces
    /// the earlier one.
    pub fn put(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.entries
            .insert(path.into(), StagedEntry::Put(content.into()));
    }

    /// Stage a deletion for a path.
    pub fn remove(&mut self, path: impl Into<String>) {
        self.entries.insert(path.into(), StagedEntry::Remove);
    }

    /// Paths touched by this working set, in sorted order.
    pub fn paths(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn into_entries(self) -> BTreeMap<String, StagedEntry> {
        self.entries
    }
}
