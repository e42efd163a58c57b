//! # helm-store
//!
//! Content-addressed, commit-based storage of per-project files for Helm.
//!
//! Every project owns one namespace directory holding an append-only commit
//! log, a content-addressed blob store, and journals for co-located metadata
//! (audit events, proposal records). A [`Commit`] is one atomic, durable
//! checkpoint; callers stage changes in a [`StagedChanges`] working set and
//! commit them in one step. Readers only ever observe fully recorded commits.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use helm_store::{ProjectMeta, StagedChanges, VersionedStore};
//!
//! let store = VersionedStore::open("/tmp/helm").unwrap();
//! let meta = ProjectMeta::new("apollo", "Apollo Migration");
//! store
//!     .create_project(&meta, StagedChanges::new(), "create project", "pm-1")
//!     .unwrap();
//!
//! let base = store.last_commit("apollo").unwrap().map(|c| c.hash);
//! let mut staged = StagedChanges::new();
//! staged.put("artifacts/plan.md", "# Plan\n");
//! store
//!     .commit("apollo", "add plan", "pm-1", staged, base.as_deref())
//!     .unwrap();
//! ```

pub mod commit;
pub mod error;
pub mod hasher;
pub mod project;
pub mod store;

pub use commit::{Commit, CommitRef, FileEntry, StagedChanges};
pub use error::StoreError;
pub use project::{
    validate_path, validate_project_key, ProjectMeta, PROJECT_META_PATH, RESERVED_PREFIX,
};
pub use store::VersionedStore;
