//! # helm-proposal
//!
//! The propose/apply change-management engine for Helm project documents.
//!
//! All document mutations flow through a two-phase lifecycle: a [`Proposal`]
//! is created with a diff and metadata (no storage mutation), then applied —
//! re-validated against current content, committed atomically, and recorded
//! in the audit trail — or rejected. Drift between propose and apply is
//! detected per path via a commit-hash token plus strict hunk-context
//! matching, and surfaces as a conflict instead of a silent overwrite.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use helm_audit::AuditLog;
//! use helm_diff::ChangeType;
//! use helm_proposal::{ArtifactKind, ProposalEngine};
//! use helm_store::VersionedStore;
//!
//! let store = Arc::new(VersionedStore::open("/tmp/helm").unwrap());
//! let audit = Arc::new(AuditLog::new(store.clone()));
//! let engine = ProposalEngine::new(store, audit);
//!
//! engine.create_project("apollo", "Apollo Migration", "pm-1").unwrap();
//! let proposal = engine
//!     .propose(
//!         "apollo",
//!         ChangeType::Create,
//!         "artifacts/plan.md",
//!         "# Plan\n",
//!         ArtifactKind::Plan,
//!         "pm-1",
//!         "initial project plan",
//!     )
//!     .unwrap();
//! let applied = engine.apply("apollo", proposal.proposal_id).unwrap();
//! println!("committed as {}", applied.commit);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod proposal;
pub mod store;

pub use config::{ConfigError, EngineConfig};
pub use engine::{ApplyResult, ProposalEngine};
pub use error::EngineError;
pub use proposal::{ArtifactKind, ChangeSpec, Proposal, ProposalStatus, ProposedChange};
pub use store::{JournalProposalStore, ProposalStore, PROPOSALS_JOURNAL};
