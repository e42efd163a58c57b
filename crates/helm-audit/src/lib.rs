//! # helm-audit
//!
//! Append-only per-project audit trail for Helm.
//!
//! Every state-changing operation (project creation, proposal resolution,
//! workflow transition) is recorded as an [`AuditEvent`] in the project's
//! events journal, co-located with the commit history it describes. Events
//! carry per-project sequence numbers assigned in commit order; that
//! ordering is the sole source of truth for "what happened when".
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use helm_audit::{AuditLog, EventType};
//! use helm_store::VersionedStore;
//!
//! let store = Arc::new(VersionedStore::open("/tmp/helm").unwrap());
//! let log = AuditLog::new(store);
//! log.append(
//!     "apollo",
//!     EventType::ProposalApplied,
//!     "pm-1",
//!     serde_json::json!({"proposal_id": "…"}),
//!     Some("commit-hash".to_string()),
//! )
//! .unwrap();
//! ```

pub mod error;
pub mod event;
pub mod log;

pub use error::AuditError;
pub use event::{AuditEvent, EventType};
pub use log::{AuditConfig, AuditLog, EventFilter, Page, EVENTS_JOURNAL};
