// error.rs — Error taxonomy of the proposal engine.
//
// Every failure carries enough structure (kind plus offending field or path)
// for the caller to render a precise message. Nothing is swallowed: a failed
// audit append fails the operation that triggered it.

use thiserror::Error;
use uuid::Uuid;

use helm_audit::AuditError;
use helm_store::StoreError;

use crate::proposal::ProposalStatus;

/// Errors surfaced by the proposal engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input — caller's fault, no state was changed.
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// The named project does not exist.
    #[error("unknown project '{key}'")]
    ProjectNotFound { key: String },

    /// The named proposal does not exist in the project.
    #[error("proposal {id} not found in project '{project}'")]
    ProposalNotFound { project: String, id: Uuid },

    /// The change no longer applies cleanly — content drifted since the
    /// proposal was created, or a create targets an existing path.
    #[error("conflict on '{path}': {reason}")]
    Conflict { path: String, reason: String },

    /// The proposal is already resolved; apply and reject require `pending`.
    #[error("proposal {id} is {status}; only pending proposals can be resolved")]
    InvalidState { id: Uuid, status: ProposalStatus },

    /// The durability layer failed. Never partially applied: the proposal
    /// record is left exactly as it was, so retrying is safe.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    /// The audit trail could not be written.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}
