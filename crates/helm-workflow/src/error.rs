// error.rs — Error types for the workflow subsystem.

use thiserror::Error;

use helm_audit::AuditError;
use helm_store::StoreError;

use crate::state::WorkflowPhase;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The requested transition is not in the allowed set for the current
    /// phase. The current state is left untouched.
    #[error("illegal workflow transition from {from} to {to}")]
    IllegalTransition {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },

    /// The project has no workflow state record — it was not created through
    /// the engine, or its history is damaged.
    #[error("project '{project}' has no workflow state record")]
    MissingState { project: String },

    /// A state record failed to serialize or deserialize.
    #[error("workflow serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The durability layer failed; the transition was not recorded.
    #[error("workflow storage error: {0}")]
    Storage(#[from] StoreError),

    /// The transition committed but its audit event could not be recorded.
    #[error("workflow audit error: {0}")]
    Audit(#[from] AuditError),
}
