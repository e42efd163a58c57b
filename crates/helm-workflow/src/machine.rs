// machine.rs — WorkflowStateMachine: validated phase transitions.
//
// A transition re-reads the persisted state record, checks the target
// against the transition table, and persists the updated record as one
// commit. The commit is base-checked against the head read at the start of
// the operation, so a racing writer makes the transition fail loudly rather
// than record an ambiguous state. The audit event is appended after the
// commit and linked to it.

use std::sync::Arc;

use helm_audit::{AuditLog, EventType};
use helm_store::{StagedChanges, VersionedStore};

use crate::error::WorkflowError;
use crate::state::{WorkflowPhase, WorkflowState, WORKFLOW_STATE_PATH};

/// Enforces legal project-phase transitions and records each one.
pub struct WorkflowStateMachine {
    store: Arc<VersionedStore>,
    audit: Arc<AuditLog>,
}

impl WorkflowStateMachine {
    pub fn new(store: Arc<VersionedStore>, audit: Arc<AuditLog>) -> Self {
        Self { store, audit }
    }

    /// The project's current workflow state.
    pub fn state(&self, project: &str) -> Result<WorkflowState, WorkflowError> {
        let raw = self
            .store
            .try_read_file(project, WORKFLOW_STATE_PATH)?
            .ok_or_else(|| WorkflowError::MissingState {
                project: project.to_string(),
            })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The phases the project may transition to from its current phase.
    /// Pure query; no side effects.
    pub fn allowed_transitions(&self, project: &str) -> Result<Vec<WorkflowPhase>, WorkflowError> {
        Ok(self.state(project)?.phase.allowed_transitions().to_vec())
    }

    /// Move the project to a new phase.
    ///
    /// Fails with `IllegalTransition` if the target is not reachable from
    /// the current phase; on success the updated record is persisted as one
    /// commit and one `workflow_state_changed` event is appended, linked to
    /// that commit.
    pub fn transition(
        &self,
        project: &str,
        to: WorkflowPhase,
        actor: &str,
        reason: Option<&str>,
    ) -> Result<WorkflowState, WorkflowError> {
        let base = self.store.last_commit(project)?.map(|commit| commit.hash);
        let current = self.state(project)?;

        if !current.phase.can_transition_to(to) {
            return Err(WorkflowError::IllegalTransition {
                from: current.phase,
                to,
            });
        }

        let next = current.advanced(to, actor, reason.map(str::to_string));
        let mut staged = StagedChanges::new();
        staged.put(WORKFLOW_STATE_PATH, serde_json::to_string_pretty(&next)?);

        let message = format!("workflow: {} -> {}", current.phase, to);
        let commit = self
            .store
            .commit(project, &message, actor, staged, base.as_deref())?;

        self.audit.append(
            project,
            EventType::WorkflowStateChanged,
            actor,
            serde_json::json!({
                "from": current.phase,
                "to": to,
                "reason": reason,
            }),
            Some(commit.hash.clone()),
        )?;

        tracing::info!(project, from = %current.phase, to = %to, commit = %commit.hash, "workflow transition");
        Ok(next)
    }
}
