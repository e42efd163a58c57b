// event.rs — Audit event data model.
//
// Every state-changing operation (project creation, proposal resolution,
// workflow transition) is recorded as an AuditEvent. Events carry a
// per-project sequence number assigned at append time; that ordering is the
// sole source of truth for "what happened when".

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of domain event this record describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A project namespace was created.
    ProjectCreated,
    /// Project metadata (display name) was updated.
    ProjectUpdated,
    /// A proposal was submitted and stored as pending.
    ProposalCreated,
    /// A proposal's changes were committed to storage.
    ProposalApplied,
    /// A proposal was rejected without touching storage.
    ProposalRejected,
    /// The project moved to a new workflow phase.
    WorkflowStateChanged,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventType::ProjectCreated => "project_created",
            EventType::ProjectUpdated => "project_updated",
            EventType::ProposalCreated => "proposal_created",
            EventType::ProposalApplied => "proposal_applied",
            EventType::ProposalRejected => "proposal_rejected",
            EventType::WorkflowStateChanged => "workflow_state_changed",
        };
        f.write_str(s)
    }
}

/// A single audit event — one line in the project's events journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier for this event.
    pub event_id: Uuid,

    /// Per-project sequence number, monotonically increasing from 1.
    pub seq: u64,

    /// The project this event belongs to.
    pub project: String,

    /// What happened.
    pub event_type: EventType,

    /// Who performed the action.
    pub actor: String,

    /// When the event was recorded (server clock, UTC).
    pub timestamp: DateTime<Utc>,

    /// Structured event details.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Hash of the commit this event is linked to, when the triggering
    /// operation produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
}

impl AuditEvent {
    /// Build an event record. The sequence number is assigned by the log at
    /// append time; everything else is fixed here.
    pub(crate) fn record(
        seq: u64,
        project: impl Into<String>,
        event_type: EventType,
        actor: impl Into<String>,
        payload: serde_json::Value,
        commit: Option<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            seq,
            project: project.into(),
            event_type,
            actor: actor.into(),
            timestamp: Utc::now(),
            payload,
            commit,
        }
    }
}
