// proposal.rs — The proposal data model.
//
// A Proposal is a pending unit of change: one or more per-file changes
// sharing an ID, plus author, rationale, and lifecycle status. The diff
// content is opaque to the engine — it is produced by an external
// collaborator and only interpreted by the diff applier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use helm_diff::ChangeType;

/// Logical type of a project artifact.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// A project plan document.
    Plan,
    /// A status or completion report.
    Report,
    /// A risks/assumptions/issues/dependencies log.
    RaidLog,
    /// Anything else.
    #[default]
    Other,
}

/// Caller input describing one file change for a new proposal.
#[derive(Debug, Clone)]
pub struct ChangeSpec {
    pub change_type: ChangeType,
    pub path: String,
    pub diff_text: String,
    pub kind: ArtifactKind,
}

/// One file change carried by a stored proposal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposedChange {
    pub change_type: ChangeType,
    /// Target artifact path, unique within the proposal.
    pub path: String,
    /// Unified diff text (or full content for a create).
    pub diff_text: String,
    pub kind: ArtifactKind,
    /// Drift token: hash of the last commit that touched `path` when the
    /// proposal was created (`None` = path did not exist). Apply compares it
    /// against the path's current history head and rejects on mismatch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Lifecycle status of a proposal. `pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Applied,
    Rejected,
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Applied => "applied",
            ProposalStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A pending or resolved unit of change against one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub proposal_id: Uuid,
    pub project: String,
    /// Ordered per-file changes sharing this proposal's ID.
    pub changes: Vec<ProposedChange>,
    pub author: String,
    /// Human-readable rationale from the proposer.
    pub rationale: String,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Hash of the commit produced by apply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reject_reason: Option<String>,
}

impl Proposal {
    pub fn new(
        project: impl Into<String>,
        changes: Vec<ProposedChange>,
        author: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            proposal_id: Uuid::new_v4(),
            project: project.into(),
            changes,
            author: author.into(),
            rationale: rationale.into(),
            status: ProposalStatus::Pending,
            created_at: Utc::now(),
            resolved_at: None,
            applied_commit: None,
            reject_reason: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ProposalStatus::Pending
    }

    /// Resolve as applied, recording the commit that materialized it.
    pub fn mark_applied(mut self, commit: impl Into<String>) -> Self {
        self.status = ProposalStatus::Applied;
        self.applied_commit = Some(commit.into());
        self.resolved_at = Some(Utc::now());
        self
    }

    /// Resolve as rejected, recording the reason. No storage mutation ever
    /// accompanies a rejection.
    pub fn mark_rejected(mut self, reason: impl Into<String>) -> Self {
        self.status = ProposalStatus::Rejected;
        self.reject_reason = Some(reason.into());
        self.resolved_at = Some(Utc::now());
        self
    }

    /// Paths touched by this proposal, in change order.
    pub fn paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}
