// state.rs — Workflow phases and the per-project state record.
//
// The six phases and their transition table are fixed. The table is directed
// but not a total order: monitoring can loop back to executing, planning can
// fall back to initiating. `closed` is terminal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Versioned path of the workflow state record inside a project.
pub const WORKFLOW_STATE_PATH: &str = ".helm/workflow.json";

/// A project lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    Initiating,
    Planning,
    Executing,
    Monitoring,
    Closing,
    Closed,
}

impl WorkflowPhase {
    /// All six phases, in lifecycle order.
    pub const ALL: [WorkflowPhase; 6] = [
        WorkflowPhase::Initiating,
        WorkflowPhase::Planning,
        WorkflowPhase::Executing,
        WorkflowPhase::Monitoring,
        WorkflowPhase::Closing,
        WorkflowPhase::Closed,
    ];

    /// The phases this phase may transition to.
    pub fn allowed_transitions(self) -> &'static [WorkflowPhase] {
        match self {
            WorkflowPhase::Initiating => &[WorkflowPhase::Planning],
            WorkflowPhase::Planning => &[WorkflowPhase::Executing, WorkflowPhase::Initiating],
            WorkflowPhase::Executing => &[WorkflowPhase::Monitoring, WorkflowPhase::Planning],
            WorkflowPhase::Monitoring => &[WorkflowPhase::Executing, WorkflowPhase::Closing],
            WorkflowPhase::Closing => &[WorkflowPhase::Closed, WorkflowPhase::Monitoring],
            WorkflowPhase::Closed => &[],
        }
    }

    pub fn can_transition_to(self, to: WorkflowPhase) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Whether this phase has no outgoing transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowPhase::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::Initiating => "initiating",
            WorkflowPhase::Planning => "planning",
            WorkflowPhase::Executing => "executing",
            WorkflowPhase::Monitoring => "monitoring",
            WorkflowPhase::Closing => "closing",
            WorkflowPhase::Closed => "closed",
        }
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded transition in a project's workflow history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub from: WorkflowPhase,
    pub to: WorkflowPhase,
    pub actor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// The live workflow state of a project. Exactly one record per project,
/// mutated only through validated transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowState {
    pub phase: WorkflowPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<WorkflowPhase>,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<Transition>,
}

impl WorkflowState {
    /// The state a project starts in at creation time.
    pub fn initial(actor: impl Into<String>) -> Self {
        Self {
            phase: WorkflowPhase::Initiating,
            previous: None,
            updated_by: actor.into(),
            updated_at: Utc::now(),
            history: Vec::new(),
        }
    }

    /// The state after a transition to `to`. Legality is the caller's
    /// responsibility; this only records the move.
    pub fn advanced(
        &self,
        to: WorkflowPhase,
        actor: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        let actor = actor.into();
        let now = Utc::now();
        let mut history = self.history.clone();
        history.push(Transition {
            from: self.phase,
            to,
            actor: actor.clone(),
            reason,
            at: now,
        });
        Self {
            phase: to,
            previous: Some(self.phase),
            updated_by: actor,
            updated_at: now,
            history,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_matches_lifecycle() {
        use WorkflowPhase::*;
        let expected: &[(WorkflowPhase, &[WorkflowPhase])] = &[
            (Initiating, &[Planning]),
            (Planning, &[Executing, Initiating]),
            (Executing, &[Monitoring, Planning]),
            (Monitoring, &[Executing, Closing]),
            (Closing, &[Closed, Monitoring]),
            (Closed, &[]),
        ];
        for (from, allowed) in expected {
            assert_eq!(from.allowed_transitions(), *allowed);
        }
    }

    #[test]
    fn legality_holds_for_every_phase_pair() {
        for from in WorkflowPhase::ALL {
            for to in WorkflowPhase::ALL {
                let legal = from.allowed_transitions().contains(&to);
                assert_eq!(from.can_transition_to(to), legal, "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn closed_is_the_only_terminal_phase() {
        for phase in WorkflowPhase::ALL {
            assert_eq!(phase.is_terminal(), phase == WorkflowPhase::Closed);
        }
    }

    #[test]
    fn no_phase_transitions_to_itself() {
        for phase in WorkflowPhase::ALL {
            assert!(!phase.can_transition_to(phase));
        }
    }

    #[test]
    fn initial_state_is_initiating_with_empty_history() {
        let state = WorkflowState::initial("pm-1");
        assert_eq!(state.phase, WorkflowPhase::Initiating);
        assert!(state.previous.is_none());
        assert!(state.history.is_empty());
        assert_eq!(state.updated_by, "pm-1");
    }

    #[test]
    fn advanced_records_the_transition() {
        let state = WorkflowState::initial("pm-1");
        let next = state.advanced(
            WorkflowPhase::Planning,
            "pm-2",
            Some("kickoff complete".to_string()),
        );

        assert_eq!(next.phase, WorkflowPhase::Planning);
        assert_eq!(next.previous, Some(WorkflowPhase::Initiating));
        assert_eq!(next.updated_by, "pm-2");
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.history[0].from, WorkflowPhase::Initiating);
        assert_eq!(next.history[0].to, WorkflowPhase::Planning);
        assert_eq!(next.history[0].reason.as_deref(), Some("kickoff complete"));
    }

    #[test]
    fn phase_serializes_as_snake_case() {
        let json = serde_json::to_string(&WorkflowPhase::Initiating).unwrap();
        assert_eq!(json, "\"initiating\"");
    }

    #[test]
    fn state_serialization_round_trip() {
        let state = WorkflowState::initial("pm-1")
            .advanced(WorkflowPhase::Planning, "pm-1", None)
            .advanced(WorkflowPhase::Executing, "pm-2", Some("plan approved".to_string()));
        let json = serde_json::to_string(&state).unwrap();
        let restored: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
