//! # helm-workflow
//!
//! The fixed project lifecycle state machine for Helm.
//!
//! Every project moves through six phases — initiating, planning, executing,
//! monitoring, closing, closed — along a fixed transition table.
//! [`WorkflowStateMachine::transition`] validates the move, persists the
//! updated [`WorkflowState`] record as one commit, and records one
//! `workflow_state_changed` audit event linked to that commit. `closed` is
//! terminal.

pub mod error;
pub mod machine;
pub mod state;

pub use error::WorkflowError;
pub use machine::WorkflowStateMachine;
pub use state::{Transition, WorkflowPhase, WorkflowState, WORKFLOW_STATE_PATH};
