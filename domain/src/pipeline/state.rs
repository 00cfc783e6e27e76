//! Run state machine
//!
//! ```text
//! Pending ──▶ Running(position) ──▶ Completed(final result)
//!    │              │  ▲        ├──▶ Failed(first fatal error)
//!    │              └──┘        └──▶ Aborted(cancellation)
//!    └──▶ Failed | Aborted
//! ```
//!
//! Terminal states are final; any transition out of one is rejected.

use super::error::RunError;
use super::output::StageOutput;
use super::stage_id::StageId;
use std::sync::Arc;
use thiserror::Error;

/// Where a running pipeline currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPosition {
    /// Sequential mode: index into the stage list
    Stage { index: usize, stage: StageId },
    /// Delegating-root mode: a delegate is running for the given call
    Delegate { stage: StageId, call_id: String },
}

impl RunPosition {
    pub fn stage(&self) -> StageId {
        match self {
            RunPosition::Stage { stage, .. } | RunPosition::Delegate { stage, .. } => *stage,
        }
    }
}

impl std::fmt::Display for RunPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPosition::Stage { index, stage } => write!(f, "stage {} ({})", index, stage),
            RunPosition::Delegate { stage, call_id } => {
                write!(f, "delegate {} (call {})", stage, call_id)
            }
        }
    }
}

/// Lifecycle state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Pending,
    Running(RunPosition),
    /// Finished; holds the last contract-bearing output, if any stage
    /// produced one
    Completed(Option<Arc<StageOutput>>),
    Failed(RunError),
    Aborted { at: Option<StageId> },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid run state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: &'static str,
    pub to: &'static str,
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running(_) => "running",
            RunState::Completed(_) => "completed",
            RunState::Failed(_) => "failed",
            RunState::Aborted { .. } => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed(_) | RunState::Failed(_) | RunState::Aborted { .. }
        )
    }

    pub fn position(&self) -> Option<&RunPosition> {
        match self {
            RunState::Running(position) => Some(position),
            _ => None,
        }
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    ///
    /// `Pending` may not complete without running a stage.
    pub fn transition(&mut self, next: RunState) -> Result<(), InvalidTransition> {
        let allowed = match (&*self, &next) {
            (s, _) if s.is_terminal() => false,
            (RunState::Pending, RunState::Pending) => false,
            (RunState::Pending, RunState::Completed(_)) => false,
            (_, RunState::Pending) => false,
            _ => true,
        };
        if !allowed {
            return Err(InvalidTransition {
                from: self.name(),
                to: next.name(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Running(position) => write!(f, "running {}", position),
            RunState::Failed(err) => write!(f, "failed: {}", err),
            RunState::Aborted { at: Some(stage) } => write!(f, "aborted during {}", stage),
            other => write!(f, "{}", other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(index: usize) -> RunState {
        RunState::Running(RunPosition::Stage {
            index,
            stage: StageId::Selection,
        })
    }

    #[test]
    fn test_happy_path() {
        let mut state = RunState::Pending;
        state.transition(running(0)).unwrap();
        state.transition(running(1)).unwrap();
        state.transition(RunState::Completed(None)).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_is_final() {
        let mut state = RunState::Aborted {
            at: Some(StageId::Question),
        };
        let err = state.transition(running(0)).unwrap_err();
        assert_eq!(err.from, "aborted");
        assert_eq!(err.to, "running");
        assert!(matches!(state, RunState::Aborted { .. }));
    }

    #[test]
    fn test_pending_cannot_complete() {
        let mut state = RunState::Pending;
        assert!(state.transition(RunState::Completed(None)).is_err());
        state
            .transition(RunState::Failed(RunError::InvalidGraph("empty".into())))
            .unwrap();
        assert_eq!(state.to_string(), "failed: invalid execution graph: empty");
    }

    #[test]
    fn test_cannot_return_to_pending() {
        let mut state = running(0);
        assert!(state.transition(RunState::Pending).is_err());
    }
}
