//! Type definitions for the RunPipeline use case.

use crate::stages::StageInput;
use atlance_domain::{RunContext, RunError, RunState, RunTrace, StageId, StageOutput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One entry of a sequential graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePlan {
    pub stage: StageId,
    /// A failure is recorded as skipped and the run continues
    pub optional: bool,
    /// Disabled stages are traced as skipped without running
    pub enabled: bool,
}

impl StagePlan {
    pub fn required(stage: StageId) -> Self {
        Self {
            stage,
            optional: false,
            enabled: true,
        }
    }

    pub fn optional(stage: StageId) -> Self {
        Self {
            stage,
            optional: true,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// How stages are composed for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionGraph {
    /// Fixed order; each stage sees the outputs of the ones before it
    Sequential { stages: Vec<StagePlan> },
    /// A root stage decides which delegates to call, and how often
    DelegatingRoot { root: StageId, delegates: Vec<StageId> },
}

impl ExecutionGraph {
    pub fn sequential(stages: impl IntoIterator<Item = StagePlan>) -> Self {
        ExecutionGraph::Sequential {
            stages: stages.into_iter().collect(),
        }
    }

    pub fn delegating(root: StageId, delegates: impl IntoIterator<Item = StageId>) -> Self {
        ExecutionGraph::DelegatingRoot {
            root,
            delegates: delegates.into_iter().collect(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            ExecutionGraph::Sequential { .. } => "sequential",
            ExecutionGraph::DelegatingRoot { .. } => "delegating",
        }
    }

    /// Every stage named by the graph, root first.
    pub fn stages(&self) -> Vec<StageId> {
        match self {
            ExecutionGraph::Sequential { stages } => stages.iter().map(|p| p.stage).collect(),
            ExecutionGraph::DelegatingRoot { root, delegates } => std::iter::once(*root)
                .chain(delegates.iter().copied())
                .collect(),
        }
    }
}

/// A run waiting to be executed.
///
/// Consumed by [`PipelineCoordinator::execute`](super::PipelineCoordinator::execute);
/// a run object is never executed twice.
#[derive(Debug)]
pub struct PipelineRun {
    pub(super) id: String,
    pub(super) graph: ExecutionGraph,
    pub(super) input: StageInput,
    pub(super) state: RunState,
    pub(super) context: RunContext,
    pub(super) trace: RunTrace,
    /// Sequential index to start from (non-zero on replay)
    pub(super) resume_from: usize,
}

impl PipelineRun {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn graph(&self) -> &ExecutionGraph {
        &self.graph
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_replay(&self) -> bool {
        !self.context.is_empty() || !self.trace.is_empty()
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,
    pub state: RunState,
    /// Last contract-bearing output
    pub output: Option<Arc<StageOutput>>,
    /// Last free-text output (story or root summary)
    pub narrative: Option<String>,
    /// Which stages ran, which were skipped and why
    pub trace: RunTrace,
    /// Every stage output of the run, in production order
    pub results: RunContext,
}

impl RunReport {
    pub fn skipped(&self) -> impl Iterator<Item = (StageId, &str)> {
        self.trace.skipped()
    }
}

/// What a failed or aborted run needs to be replayed.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub graph: ExecutionGraph,
    pub input: StageInput,
    /// Validated results produced before the failure
    pub context: RunContext,
    /// Sequential index of the stage that failed
    pub resume_from: usize,
}

/// Outcome of a failed or aborted run.
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub run_id: String,
    /// `Failed` or `Aborted`
    pub state: RunState,
    pub error: RunError,
    pub trace: RunTrace,
    pub checkpoint: Checkpoint,
}

impl RunFailure {
    pub fn is_cancelled(&self) -> bool {
        self.error.is_cancelled()
    }
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run {} {}", self.run_id, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
