//! Progress notification port
//!
//! Defines the interface for reporting progress during a pipeline run.

use atlance_domain::{CapabilityKind, Question, RunState, StageId};

/// Callback for progress updates during a pipeline run
///
/// Implementations live in the presentation layer.
pub trait PipelineProgressNotifier: Send + Sync {
    /// Called when a stage starts (including each delegated invocation)
    fn on_stage_start(&self, stage: StageId);

    /// Called when a stage produced a result
    fn on_stage_complete(&self, stage: StageId, summary: &str);

    /// Called when a stage failed; `skipped` is true when the run continues
    fn on_stage_failed(&self, stage: StageId, reason: &str, skipped: bool);

    /// Called when a run starts
    fn on_run_start(&self, _run_id: &str, _stages: &[StageId]) {}

    /// Called when a run reaches a terminal state
    fn on_run_complete(&self, _state: &RunState) {}

    /// Called before a capability call (search query, delegation)
    fn on_capability_call(&self, _stage: StageId, _kind: CapabilityKind, _detail: &str) {}

    /// Called before a failed capability call is retried
    fn on_retry(&self, _stage: StageId, _kind: CapabilityKind, _attempt: u32) {}

    /// Called when the question stage emits a question
    fn on_question(&self, _question: &Question) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl PipelineProgressNotifier for NoProgress {
    fn on_stage_start(&self, _stage: StageId) {}
    fn on_stage_complete(&self, _stage: StageId, _summary: &str) {}
    fn on_stage_failed(&self, _stage: StageId, _reason: &str, _skipped: bool) {}
}
