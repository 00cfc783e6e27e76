//! Run Pipeline use case
//!
//! Owns the execution graph of a run and drives its stages:
//!
//! | Mode | Order | Failure of a stage |
//! |------|-------|--------------------|
//! | Sequential | fixed list | optional: skipped and traced; mandatory: run fails |
//! | Delegating root | chosen by the root | reported back to the root |
//!
//! Every run ends in `Completed`, `Failed` or `Aborted`, and always carries
//! its [`RunTrace`]. Failed and aborted runs can be resumed with
//! [`PipelineCoordinator::replay`].

mod graph;
mod router;
mod types;

pub use types::{Checkpoint, ExecutionGraph, PipelineRun, RunFailure, RunReport, StagePlan};

use crate::capability::{DelegateCapability, GrantedCapabilities, SearchCapability};
use crate::ports::answer::AnswerPort;
use crate::ports::progress::{NoProgress, PipelineProgressNotifier};
use crate::ports::run_logger::{NoRunLogger, RunEvent, RunLogger};
use crate::stages::{Stage, StageContext, StageInput};
use atlance_domain::{
    CapabilityGrant, RunContext, RunError, RunPosition, RunState, RunTrace, StageError, StageId,
    StageOutput, TraceEntry, TraceStatus,
};
use router::{RunBook, StageRouter};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Why execution stopped early, and where a replay should pick up.
struct Halt {
    error: RunError,
    resume_from: usize,
}

/// Move the run state, logging rejected transitions.
fn advance(state: &mut RunState, next: RunState) {
    let from = state.name();
    match state.transition(next) {
        Ok(()) => debug!("run state {} -> {}", from, state),
        Err(e) => warn!("{}", e),
    }
}

/// Coordinates stage execution for pipeline runs.
///
/// Holds the registered stages and the capability providers. Multiple runs
/// may execute concurrently; they share no mutable state.
#[derive(Clone)]
pub struct PipelineCoordinator {
    stages: HashMap<StageId, Arc<dyn Stage>>,
    search: Option<SearchCapability>,
    answers: Option<Arc<dyn AnswerPort>>,
    progress: Arc<dyn PipelineProgressNotifier>,
    logger: Arc<dyn RunLogger>,
}

impl Default for PipelineCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineCoordinator {
    pub fn new() -> Self {
        Self {
            stages: HashMap::new(),
            search: None,
            answers: None,
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoRunLogger),
        }
    }

    /// Register a stage under its id, replacing any stage with the same id.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.insert(stage.id(), stage);
        self
    }

    pub fn with_search(mut self, search: SearchCapability) -> Self {
        self.search = Some(search);
        self
    }

    /// Set the source of answers for the question stage
    pub fn with_answers(mut self, answers: Arc<dyn AnswerPort>) -> Self {
        self.answers = Some(answers);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn PipelineProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_run_logger(mut self, logger: Arc<dyn RunLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn registered(&self) -> impl Iterator<Item = StageId> + '_ {
        self.stages.keys().copied()
    }

    /// Check a graph without running it.
    pub fn validate(&self, graph: &ExecutionGraph) -> Result<(), RunError> {
        graph::validate(graph, &self.stages)
    }

    /// Create a pending run with a fresh id.
    pub fn new_run(&self, graph: ExecutionGraph, input: StageInput) -> PipelineRun {
        PipelineRun {
            id: uuid::Uuid::new_v4().to_string(),
            graph,
            input,
            state: RunState::Pending,
            context: RunContext::new(),
            trace: RunTrace::new(),
            resume_from: 0,
        }
    }

    /// Rebuild a failed or aborted run so it resumes where it stopped.
    ///
    /// Results validated before the failure are kept as context and are not
    /// produced again; the trace continues from the failed run's trace.
    pub fn replay(&self, failure: RunFailure) -> PipelineRun {
        let Checkpoint {
            graph,
            input,
            context,
            resume_from,
        } = failure.checkpoint;
        info!(
            "Replaying run {} from stage index {}",
            failure.run_id, resume_from
        );
        PipelineRun {
            id: failure.run_id,
            graph,
            input,
            state: RunState::Pending,
            context,
            trace: failure.trace,
            resume_from,
        }
    }

    /// Fill only the capability slots `grant` names.
    fn capabilities_for(
        &self,
        grant: &CapabilityGrant,
        delegate: Option<DelegateCapability>,
    ) -> GrantedCapabilities {
        GrantedCapabilities {
            search: self.search.clone().filter(|_| grant.allows_search()),
            answers: self.answers.clone().filter(|_| grant.allows_answer()),
            delegate: delegate.filter(|_| grant.can_delegate()),
        }
    }

    /// Record the end of one stage invocation in the trace, progress and
    /// run log, returning the traced status.
    #[allow(clippy::too_many_arguments)]
    fn finish_stage(
        &self,
        run_id: &str,
        trace: &mut RunTrace,
        stage: StageId,
        call_id: Option<&str>,
        result: &Result<Arc<StageOutput>, StageError>,
        optional: bool,
        elapsed_ms: u64,
    ) -> TraceStatus {
        let status = match result {
            Ok(output) => {
                let summary = output.summary();
                info!("{} completed: {}", stage, summary);
                self.progress.on_stage_complete(stage, &summary);
                if call_id.is_none() {
                    self.logger.log(RunEvent::stage_completed(
                        run_id, stage, &summary, elapsed_ms,
                    ));
                }
                TraceStatus::Succeeded
            }
            Err(e) if e.is_cancelled() => {
                info!("{} cancelled", stage);
                self.progress.on_stage_failed(stage, "cancelled", false);
                TraceStatus::Cancelled
            }
            Err(e) if optional => {
                let reason = e.to_string();
                warn!("Optional stage {} skipped: {}", stage, reason);
                self.progress.on_stage_failed(stage, &reason, true);
                if call_id.is_none() {
                    self.logger
                        .log(RunEvent::stage_skipped(run_id, stage, &reason));
                }
                TraceStatus::Skipped { reason }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!("{} failed: {}", stage, reason);
                self.progress.on_stage_failed(stage, &reason, false);
                if call_id.is_none() {
                    self.logger.log(RunEvent::stage_failed(run_id, stage, &reason));
                }
                TraceStatus::Failed { reason }
            }
        };

        if let Some(call_id) = call_id {
            self.logger
                .log(RunEvent::delegation(run_id, call_id, stage, &status));
        }
        trace.record(TraceEntry {
            stage,
            call_id: call_id.map(str::to_string),
            status: status.clone(),
            elapsed_ms,
        });
        status
    }

    fn stage(&self, id: StageId) -> Result<Arc<dyn Stage>, Halt> {
        self.stages.get(&id).cloned().ok_or_else(|| Halt {
            error: RunError::InvalidGraph(format!("stage {} is not registered", id)),
            resume_from: 0,
        })
    }

    /// Execute a run to a terminal state.
    ///
    /// Consumes the run. Cancellation is observed between stages, between
    /// delegation calls, and inside model calls and answer waits.
    pub async fn execute(
        &self,
        mut run: PipelineRun,
        cancel: CancellationToken,
    ) -> Result<RunReport, RunFailure> {
        let stages = run.graph.stages();
        info!(
            "Run {} starting: {} mode, {} images, stages {:?}",
            run.id,
            run.graph.mode(),
            run.input.batch.len(),
            stages
        );
        self.progress.on_run_start(&run.id, &stages);
        let mode = if run.is_replay() {
            format!("{} (replay)", run.graph.mode())
        } else {
            run.graph.mode().to_string()
        };
        self.logger
            .log(RunEvent::run_started(&run.id, &mode, run.input.batch.len()));

        let outcome = match graph::validate(&run.graph, &self.stages) {
            Err(error) => Err(Halt {
                error,
                resume_from: run.resume_from,
            }),
            Ok(()) => match run.graph.clone() {
                ExecutionGraph::Sequential { stages } => {
                    self.run_sequential(&mut run, &stages, &cancel).await
                }
                ExecutionGraph::DelegatingRoot { root, .. } => {
                    self.run_delegating(&mut run, root, &cancel).await
                }
            },
        };

        match outcome {
            Ok(()) => {
                let output = run.context.last_contract_bearing().cloned();
                advance(&mut run.state, RunState::Completed(output.clone()));
                self.progress.on_run_complete(&run.state);
                self.logger.log(RunEvent::run_finished(&run.id, &run.state));
                info!("Run {} completed ({} trace entries)", run.id, run.trace.entries().len());

                Ok(RunReport {
                    run_id: run.id,
                    state: run.state,
                    output,
                    narrative: run.context.last_narrative().map(str::to_string),
                    trace: run.trace,
                    results: run.context,
                })
            }
            Err(Halt { error, resume_from }) => {
                let next = if error.is_cancelled() {
                    RunState::Aborted { at: error.stage() }
                } else {
                    RunState::Failed(error.clone())
                };
                advance(&mut run.state, next);
                self.progress.on_run_complete(&run.state);
                self.logger.log(RunEvent::run_finished(&run.id, &run.state));
                warn!("Run {} {}", run.id, run.state);

                Err(RunFailure {
                    run_id: run.id,
                    state: run.state,
                    error,
                    trace: run.trace,
                    checkpoint: Checkpoint {
                        graph: run.graph,
                        input: run.input,
                        context: run.context,
                        resume_from,
                    },
                })
            }
        }
    }

    async fn run_sequential(
        &self,
        run: &mut PipelineRun,
        plans: &[StagePlan],
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        for (index, plan) in plans.iter().enumerate().skip(run.resume_from) {
            let stage_id = plan.stage;
            if !plan.enabled {
                let reason = "disabled by configuration";
                debug!("{} {}", stage_id, reason);
                self.progress.on_stage_failed(stage_id, reason, true);
                self.logger
                    .log(RunEvent::stage_skipped(&run.id, stage_id, reason));
                run.trace.record(TraceEntry {
                    stage: stage_id,
                    call_id: None,
                    status: TraceStatus::Skipped {
                        reason: reason.to_string(),
                    },
                    elapsed_ms: 0,
                });
                continue;
            }
            if cancel.is_cancelled() {
                info!("Run {} cancelled before {}", run.id, stage_id);
                return Err(Halt {
                    error: RunError::Cancelled {
                        at: Some(stage_id),
                    },
                    resume_from: index,
                });
            }

            let stage = self.stage(stage_id)?;
            advance(
                &mut run.state,
                RunState::Running(RunPosition::Stage {
                    index,
                    stage: stage_id,
                }),
            );
            self.progress.on_stage_start(stage_id);
            self.logger.log(RunEvent::stage_started(&run.id, stage_id));

            let ctx = StageContext {
                run: run.context.clone(),
                capabilities: self.capabilities_for(&stage.grant(), None),
                cancel: cancel.clone(),
                progress: self.progress.clone(),
            };
            let started = Instant::now();
            let result = stage.run(&run.input, &ctx).await.map(Arc::new);
            let elapsed_ms = started.elapsed().as_millis() as u64;

            self.finish_stage(
                &run.id,
                &mut run.trace,
                stage_id,
                None,
                &result,
                plan.optional,
                elapsed_ms,
            );
            match result {
                Ok(output) => run.context.push(stage_id, output),
                Err(e) if e.is_cancelled() => {
                    return Err(Halt {
                        error: RunError::Cancelled {
                            at: Some(stage_id),
                        },
                        resume_from: index,
                    });
                }
                Err(_) if plan.optional => {}
                Err(source) => {
                    return Err(Halt {
                        error: RunError::StageFailed {
                            stage: stage_id,
                            source,
                        },
                        resume_from: index,
                    });
                }
            }
        }
        Ok(())
    }

    async fn run_delegating(
        &self,
        run: &mut PipelineRun,
        root: StageId,
        cancel: &CancellationToken,
    ) -> Result<(), Halt> {
        let root_stage = self.stage(root)?;
        if cancel.is_cancelled() {
            return Err(Halt {
                error: RunError::Cancelled { at: Some(root) },
                resume_from: 0,
            });
        }
        advance(
            &mut run.state,
            RunState::Running(RunPosition::Stage {
                index: 0,
                stage: root,
            }),
        );
        self.progress.on_stage_start(root);
        self.logger.log(RunEvent::stage_started(&run.id, root));

        let snapshot = run.context.clone();
        let book = Arc::new(Mutex::new(RunBook {
            state: std::mem::replace(&mut run.state, RunState::Pending),
            context: std::mem::take(&mut run.context),
            trace: std::mem::take(&mut run.trace),
        }));
        let grant = root_stage.grant();
        let delegate = DelegateCapability::new(
            grant.clone(),
            Arc::new(StageRouter::new(
                self.clone(),
                run.id.clone(),
                root,
                book.clone(),
                cancel.clone(),
            )),
        );
        let ctx = StageContext {
            run: snapshot,
            capabilities: self.capabilities_for(&grant, Some(delegate)),
            cancel: cancel.clone(),
            progress: self.progress.clone(),
        };

        let started = Instant::now();
        let result = root_stage.run(&run.input, &ctx).await.map(Arc::new);
        let elapsed_ms = started.elapsed().as_millis() as u64;
        drop(ctx);

        {
            let mut book = router::lock(&book);
            run.state = std::mem::replace(&mut book.state, RunState::Pending);
            run.context = std::mem::take(&mut book.context);
            run.trace = std::mem::take(&mut book.trace);
        }
        info!(
            "Root made {} delegation calls",
            run.trace.entries().iter().filter(|e| e.call_id.is_some()).count()
        );

        self.finish_stage(
            &run.id,
            &mut run.trace,
            root,
            None,
            &result,
            false,
            elapsed_ms,
        );
        match result {
            Ok(output) => {
                run.context.push(root, output);
                Ok(())
            }
            Err(e) if e.is_cancelled() => {
                let at = run.state.position().map(|p| p.stage()).unwrap_or(root);
                Err(Halt {
                    error: RunError::Cancelled { at: Some(at) },
                    resume_from: 0,
                })
            }
            Err(source) => Err(Halt {
                error: RunError::StageFailed {
                    stage: root,
                    source,
                },
                resume_from: 0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::{
        DelegatingRootStage, ExtractionStage, LandmarkStage, QuestionStage, SelectionStage,
    };
    use crate::test_support::*;
    use async_trait::async_trait;
    use atlance_domain::{ContractError, SelectionResult};
    use serde_json::json;

    const SELECT_047: &str =
        r#"{"selected_indices": [7, 0, 4], "reasons": "three distinct scenes"}"#;

    const EXTRACT_047: &str = r#"{"images": [
        {"path": "IMG_0.jpg", "timestamp": null, "location": null, "subjects": ["harbour"]},
        {"path": "IMG_4.jpg", "timestamp": null, "location": null, "subjects": ["castle"]},
        {"path": "IMG_7.jpg", "timestamp": null, "location": null, "subjects": ["market"]}
    ], "preliminary_story": "A harbour town."}"#;

    fn sequential_coordinator(gateway: &Arc<ScriptedGateway>) -> PipelineCoordinator {
        PipelineCoordinator::new()
            .with_stage(Arc::new(SelectionStage::new(access(gateway.clone()), 3)))
            .with_stage(Arc::new(LandmarkStage::new(access(gateway.clone()))))
            .with_stage(Arc::new(ExtractionStage::new(access(gateway.clone()))))
    }

    fn default_graph() -> ExecutionGraph {
        ExecutionGraph::sequential([
            StagePlan::required(StageId::Selection),
            StagePlan::optional(StageId::Landmark),
            StagePlan::required(StageId::Extraction),
        ])
    }

    #[tokio::test]
    async fn test_optional_landmark_failure_is_skipped() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text(SELECT_047),
            Scripted::text(
                r#"{"candidates": [
                    {"image_index": 4, "description": "castle", "search_query": "hill castle"}
                ]}"#,
            ),
            Scripted::text(EXTRACT_047),
        ]);
        let search = StaticSearch::new([("hill castle", Err("HTTP 503"))]);
        let coordinator =
            sequential_coordinator(&gateway).with_search(search_capability(search));

        let run = coordinator.new_run(default_graph(), input(10));
        let report = coordinator
            .execute(run, CancellationToken::new())
            .await
            .unwrap();

        assert!(matches!(report.state, RunState::Completed(Some(_))));
        let skipped: Vec<_> = report.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].0, StageId::Landmark);
        assert!(report.results.landmarks().is_none());

        let Some(StageOutput::Extraction(result)) = report.output.as_deref() else {
            panic!("expected extraction output");
        };
        let paths: Vec<_> = result.images.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["IMG_0.jpg", "IMG_4.jpg", "IMG_7.jpg"]);
        assert_eq!(report.narrative.as_deref(), Some("A harbour town."));

        let extraction_prompt = gateway.prompts().last().cloned().unwrap();
        assert_eq!(extraction_prompt.images.len(), 3);
        assert!(!extraction_prompt.text.contains("Verified landmark information"));
    }

    #[tokio::test]
    async fn test_mandatory_failure_fails_run_with_trace() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::fail("model offline"),
        ]);
        let coordinator = sequential_coordinator(&gateway);

        let run = coordinator.new_run(default_graph(), input(4));
        let failure = coordinator
            .execute(run, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(failure.state, RunState::Failed(_)));
        assert!(matches!(
            failure.error,
            RunError::StageFailed {
                stage: StageId::Selection,
                source: StageError::CapabilityUnavailable { .. },
            }
        ));
        let failed: Vec<_> = failure.trace.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, StageId::Selection);
        assert_eq!(failure.checkpoint.resume_from, 0);
    }

    #[tokio::test]
    async fn test_disabled_stage_is_traced_and_not_run() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text(SELECT_047),
            Scripted::text(EXTRACT_047),
        ]);
        let coordinator = sequential_coordinator(&gateway);
        let graph = ExecutionGraph::sequential([
            StagePlan::required(StageId::Selection),
            StagePlan::optional(StageId::Landmark).enabled(false),
            StagePlan::required(StageId::Extraction),
        ]);

        let report = coordinator
            .execute(coordinator.new_run(graph, input(10)), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            report.skipped().collect::<Vec<_>>(),
            vec![(StageId::Landmark, "disabled by configuration")]
        );
        assert_eq!(gateway.systems().len(), 2);
    }

    #[tokio::test]
    async fn test_replay_resumes_at_failed_stage() {
        let bad = r#"{"images": [], "preliminary_story": "?"}"#;
        let gateway = ScriptedGateway::single(vec![
            Scripted::text(SELECT_047),
            Scripted::text(bad),
            Scripted::text(bad),
            Scripted::text(EXTRACT_047),
        ]);
        let coordinator = sequential_coordinator(&gateway);
        let graph = ExecutionGraph::sequential([
            StagePlan::required(StageId::Selection),
            StagePlan::required(StageId::Extraction),
        ]);

        let failure = coordinator
            .execute(coordinator.new_run(graph, input(10)), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            RunError::StageFailed {
                stage: StageId::Extraction,
                source: StageError::ContractViolation {
                    source: ContractError::ConstraintViolation {
                        constraint: "image_count",
                        ..
                    },
                    ..
                },
            }
        ));
        assert_eq!(failure.checkpoint.resume_from, 1);
        let run_id = failure.run_id.clone();

        let replay = coordinator.replay(failure);
        assert_eq!(replay.id(), run_id);
        assert!(replay.is_replay());
        let report = coordinator
            .execute(replay, CancellationToken::new())
            .await
            .unwrap();

        // Selection ran once; only extraction was opened again
        assert_eq!(report.trace.succeeded_count(StageId::Selection), 1);
        assert_eq!(report.trace.invocation_count(StageId::Extraction), 2);
        assert_eq!(gateway.systems().len(), 3);
        assert!(matches!(
            report.output.as_deref(),
            Some(StageOutput::Extraction(r)) if r.images.len() == 3
        ));
    }

    #[tokio::test]
    async fn test_cancel_during_question_aborts_without_second_question() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::text("Who took the photo of the harbour?"),
            Scripted::text("What did you eat at the market?"),
        ]);
        let answers = Arc::new(PendingAnswers::default());
        let progress = Arc::new(RecordingProgress::default());
        let coordinator = PipelineCoordinator::new()
            .with_stage(Arc::new(QuestionStage::new(access(gateway.clone()), 3)))
            .with_answers(answers.clone())
            .with_progress(progress.clone());

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let waiting = answers.clone();
        tokio::spawn(async move {
            waiting.requested().await;
            trigger.cancel();
        });

        let run = coordinator.new_run(
            ExecutionGraph::sequential([StagePlan::required(StageId::Question)]),
            input(2),
        );
        let failure = coordinator.execute(run, cancel).await.unwrap_err();

        assert!(failure.is_cancelled());
        assert_eq!(
            failure.state,
            RunState::Aborted {
                at: Some(StageId::Question)
            }
        );
        assert_eq!(answers.request_count(), 1);
        let questions = progress
            .events()
            .into_iter()
            .filter(|e| e.starts_with("question "))
            .count();
        assert_eq!(questions, 1);
        assert!(progress.events().contains(&"run aborted".to_string()));
    }

    #[tokio::test]
    async fn test_cancel_inside_model_call_aborts() {
        let gateway = ScriptedGateway::single(vec![Scripted::Hang]);
        let coordinator = sequential_coordinator(&gateway);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let failure = coordinator
            .execute(coordinator.new_run(default_graph(), input(3)), cancel)
            .await
            .unwrap_err();
        assert_eq!(
            failure.error,
            RunError::Cancelled {
                at: Some(StageId::Selection)
            }
        );
        assert_eq!(
            failure.trace.entries()[0].status,
            TraceStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn test_delegating_root_routes_repeated_calls_by_id() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::tool_calls(vec![
                ("call_1", "duplicate_remover", json!({})),
                ("call_2", "duplicate_remover", json!({"note": "only sunsets"})),
            ]),
            Scripted::text(r#"{"selected_indices": [0, 1], "reasons": "first pass"}"#),
            Scripted::text(r#"{"selected_indices": [3], "reasons": "sunset"}"#),
            Scripted::text("Two passes done."),
        ]);
        let coordinator = PipelineCoordinator::new()
            .with_stage(Arc::new(SelectionStage::new(access(gateway.clone()), 3)))
            .with_stage(Arc::new(ExtractionStage::new(access(gateway.clone()))))
            .with_stage(Arc::new(DelegatingRootStage::new(
                access(gateway.clone()),
                [StageId::Selection, StageId::Extraction],
                4,
            )));
        let graph =
            ExecutionGraph::delegating(StageId::Root, [StageId::Selection, StageId::Extraction]);

        let report = coordinator
            .execute(coordinator.new_run(graph, input(5)), CancellationToken::new())
            .await
            .unwrap();

        let results = gateway.tool_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0][0].tool_use_id, "call_1");
        assert!(results[0][0].output.contains("\"selected_indices\":[0,1]"));
        assert_eq!(results[0][1].tool_use_id, "call_2");
        assert!(results[0][1].output.contains("\"selected_indices\":[3]"));
        // The note reached only the second call
        assert!(gateway.prompts()[2].text.contains("only sunsets"));
        assert!(!gateway.prompts()[1].text.contains("only sunsets"));

        let calls: Vec<_> = report
            .trace
            .entries()
            .iter()
            .filter_map(|e| e.call_id.as_deref())
            .collect();
        assert_eq!(calls, vec!["call_1", "call_2"]);
        assert_eq!(
            report.output.as_deref(),
            Some(&StageOutput::Selection(SelectionResult::new(vec![3], "sunset")))
        );
        assert_eq!(report.narrative.as_deref(), Some("Two passes done."));
        assert!(matches!(report.state, RunState::Completed(_)));
    }

    #[tokio::test]
    async fn test_delegate_failure_is_reported_to_root() {
        let gateway = ScriptedGateway::single(vec![
            Scripted::tool_calls(vec![("call_1", "data_extractor", json!({}))]),
            Scripted::text("Could not extract without a selection."),
        ]);
        let coordinator = PipelineCoordinator::new()
            .with_stage(Arc::new(ExtractionStage::new(access(gateway.clone()))))
            .with_stage(Arc::new(DelegatingRootStage::new(
                access(gateway.clone()),
                [StageId::Extraction],
                4,
            )));
        let graph = ExecutionGraph::delegating(StageId::Root, [StageId::Extraction]);

        let report = coordinator
            .execute(coordinator.new_run(graph, input(2)), CancellationToken::new())
            .await
            .unwrap();
        let results = gateway.tool_results();
        assert!(results[0][0].is_error);
        assert!(results[0][0].output.contains("selection"));
        assert_eq!(report.trace.failed().count(), 1);
        assert!(report.output.is_none());
    }

    /// Stage claiming a delegate grant while posing as a delegate.
    struct GreedyStage;

    #[async_trait]
    impl Stage for GreedyStage {
        fn id(&self) -> StageId {
            StageId::Selection
        }

        fn grant(&self) -> CapabilityGrant {
            CapabilityGrant::delegating([StageId::Extraction])
        }

        fn contract(&self) -> Option<&'static str> {
            None
        }

        async fn run(
            &self,
            _input: &StageInput,
            _ctx: &StageContext,
        ) -> Result<StageOutput, StageError> {
            Ok(StageOutput::Text("should never run".to_string()))
        }
    }

    #[tokio::test]
    async fn test_graph_rejects_delegate_with_delegate_grant() {
        let gateway = ScriptedGateway::single(vec![]);
        let coordinator = PipelineCoordinator::new()
            .with_stage(Arc::new(GreedyStage))
            .with_stage(Arc::new(DelegatingRootStage::new(
                access(gateway.clone()),
                [StageId::Selection],
                4,
            )));
        let graph = ExecutionGraph::delegating(StageId::Root, [StageId::Selection]);

        let err = coordinator.validate(&graph).unwrap_err();
        assert!(matches!(err, RunError::InvalidGraph(ref m) if m.contains("duplicate_remover")));

        let failure = coordinator
            .execute(coordinator.new_run(graph, input(1)), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(failure.state, RunState::Failed(RunError::InvalidGraph(_))));
        assert!(gateway.prompts().is_empty());
    }

    #[test]
    fn test_graph_validation_rules() {
        let gateway = ScriptedGateway::single(vec![]);
        let coordinator = sequential_coordinator(&gateway).with_stage(Arc::new(
            DelegatingRootStage::new(access(gateway), [StageId::Selection], 4),
        ));

        assert!(coordinator.validate(&default_graph()).is_ok());
        assert!(coordinator.validate(&ExecutionGraph::sequential([])).is_err());
        // Unregistered stage
        assert!(coordinator
            .validate(&ExecutionGraph::sequential([StagePlan::required(StageId::Question)]))
            .is_err());
        // Root inside a sequential graph
        assert!(coordinator
            .validate(&ExecutionGraph::sequential([StagePlan::required(StageId::Root)]))
            .is_err());
        // Self-delegation
        assert!(coordinator
            .validate(&ExecutionGraph::delegating(StageId::Root, [StageId::Root]))
            .is_err());
        // Graph delegate the root was not granted
        assert!(coordinator
            .validate(&ExecutionGraph::delegating(
                StageId::Root,
                [StageId::Selection, StageId::Extraction]
            ))
            .is_err());
        assert!(coordinator
            .validate(&ExecutionGraph::delegating(StageId::Root, [StageId::Selection]))
            .is_ok());
    }

    #[test]
    fn test_capabilities_follow_grant() {
        let coordinator = PipelineCoordinator::new()
            .with_search(search_capability(StaticSearch::new([])))
            .with_answers(Arc::new(crate::ports::answer::DeclineAnswers));

        let none = coordinator.capabilities_for(&CapabilityGrant::none(), None);
        assert!(none.search.is_none() && none.answers.is_none());
        let search = coordinator.capabilities_for(&CapabilityGrant::search_only(), None);
        assert!(search.search.is_some() && search.answers.is_none());
        let interactive = coordinator.capabilities_for(&CapabilityGrant::interactive(), None);
        assert!(interactive.answers.is_some() && interactive.search.is_none());
    }
}
