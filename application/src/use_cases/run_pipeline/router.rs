//! Delegation routing for delegating-root runs.
//!
//! The root stage reaches its delegates only through [`StageRouter`]. Each
//! call runs the named stage against a snapshot of the run context, then
//! appends the result and a trace entry keyed by the call id.

use super::PipelineCoordinator;
use crate::capability::{DelegateRouter, DelegationRequest};
use crate::stages::StageContext;
use async_trait::async_trait;
use atlance_domain::{
    CapabilityError, CapabilityKind, RunContext, RunPosition, RunState, RunTrace, StageError,
    StageId, StageOutput, TraceStatus,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Mutable record of a delegating run, shared between the coordinator and
/// the router. Locked only between awaits.
#[derive(Debug)]
pub(super) struct RunBook {
    pub(super) state: RunState,
    pub(super) context: RunContext,
    pub(super) trace: RunTrace,
}

pub(super) fn lock(book: &Mutex<RunBook>) -> MutexGuard<'_, RunBook> {
    book.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(super) struct StageRouter {
    coordinator: PipelineCoordinator,
    run_id: String,
    root: StageId,
    book: Arc<Mutex<RunBook>>,
    cancel: CancellationToken,
}

impl StageRouter {
    pub(super) fn new(
        coordinator: PipelineCoordinator,
        run_id: String,
        root: StageId,
        book: Arc<Mutex<RunBook>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            run_id,
            root,
            book,
            cancel,
        }
    }
}

#[async_trait]
impl DelegateRouter for StageRouter {
    async fn route(&self, request: DelegationRequest) -> Result<Arc<StageOutput>, StageError> {
        let DelegationRequest {
            call_id,
            stage: stage_id,
            input,
        } = request;

        if self.cancel.is_cancelled() {
            return Err(StageError::Cancelled { stage: stage_id });
        }
        let stage = self
            .coordinator
            .stages
            .get(&stage_id)
            .cloned()
            .ok_or_else(|| StageError::CapabilityUnavailable {
                stage: stage_id,
                source: CapabilityError::NotGranted {
                    capability: CapabilityKind::Delegate,
                    detail: format!("{} is not registered", stage_id),
                },
            })?;

        let snapshot = {
            let mut book = lock(&self.book);
            super::advance(
                &mut book.state,
                RunState::Running(RunPosition::Delegate {
                    stage: stage_id,
                    call_id: call_id.clone(),
                }),
            );
            book.context.clone()
        };

        info!("Delegating to {} (call {})", stage_id, call_id);
        self.coordinator.progress.on_stage_start(stage_id);
        let ctx = StageContext {
            run: snapshot,
            capabilities: self.coordinator.capabilities_for(&stage.grant(), None),
            cancel: self.cancel.clone(),
            progress: self.coordinator.progress.clone(),
        };
        let started = Instant::now();
        let result = stage.run(&input, &ctx).await.map(Arc::new);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut book = lock(&self.book);
        let status = self.coordinator.finish_stage(
            &self.run_id,
            &mut book.trace,
            stage_id,
            Some(&call_id),
            &result,
            false,
            elapsed_ms,
        );
        if let Ok(output) = &result {
            book.context.push(stage_id, output.clone());
        }
        if status != TraceStatus::Cancelled {
            super::advance(
                &mut book.state,
                RunState::Running(RunPosition::Stage {
                    index: 0,
                    stage: self.root,
                }),
            );
        }
        result
    }
}
