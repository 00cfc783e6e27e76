//! Pipeline stages.
//!
//! A stage turns a [`StageInput`] plus the results already in the run into
//! one [`StageOutput`]. Stages with a contract validate their model output
//! before returning it; the question stage and the delegating root return
//! free text.
//!
//! | Stage | Id | Grant | Output |
//! |-------|----|-------|--------|
//! | [`SelectionStage`] | `duplicate_remover` | none | `Selection` |
//! | [`LandmarkStage`] | `landmark_search` | search | `Landmarks` |
//! | [`ExtractionStage`] | `data_extractor` | none | `Extraction` |
//! | [`QuestionStage`] | `question_asker` | answer | `Interview` |
//! | [`DelegatingRootStage`] | `root` | delegate | `Text` |

mod extraction;
mod landmark;
mod question;
mod root;
mod selection;
pub(crate) mod shared;

pub use extraction::ExtractionStage;
pub use landmark::LandmarkStage;
pub use question::QuestionStage;
pub use root::DelegatingRootStage;
pub use selection::SelectionStage;

use crate::capability::{GrantedCapabilities, RetryPolicy};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::progress::PipelineProgressNotifier;
use async_trait::async_trait;
use atlance_domain::{
    CapabilityGrant, ImageBatch, Model, RunContext, StageError, StageId, StageOutput,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Typed input of one stage invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct StageInput {
    pub batch: ImageBatch,
    /// Batch indices to work on instead of the current selection
    pub focus: Option<Vec<usize>>,
    /// Extra guidance from the caller or the delegating root
    pub note: Option<String>,
}

impl StageInput {
    pub fn new(batch: ImageBatch) -> Self {
        Self {
            batch,
            focus: None,
            note: None,
        }
    }

    pub fn with_focus(mut self, focus: Vec<usize>) -> Self {
        self.focus = Some(focus);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// What a stage can see and use while it runs.
#[derive(Clone)]
pub struct StageContext {
    /// Results produced earlier in the run (read-only)
    pub run: RunContext,
    /// Capabilities the coordinator granted to this stage
    pub capabilities: GrantedCapabilities,
    pub cancel: CancellationToken,
    pub progress: Arc<dyn PipelineProgressNotifier>,
}

/// How a stage reaches its model.
#[derive(Clone)]
pub struct ModelAccess {
    pub gateway: Arc<dyn LlmGateway>,
    pub model: Model,
    pub retry: RetryPolicy,
    /// Re-prompts allowed after a contract violation
    pub contract_retries: usize,
}

impl ModelAccess {
    pub fn new(gateway: Arc<dyn LlmGateway>, model: Model) -> Self {
        Self {
            gateway,
            model,
            retry: RetryPolicy::default(),
            contract_retries: 1,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_contract_retries(mut self, retries: usize) -> Self {
        self.contract_retries = retries;
        self
    }
}

/// A single unit of pipeline work.
#[async_trait]
pub trait Stage: Send + Sync {
    fn id(&self) -> StageId;

    /// Capabilities this stage needs; fixed for the stage's lifetime.
    fn grant(&self) -> CapabilityGrant {
        CapabilityGrant::none()
    }

    /// Name of the contract the output is validated against, or `None` for
    /// free-text stages.
    fn contract(&self) -> Option<&'static str>;

    async fn run(&self, input: &StageInput, ctx: &StageContext) -> Result<StageOutput, StageError>;
}
