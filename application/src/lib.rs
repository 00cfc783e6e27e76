//! Application layer for atlance
//!
//! This crate contains the stages of the photo pipeline, the capabilities
//! they may be granted, the port definitions adapters implement, and the
//! coordinator that runs a batch through the stages. It depends only on the
//! domain layer.

pub mod capability;
pub mod config;
pub mod ports;
pub mod stages;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use capability::{
    DelegateCapability, GrantedCapabilities, RetryPolicy, SearchCapability, SearchOutcome,
};
pub use config::{PipelineMode, PipelineParams, StageModels};
pub use ports::{
    answer::{AnswerError, AnswerPort, DeclineAnswers, ScriptedAnswers},
    llm_gateway::{GatewayError, LlmGateway, LlmSession, ModelPrompt, ToolResultMessage},
    progress::{NoProgress, PipelineProgressNotifier},
    run_logger::{NoRunLogger, RunEvent, RunLogger},
    search::{SearchError, SearchPort},
};
pub use stages::{
    DelegatingRootStage, ExtractionStage, LandmarkStage, ModelAccess, QuestionStage,
    SelectionStage, Stage, StageContext, StageInput,
};
pub use use_cases::run_pipeline::{
    Checkpoint, ExecutionGraph, PipelineCoordinator, PipelineRun, RunFailure, RunReport,
    StagePlan,
};
