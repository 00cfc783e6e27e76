//! Pipeline parameters: graph shape and stage limits.
//!
//! [`PipelineParams`] is built from the file configuration by the
//! infrastructure layer and adjusted by CLI flags. It knows how to turn
//! itself into an [`ExecutionGraph`] and a wired [`PipelineCoordinator`].

use crate::capability::{RetryPolicy, SearchCapability};
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::search::SearchPort;
use crate::stages::{
    DelegatingRootStage, ExtractionStage, LandmarkStage, ModelAccess, QuestionStage,
    SelectionStage, Stage,
};
use crate::use_cases::run_pipeline::{ExecutionGraph, PipelineCoordinator, StagePlan};
use atlance_domain::{Model, StageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// How stages are composed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// selection → landmarks → extraction → questions
    #[default]
    Sequential,
    /// A root model calls the stages as tools
    Delegating,
}

impl PipelineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineMode::Sequential => "sequential",
            PipelineMode::Delegating => "delegating",
        }
    }
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Ok(PipelineMode::Sequential),
            "delegating" | "root" => Ok(PipelineMode::Delegating),
            other => Err(format!(
                "unknown pipeline mode '{}' (expected sequential or delegating)",
                other
            )),
        }
    }
}

/// Model per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageModels {
    pub default: Model,
    #[serde(default)]
    pub overrides: BTreeMap<StageId, Model>,
}

impl StageModels {
    pub fn for_stage(&self, stage: StageId) -> &Model {
        self.overrides.get(&stage).unwrap_or(&self.default)
    }
}

/// Pipeline shape and limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub mode: PipelineMode,
    /// Upper bound on photos kept by selection
    pub max_selected: usize,
    pub enable_landmarks: bool,
    /// Whether a landmark failure is skipped instead of failing the run
    pub landmarks_optional: bool,
    pub enable_questions: bool,
    pub max_questions: usize,
    /// Re-prompts after a contract violation
    pub contract_retries: usize,
    pub max_delegation_turns: usize,
    pub model_retry: RetryPolicy,
    pub search_retry: RetryPolicy,
    pub max_concurrent_searches: usize,
    pub models: StageModels,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            mode: PipelineMode::Sequential,
            max_selected: 3,
            enable_landmarks: true,
            landmarks_optional: true,
            enable_questions: true,
            max_questions: 3,
            contract_retries: 1,
            max_delegation_turns: 8,
            model_retry: RetryPolicy::default(),
            search_retry: RetryPolicy::default().with_timeout(Duration::from_secs(15)),
            max_concurrent_searches: 4,
            models: StageModels::default(),
        }
    }
}

impl PipelineParams {
    // ==================== Builder Methods ====================

    pub fn with_mode(mut self, mode: PipelineMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_selected(mut self, max: usize) -> Self {
        self.max_selected = max;
        self
    }

    pub fn with_landmarks(mut self, enabled: bool) -> Self {
        self.enable_landmarks = enabled;
        self
    }

    pub fn with_landmarks_optional(mut self, optional: bool) -> Self {
        self.landmarks_optional = optional;
        self
    }

    pub fn with_questions(mut self, enabled: bool) -> Self {
        self.enable_questions = enabled;
        self
    }

    pub fn with_max_questions(mut self, max: usize) -> Self {
        self.max_questions = max;
        self
    }

    pub fn with_contract_retries(mut self, retries: usize) -> Self {
        self.contract_retries = retries;
        self
    }

    pub fn with_max_delegation_turns(mut self, max: usize) -> Self {
        self.max_delegation_turns = max;
        self
    }

    pub fn with_model_retry(mut self, policy: RetryPolicy) -> Self {
        self.model_retry = policy;
        self
    }

    pub fn with_search_retry(mut self, policy: RetryPolicy) -> Self {
        self.search_retry = policy;
        self
    }

    pub fn with_max_concurrent_searches(mut self, max: usize) -> Self {
        self.max_concurrent_searches = max;
        self
    }

    pub fn with_default_model(mut self, model: Model) -> Self {
        self.models.default = model;
        self
    }

    pub fn with_stage_model(mut self, stage: StageId, model: Model) -> Self {
        self.models.overrides.insert(stage, model);
        self
    }

    // ==================== Graph ====================

    /// Stages the root may call in delegating mode.
    pub fn delegates(&self) -> Vec<StageId> {
        let mut delegates = vec![StageId::Selection];
        if self.enable_landmarks {
            delegates.push(StageId::Landmark);
        }
        delegates.push(StageId::Extraction);
        if self.enable_questions {
            delegates.push(StageId::Question);
        }
        delegates
    }

    pub fn graph(&self) -> ExecutionGraph {
        match self.mode {
            PipelineMode::Sequential => ExecutionGraph::sequential([
                StagePlan::required(StageId::Selection),
                StagePlan {
                    stage: StageId::Landmark,
                    optional: self.landmarks_optional,
                    enabled: self.enable_landmarks,
                },
                StagePlan::required(StageId::Extraction),
                StagePlan::optional(StageId::Question).enabled(self.enable_questions),
            ]),
            PipelineMode::Delegating => ExecutionGraph::delegating(StageId::Root, self.delegates()),
        }
    }

    fn access(&self, gateway: &Arc<dyn LlmGateway>, stage: StageId) -> ModelAccess {
        ModelAccess::new(gateway.clone(), self.models.for_stage(stage).clone())
            .with_retry(self.model_retry)
            .with_contract_retries(self.contract_retries)
    }

    /// Every stage, configured from these parameters.
    pub fn build_stages(&self, gateway: Arc<dyn LlmGateway>) -> Vec<Arc<dyn Stage>> {
        vec![
            Arc::new(SelectionStage::new(
                self.access(&gateway, StageId::Selection),
                self.max_selected,
            )),
            Arc::new(LandmarkStage::new(self.access(&gateway, StageId::Landmark))),
            Arc::new(ExtractionStage::new(self.access(&gateway, StageId::Extraction))),
            Arc::new(QuestionStage::new(
                self.access(&gateway, StageId::Question),
                self.max_questions,
            )),
            Arc::new(DelegatingRootStage::new(
                self.access(&gateway, StageId::Root),
                self.delegates(),
                self.max_delegation_turns,
            )),
        ]
    }

    /// Wrap a search provider with the configured retry policy and
    /// concurrency bound.
    pub fn search_capability(&self, port: Arc<dyn SearchPort>) -> SearchCapability {
        SearchCapability::new(port, self.search_retry)
            .with_max_concurrent(self.max_concurrent_searches)
    }

    /// A coordinator with every stage registered. Capability providers,
    /// progress and logging are attached by the caller.
    pub fn coordinator(&self, gateway: Arc<dyn LlmGateway>) -> PipelineCoordinator {
        self.build_stages(gateway)
            .into_iter()
            .fold(PipelineCoordinator::new(), |c, stage| c.with_stage(stage))
    }
}
