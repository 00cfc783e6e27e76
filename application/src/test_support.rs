//! Scripted ports shared by the stage and coordinator tests.

use crate::capability::{GrantedCapabilities, RetryPolicy, SearchCapability};
use crate::ports::answer::{AnswerError, AnswerPort};
use crate::ports::llm_gateway::{
    GatewayError, LlmGateway, LlmSession, ModelPrompt, ToolResultMessage,
};
use crate::ports::progress::{NoProgress, PipelineProgressNotifier};
use crate::ports::search::{SearchError, SearchPort};
use crate::stages::{ModelAccess, StageContext, StageInput};
use async_trait::async_trait;
use atlance_domain::{
    CapabilityKind, ContentBlock, ImageBatch, ImageRef, LlmResponse, Model, Question,
    RunContext, RunState, StageId, StopReason, ToolDefinition,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// One scripted model reply.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Reply(LlmResponse),
    Fail(GatewayError),
    /// Never replies
    Hang,
}

impl Scripted {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Scripted::Reply(LlmResponse::from_text(text))
    }

    pub(crate) fn tool_calls(calls: Vec<(&str, &str, serde_json::Value)>) -> Self {
        let content = calls
            .into_iter()
            .map(|(id, name, args)| ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: serde_json::from_value(args).unwrap_or_default(),
            })
            .collect();
        Scripted::Reply(LlmResponse {
            content,
            stop_reason: Some(StopReason::ToolUse),
            model: None,
        })
    }

    pub(crate) fn fail(message: &str) -> Self {
        Scripted::Fail(GatewayError::RequestFailed(message.to_string()))
    }
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Scripted>>,
    systems: Mutex<Vec<String>>,
    prompts: Mutex<Vec<ModelPrompt>>,
    tool_results: Mutex<Vec<Vec<ToolResultMessage>>>,
}

impl Script {
    async fn next(&self) -> Result<LlmResponse, GatewayError> {
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(e)) => Err(e),
            Some(Scripted::Hang) => std::future::pending().await,
            None => Ok(LlmResponse::from_text("(no more responses)")),
        }
    }
}

/// Gateway replaying one reply queue across every session it opens.
///
/// Stages run sequentially, so the queue order is the call order.
pub(crate) struct ScriptedGateway {
    script: Arc<Script>,
}

impl ScriptedGateway {
    pub(crate) fn single(replies: Vec<Scripted>) -> Arc<Self> {
        let script = Script::default();
        *script.replies.lock().unwrap() = replies.into();
        Arc::new(Self {
            script: Arc::new(script),
        })
    }

    /// Every prompt sent, across sessions.
    pub(crate) fn prompts(&self) -> Vec<ModelPrompt> {
        self.script.prompts.lock().unwrap().clone()
    }

    pub(crate) fn systems(&self) -> Vec<String> {
        self.script.systems.lock().unwrap().clone()
    }

    /// Tool result batches, one per `send_tool_results` call.
    pub(crate) fn tool_results(&self) -> Vec<Vec<ToolResultMessage>> {
        self.script.tool_results.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn create_session_with_system_prompt(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        self.script
            .systems
            .lock()
            .unwrap()
            .push(system_prompt.to_string());
        Ok(Box::new(ScriptedSession {
            model: model.clone(),
            script: self.script.clone(),
        }))
    }

    async fn available_models(&self) -> Result<Vec<Model>, GatewayError> {
        Ok(vec![Model::default()])
    }
}

struct ScriptedSession {
    model: Model,
    script: Arc<Script>,
}

#[async_trait]
impl LlmSession for ScriptedSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, prompt: &ModelPrompt) -> Result<String, GatewayError> {
        self.script.prompts.lock().unwrap().push(prompt.clone());
        self.script.next().await.map(|r| r.text_content())
    }

    async fn send_with_tools(
        &self,
        prompt: &ModelPrompt,
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        self.script.prompts.lock().unwrap().push(prompt.clone());
        self.script.next().await
    }

    async fn send_tool_results(
        &self,
        results: &[ToolResultMessage],
    ) -> Result<LlmResponse, GatewayError> {
        self.script
            .tool_results
            .lock()
            .unwrap()
            .push(results.to_vec());
        self.script.next().await
    }
}

/// Search port answering from a fixed table; unknown queries return no
/// snippets.
pub(crate) struct StaticSearch {
    table: HashMap<String, Result<Vec<String>, String>>,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub(crate) fn new(
        table: impl IntoIterator<Item = (&'static str, Result<Vec<String>, &'static str>)>,
    ) -> Arc<Self> {
        Arc::new(Self {
            table: table
                .into_iter()
                .map(|(q, r)| (q.to_string(), r.map_err(str::to_string)))
                .collect(),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchPort for StaticSearch {
    async fn search(&self, query: &str) -> Result<Vec<String>, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        match self.table.get(query) {
            Some(Ok(snippets)) => Ok(snippets.clone()),
            Some(Err(e)) => Err(SearchError::RequestFailed(e.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Answer port that never answers; lets tests cancel while a question is
/// outstanding.
#[derive(Default)]
pub(crate) struct PendingAnswers {
    requests: AtomicUsize,
    asked: Notify,
}

impl PendingAnswers {
    /// Resolves once the first question has been asked.
    pub(crate) async fn requested(&self) {
        self.asked.notified().await;
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerPort for PendingAnswers {
    async fn request_answer(&self, _question: &Question) -> Result<String, AnswerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.asked.notify_one();
        std::future::pending().await
    }
}

/// Progress notifier recording events as short strings.
#[derive(Default)]
pub(crate) struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl PipelineProgressNotifier for RecordingProgress {
    fn on_stage_start(&self, stage: StageId) {
        self.push(format!("start {}", stage));
    }

    fn on_stage_complete(&self, stage: StageId, _summary: &str) {
        self.push(format!("complete {}", stage));
    }

    fn on_stage_failed(&self, stage: StageId, _reason: &str, skipped: bool) {
        let verb = if skipped { "skipped" } else { "failed" };
        self.push(format!("{} {}", verb, stage));
    }

    fn on_run_complete(&self, state: &RunState) {
        self.push(format!("run {}", state.name()));
    }

    fn on_capability_call(&self, stage: StageId, kind: CapabilityKind, _detail: &str) {
        self.push(format!("call {} {:?}", stage, kind));
    }

    fn on_question(&self, question: &Question) {
        self.push(format!("question {}", question.content()));
    }
}

pub(crate) fn fast_retry() -> RetryPolicy {
    RetryPolicy::default()
        .with_max_attempts(1)
        .with_backoff(Duration::from_millis(1))
        .with_timeout(Duration::from_secs(5))
}

pub(crate) fn access(gateway: Arc<ScriptedGateway>) -> ModelAccess {
    ModelAccess::new(gateway, Model::default())
        .with_retry(fast_retry())
        .with_contract_retries(1)
}

pub(crate) fn search_capability(port: Arc<StaticSearch>) -> SearchCapability {
    SearchCapability::new(port, fast_retry())
}

/// Batch of `n` images named `IMG_0.jpg`, `IMG_1.jpg`, ...
pub(crate) fn batch(n: usize) -> ImageBatch {
    ImageBatch::from_refs((0..n).map(|i| ImageRef::new(format!("IMG_{}.jpg", i))))
        .expect("non-empty batch")
}

pub(crate) fn input(n: usize) -> StageInput {
    StageInput::new(batch(n))
}

pub(crate) fn context_with(run: RunContext, capabilities: GrantedCapabilities) -> StageContext {
    StageContext {
        run,
        capabilities,
        cancel: CancellationToken::new(),
        progress: Arc::new(NoProgress),
    }
}

pub(crate) fn stage_context() -> StageContext {
    context_with(RunContext::new(), GrantedCapabilities::none())
}
