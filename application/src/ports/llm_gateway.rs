//! LLM Gateway port
//!
//! Defines the interface for communicating with the model provider.

use async_trait::async_trait;
use atlance_domain::{ImageRef, LlmResponse, Model, ToolDefinition};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// A prompt with the images to attach to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPrompt {
    pub text: String,
    pub images: Vec<ImageRef>,
}

impl ModelPrompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: Vec::new(),
        }
    }

    pub fn with_images(mut self, images: impl IntoIterator<Item = ImageRef>) -> Self {
        self.images.extend(images);
        self
    }
}

/// Result of one tool call, sent back to the model.
///
/// `tool_use_id` is the provider-assigned id of the call this result answers.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResultMessage {
    pub tool_use_id: String,
    pub tool_name: String,
    pub output: String,
    pub is_error: bool,
}

/// Gateway for LLM communication
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Create a new session with a system prompt
    async fn create_session_with_system_prompt(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;

    /// Get available models
    async fn available_models(&self) -> Result<Vec<Model>, GatewayError>;
}

/// An active LLM session. Each call continues the same conversation.
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the model used by this session
    fn model(&self) -> &Model;

    /// Send a prompt and get the text reply
    async fn send(&self, prompt: &ModelPrompt) -> Result<String, GatewayError>;

    /// Send a prompt asking for output shaped by `schema`.
    ///
    /// The reply is still raw text; callers validate it against their
    /// contract. Defaults to [`send`](Self::send) for providers without
    /// schema-constrained decoding.
    async fn send_structured(
        &self,
        prompt: &ModelPrompt,
        _schema: &serde_json::Value,
    ) -> Result<String, GatewayError> {
        self.send(prompt).await
    }

    /// Send a prompt with tool definitions (native tool use)
    async fn send_with_tools(
        &self,
        _prompt: &ModelPrompt,
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        Err(GatewayError::Unsupported(format!(
            "{} does not support tool use",
            self.model()
        )))
    }

    /// Send tool results back and get the next response
    async fn send_tool_results(
        &self,
        _results: &[ToolResultMessage],
    ) -> Result<LlmResponse, GatewayError> {
        Err(GatewayError::Unsupported(format!(
            "{} does not support tool use",
            self.model()
        )))
    }
}
