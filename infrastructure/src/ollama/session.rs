//! Ollama chat session implementation
//!
//! The chat API is stateless, so the session keeps the conversation history
//! locally and sends all of it with every request. A turn is committed to
//! the history only after the server answered, so a failed or cancelled
//! call can be retried without duplicating the prompt.

use super::client::OllamaClient;
use super::error::OllamaError;
use super::types::{ChatMessage, ChatRequest, ChatResponse, FunctionSpec, ToolSpec};
use async_trait::async_trait;
use atlance_application::{GatewayError, LlmSession, ModelPrompt, ToolResultMessage};
use atlance_domain::{ContentBlock, ImageRef, LlmResponse, Model, StopReason, ToolDefinition};
use base64::Engine as _;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

pub struct OllamaSession {
    client: Arc<OllamaClient>,
    model: Model,
    /// Conversation so far, starting with the system prompt
    messages: Mutex<Vec<ChatMessage>>,
    /// Tools offered to the model (set by `send_with_tools`)
    tools: Mutex<Option<Vec<ToolSpec>>>,
    /// Counter for ids of tool calls the server left unnamed
    call_seq: AtomicUsize,
}

impl OllamaSession {
    pub fn new(client: Arc<OllamaClient>, model: Model, system_prompt: &str) -> Self {
        let messages = if system_prompt.is_empty() {
            Vec::new()
        } else {
            vec![ChatMessage::system(system_prompt)]
        };

        Self {
            client,
            model,
            messages: Mutex::new(messages),
            tools: Mutex::new(None),
            call_seq: AtomicUsize::new(0),
        }
    }

    /// Append `turn`, call the server, and commit both on success.
    async fn exchange(
        &self,
        turn: Vec<ChatMessage>,
        format: Option<serde_json::Value>,
    ) -> Result<LlmResponse, GatewayError> {
        let mut messages = self.messages.lock().await.clone();
        messages.extend(turn.iter().cloned());

        let request = ChatRequest {
            model: self.model.to_string(),
            messages,
            stream: false,
            format,
            tools: self.tools.lock().await.clone(),
            keep_alive: self.client.keep_alive().map(str::to_string),
        };

        let response = self.client.chat(&request).await?;
        let reply = response.message.clone();
        let llm_response = self.to_llm_response(response);

        let mut history = self.messages.lock().await;
        history.extend(turn);
        history.push(reply);

        Ok(llm_response)
    }

    async fn user_turn(&self, prompt: &ModelPrompt) -> Result<Vec<ChatMessage>, GatewayError> {
        if !prompt.images.is_empty() && !self.model.supports_images() {
            return Err(OllamaError::ImagesUnsupported(self.model.to_string()).into());
        }
        let images = encode_images(&prompt.images).await?;
        Ok(vec![ChatMessage::user(prompt.text.clone(), images)])
    }

    fn to_llm_response(&self, response: ChatResponse) -> LlmResponse {
        let mut content = Vec::new();
        if !response.message.content.trim().is_empty() {
            content.push(ContentBlock::text(response.message.content));
        }

        for call in response.message.tool_calls.unwrap_or_default() {
            let id = call.id.unwrap_or_else(|| {
                format!("call_{}", self.call_seq.fetch_add(1, Ordering::Relaxed) + 1)
            });
            let input: HashMap<String, serde_json::Value> =
                call.function.arguments.into_iter().collect();
            content.push(ContentBlock::ToolUse {
                id,
                name: call.function.name,
                input,
            });
        }

        let has_tool_use = content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }));
        let stop_reason = if has_tool_use {
            Some(StopReason::ToolUse)
        } else {
            response.done_reason.map(|reason| match reason.as_str() {
                "stop" => StopReason::EndTurn,
                "length" => StopReason::MaxTokens,
                _ => StopReason::Other(reason),
            })
        };

        LlmResponse {
            content,
            stop_reason,
            model: response.model,
        }
    }
}

/// Read image files and base64-encode them for the chat API.
async fn encode_images(images: &[ImageRef]) -> Result<Vec<String>, OllamaError> {
    let mut encoded = Vec::with_capacity(images.len());
    for image in images {
        let bytes = tokio::fs::read(image.as_str())
            .await
            .map_err(|source| OllamaError::Image {
                path: image.to_string(),
                source,
            })?;
        encoded.push(base64::engine::general_purpose::STANDARD.encode(bytes));
    }
    Ok(encoded)
}

pub(crate) fn to_tool_spec(tool: &ToolDefinition) -> ToolSpec {
    ToolSpec {
        kind: "function",
        function: FunctionSpec {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.input_schema(),
        },
    }
}

#[async_trait]
impl LlmSession for OllamaSession {
    fn model(&self) -> &Model {
        &self.model
    }

    async fn send(&self, prompt: &ModelPrompt) -> Result<String, GatewayError> {
        let turn = self.user_turn(prompt).await?;
        let response = self.exchange(turn, None).await?;
        Ok(response.text_content())
    }

    async fn send_structured(
        &self,
        prompt: &ModelPrompt,
        schema: &serde_json::Value,
    ) -> Result<String, GatewayError> {
        let turn = self.user_turn(prompt).await?;
        let response = self.exchange(turn, Some(schema.clone())).await?;
        Ok(response.text_content())
    }

    async fn send_with_tools(
        &self,
        prompt: &ModelPrompt,
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, GatewayError> {
        if !self.model.supports_tools() {
            return Err(GatewayError::Unsupported(format!(
                "{} does not support tool use",
                self.model
            )));
        }

        debug!(model = %self.model, tools = tools.len(), "Offering tools");
        *self.tools.lock().await = Some(tools.iter().map(to_tool_spec).collect());

        let turn = self.user_turn(prompt).await?;
        self.exchange(turn, None).await
    }

    async fn send_tool_results(
        &self,
        results: &[ToolResultMessage],
    ) -> Result<LlmResponse, GatewayError> {
        let turn = results
            .iter()
            .map(|r| {
                let content = if r.is_error {
                    format!("Error: {}", r.output)
                } else {
                    r.output.clone()
                };
                ChatMessage::tool(r.tool_name.clone(), content)
            })
            .collect();

        self.exchange(turn, None).await
    }
}
