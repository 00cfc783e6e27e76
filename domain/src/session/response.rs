//! LLM response types for native tool use.
//!
//! ```text
//! Plain stages:        send() → String
//! Delegating root:     send_with_tools() → LlmResponse → tool_calls()
//! ```

use crate::tool::entities::ToolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single block of content within an LLM response.
///
/// # Examples
///
/// ```
/// use atlance_domain::session::response::ContentBlock;
///
/// let text = ContentBlock::text("Selecting photos first.");
/// assert!(text.as_text().is_some());
///
/// let tool = ContentBlock::ToolUse {
///     id: "call_1".to_string(),
///     name: "duplicate_remover".to_string(),
///     input: Default::default(),
/// };
/// assert!(tool.as_tool_use().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// A text content block from the model.
    Text { text: String },

    /// A tool use request from the model.
    ToolUse {
        /// Provider-assigned id for correlating with tool results
        id: String,
        /// Tool name as requested by the model
        name: String,
        /// Structured arguments
        input: HashMap<String, serde_json::Value>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// Returns the text content if this is a `Text` block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Returns `(id, name, input)` if this is a `ToolUse` block.
    pub fn as_tool_use(&self) -> Option<(&str, &str, &HashMap<String, serde_json::Value>)> {
        match self {
            ContentBlock::ToolUse { id, name, input } => Some((id, name, input)),
            _ => None,
        }
    }
}

/// Reason the model stopped generating.
///
/// When `stop_reason` is `ToolUse` the caller must run the requested tools
/// and send results back via `send_tool_results()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    EndTurn,
    /// The model wants to call tools
    ToolUse,
    /// Hit the token limit; response may be truncated
    MaxTokens,
    /// Provider-specific stop reason
    Other(String),
}

/// A structured response from an LLM, supporting both text and tool use.
///
/// # Examples
///
/// ```
/// use atlance_domain::session::response::{ContentBlock, LlmResponse, StopReason};
///
/// let response = LlmResponse::from_text("Here is the story.");
/// assert_eq!(response.text_content(), "Here is the story.");
/// assert!(!response.has_tool_calls());
///
/// let response = LlmResponse {
///     content: vec![ContentBlock::ToolUse {
///         id: "call_7".to_string(),
///         name: "data_extractor".to_string(),
///         input: Default::default(),
///     }],
///     stop_reason: Some(StopReason::ToolUse),
///     model: None,
/// };
/// assert_eq!(response.tool_calls()[0].native_id.as_deref(), Some("call_7"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmResponse {
    /// Content blocks in the response (text and/or tool use)
    pub content: Vec<ContentBlock>,
    /// Why the model stopped generating
    pub stop_reason: Option<StopReason>,
    /// Model identifier, if the provider returned one
    pub model: Option<String>,
}

impl LlmResponse {
    /// Create a text-only response.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: Some(StopReason::EndTurn),
            model: None,
        }
    }

    /// Concatenate all `Text` content blocks into a single string.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| b.as_text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Extract all `ToolUse` blocks as [`ToolCall`]s carrying their call id.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some(ToolCall::from_native(id, name, input.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if the response contains any tool use requests.
    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|b| matches!(b, ContentBlock::ToolUse { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_text_creates_text_only_response() {
        let response = LlmResponse::from_text("Paris at dusk.");
        assert_eq!(response.text_content(), "Paris at dusk.");
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
    }

    #[test]
    fn tool_calls_keep_order_and_ids() {
        let response = LlmResponse {
            content: vec![
                ContentBlock::text("Extracting twice."),
                ContentBlock::ToolUse {
                    id: "call_a".to_string(),
                    name: "data_extractor".to_string(),
                    input: [("indices".to_string(), serde_json::json!([0]))]
                        .into_iter()
                        .collect(),
                },
                ContentBlock::ToolUse {
                    id: "call_b".to_string(),
                    name: "data_extractor".to_string(),
                    input: [("indices".to_string(), serde_json::json!([2]))]
                        .into_iter()
                        .collect(),
                },
            ],
            stop_reason: Some(StopReason::ToolUse),
            model: Some("qwen2.5vl:7b".to_string()),
        };

        let calls = response.tool_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].native_id.as_deref(), Some("call_a"));
        assert_eq!(calls[1].get_indices("indices"), Some(vec![2]));
        assert_eq!(response.text_content(), "Extracting twice.");
    }

    #[test]
    fn content_block_serde_shape() {
        let block = ContentBlock::text("hi");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "text": "hi"}));
    }
}
