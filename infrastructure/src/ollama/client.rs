//! HTTP client for the Ollama REST API

use super::error::{OllamaError, Result};
use super::types::{ChatRequest, ChatResponse, TagsResponse};
use std::time::Duration;
use tracing::debug;

/// Thin async wrapper over `/api/chat` and `/api/tags`.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
    keep_alive: Option<String>,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OllamaError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
            keep_alive: None,
        })
    }

    pub fn with_keep_alive(mut self, keep_alive: Option<String>) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn keep_alive(&self) -> Option<&str> {
        self.keep_alive.as_deref()
    }

    fn request_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            OllamaError::Timeout(self.timeout_secs)
        } else {
            OllamaError::Http(e.to_string())
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OllamaError::Api {
            status: status.as_u16(),
            body,
        })
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            structured = request.format.is_some(),
            "Calling Ollama chat"
        );

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))
    }

    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let tags: TagsResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
