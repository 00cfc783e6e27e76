//! Ollama LLM Gateway implementation

use super::client::OllamaClient;
use super::error::OllamaError;
use super::session::OllamaSession;
use async_trait::async_trait;
use atlance_application::{GatewayError, LlmGateway, LlmSession};
use atlance_domain::Model;
use std::sync::Arc;
use tracing::info;

/// LLM Gateway backed by a local or remote Ollama server
pub struct OllamaGateway {
    client: Arc<OllamaClient>,
}

impl OllamaGateway {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, OllamaError> {
        let client = OllamaClient::new(base_url, timeout_secs)?;
        info!("OllamaGateway initialized for {}", client.base_url());
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: OllamaClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<OllamaClient> {
        &self.client
    }
}

#[async_trait]
impl LlmGateway for OllamaGateway {
    async fn create_session_with_system_prompt(
        &self,
        model: &Model,
        system_prompt: &str,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        Ok(Box::new(OllamaSession::new(
            Arc::clone(&self.client),
            model.clone(),
            system_prompt,
        )))
    }

    async fn available_models(&self) -> Result<Vec<Model>, GatewayError> {
        let names = self.client.list_models().await?;
        Ok(names
            .into_iter()
            .map(|name| {
                let Ok(model) = name.parse::<Model>();
                model
            })
            .collect())
    }
}
