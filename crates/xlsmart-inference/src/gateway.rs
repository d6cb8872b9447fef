//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use xlsmart_core::{CompletionBackend, Error, Result};

use crate::config::GatewayConfig;
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, GatewayErrorResponse,
};

/// HTTP client for an OpenAI-compatible chat-completions gateway.
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a client from the given configuration.
    ///
    /// Fails if no API key is configured or the HTTP client cannot be built.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.require_api_key()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env())
    }

    fn build_request(&self, system: &str, user: &str, max_tokens: u32) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: Some(self.config.temperature),
            max_completion_tokens: Some(max_tokens),
        }
    }
}

#[async_trait]
impl CompletionBackend for GatewayClient {
    async fn complete(&self, system: &str, user: &str, max_tokens: u32) -> Result<String> {
        let request = self.build_request(system, user, max_tokens);
        let url = format!("{}/chat/completions", self.config.base_url);

        debug!(
            "Requesting completion with model {}, prompt length: {}",
            self.config.model,
            user.len()
        );

        let api_key = self.config.require_api_key()?;
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Gateway request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Prefer the structured error message when the gateway sends one.
            let message = serde_json::from_str::<GatewayErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Gateway returned {}: {}", status, message);
            return Err(Error::Inference(format!(
                "Gateway error ({status}): {message}"
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Invalid gateway response: {e}")))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Inference("Gateway returned no choices".to_string()))?;

        if let Some(usage) = completion.usage {
            debug!(
                "Completion received, response length: {}, tokens: {}+{}",
                choice.message.content.len(),
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }

        Ok(choice.message.content)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
