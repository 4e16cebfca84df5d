//! Hosted realization: Hugging Face Inference chat completions

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::HostedConfig;
use crate::error::{Error, Result};
use crate::types::PromptMessage;

use super::llm::LlmProvider;

/// Environment variable holding the API token
pub const TOKEN_ENV: &str = "HF_TOKEN";

/// Fixed sampling seed for reproducible hosted responses
const SAMPLING_SEED: u64 = 42;

/// Hugging Face Inference generation provider
pub struct HostedLlm {
    client: Client,
    endpoint: String,
    model: String,
    token: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    max_tokens: u32,
    temperature: f32,
    seed: u64,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: String,
}

impl HostedLlm {
    /// Create a provider with the token resolved from the environment.
    /// A missing token is fatal at startup, not a degraded mode.
    pub fn from_env(config: &HostedConfig) -> Result<Self> {
        let token = resolve_token(TOKEN_ENV)?;
        Ok(Self::new(config, token))
    }

    /// Create a provider with an explicit token
    pub fn new(config: &HostedConfig, token: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            token,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl LlmProvider for HostedLlm {
    async fn generate(&self, messages: &[PromptMessage], max_new_tokens: u32) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: max_new_tokens,
            temperature: self.temperature,
            seed: SAMPLING_SEED,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.token.trim())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("chat completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "chat completion failed: HTTP {} - {}",
                status, body
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|e| {
            Error::generation(format!("failed to parse chat completion response: {}", e))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::generation("chat completion returned no choices"))
    }

    async fn health_check(&self) -> Result<bool> {
        // no cheap unauthenticated probe; the first generate call reports failures
        Ok(true)
    }

    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Resolve the API token from the named environment variable
fn resolve_token(var: &str) -> Result<String> {
    std::env::var(var).map_err(|_| {
        Error::Credential(format!(
            "{} is not set; a Hugging Face API token is required for the hosted backend",
            var
        ))
    })
}
