//! Ollama-backed local realization of the embedding and generation providers

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::types::PromptMessage;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Token budget for the rendered prompt. Prompts over the budget are
/// right-truncated, keeping the most recent content.
const PROMPT_TOKEN_BUDGET: usize = 4000;

/// Coarse chars-per-token heuristic used for the budget check
const CHARS_PER_TOKEN: usize = 4;

/// Ollama API client shared by the embedder and the LLM provider
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    repeat_penalty: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new client against the configured base URL
    pub fn new(config: &LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    /// Check if the server is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Names of the models installed on the server
    pub async fn installed_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let tags: TagsResponse = response.json().await?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Generate an embedding for one text
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let request = EmbedRequest {
            model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::embedding(format!(
                "embedding failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("failed to parse embedding response: {}", e)))?;

        Ok(embed_response.embedding)
    }

    /// Run one chat turn, returning only the assistant continuation
    async fn chat(
        &self,
        model: &str,
        messages: &[PromptMessage],
        options: ChatOptions,
    ) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model,
            messages,
            stream: false,
            options,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "chat failed: HTTP {} - {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("failed to parse chat response: {}", e)))?;

        Ok(chat_response.message.content)
    }
}

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create an embedder sharing an existing client
    pub fn new(client: Arc<OllamaClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // no native batch endpoint; calls are sequential
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.client.embed(&self.model, text).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama generation provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
    temperature: f32,
    repeat_penalty: f32,
}

impl OllamaLlm {
    /// Probe the server's installed models and select the first configured
    /// candidate that is present. No candidate installed is a load failure.
    pub async fn select_model(client: Arc<OllamaClient>, config: &LlmConfig) -> Result<Self> {
        let installed = client
            .installed_models()
            .await
            .map_err(|e| Error::ModelLoad(format!("cannot list models: {}", e)))?;

        match choose_model(&config.generate_models, &installed) {
            Some(model) => {
                tracing::info!("Using generation model: {}", model);
                Ok(Self {
                    client,
                    model: model.to_string(),
                    temperature: config.temperature,
                    repeat_penalty: config.repeat_penalty,
                })
            }
            None => Err(Error::ModelLoad(format!(
                "none of the configured models {:?} are installed (found: {:?})",
                config.generate_models, installed
            ))),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, messages: &[PromptMessage], max_new_tokens: u32) -> Result<String> {
        let bounded = bound_prompt(messages);
        self.client
            .chat(
                &self.model,
                &bounded,
                ChatOptions {
                    temperature: self.temperature,
                    repeat_penalty: self.repeat_penalty,
                    num_predict: max_new_tokens,
                },
            )
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// First candidate that matches an installed model, by exact name or by
/// untagged prefix ("phi3" matches "phi3:latest").
fn choose_model<'a>(candidates: &'a [String], installed: &[String]) -> Option<&'a str> {
    candidates
        .iter()
        .find(|candidate| {
            installed.iter().any(|model| {
                model == *candidate || model.starts_with(&format!("{}:", candidate))
            })
        })
        .map(String::as_str)
}

/// Enforce the prompt token budget by trimming the oldest content first, so
/// the tail of the conversation (context end and the user request) survives.
fn bound_prompt(messages: &[PromptMessage]) -> Vec<PromptMessage> {
    let budget_chars = PROMPT_TOKEN_BUDGET * CHARS_PER_TOKEN;
    let total: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    if total <= budget_chars {
        return messages.to_vec();
    }

    tracing::warn!(
        "Prompt of ~{} tokens exceeds the {} token budget, right-truncating",
        total / CHARS_PER_TOKEN,
        PROMPT_TOKEN_BUDGET
    );

    let mut overflow = total - budget_chars;
    let mut bounded = messages.to_vec();
    for message in bounded.iter_mut() {
        if overflow == 0 {
            break;
        }
        let len = message.content.chars().count();
        let cut = overflow.min(len);
        message.content = message.content.chars().skip(cut).collect();
        overflow -= cut;
    }
    bounded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_model_prefers_earlier_candidates() {
        let candidates = vec!["llama3.2:3b".to_string(), "phi3".to_string()];
        let installed = vec!["phi3:latest".to_string(), "llama3.2:3b".to_string()];
        assert_eq!(choose_model(&candidates, &installed), Some("llama3.2:3b"));
    }

    #[test]
    fn choose_model_matches_untagged_prefix() {
        let candidates = vec!["phi3".to_string()];
        let installed = vec!["phi3:latest".to_string()];
        assert_eq!(choose_model(&candidates, &installed), Some("phi3"));

        // "phi3" must not match "phi3.5-mini:latest"
        let installed = vec!["phi3.5-mini:latest".to_string()];
        assert_eq!(choose_model(&candidates, &installed), None);
    }

    #[test]
    fn choose_model_none_when_nothing_installed() {
        let candidates = vec!["llama3.2:3b".to_string()];
        assert_eq!(choose_model(&candidates, &[]), None);
    }

    #[test]
    fn short_prompts_pass_through_unchanged() {
        let messages = vec![
            PromptMessage::system("rules"),
            PromptMessage::user("question"),
        ];
        let bounded = bound_prompt(&messages);
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[0].content, "rules");
        assert_eq!(bounded[1].content, "question");
    }

    #[test]
    fn oversized_prompts_keep_the_most_recent_content() {
        let budget_chars = PROMPT_TOKEN_BUDGET * CHARS_PER_TOKEN;
        let filler = "x".repeat(budget_chars);
        let messages = vec![
            PromptMessage::system(filler),
            PromptMessage::user("CONTEXT\n\nUSER REQUEST:\nWho is on call?"),
        ];

        let bounded = bound_prompt(&messages);
        let total: usize = bounded.iter().map(|m| m.content.chars().count()).sum();
        assert!(total <= budget_chars);
        // the user request at the tail is intact
        assert!(bounded[1].content.ends_with("Who is on call?"));
    }
}
