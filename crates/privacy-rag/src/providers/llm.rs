//! Generation provider trait

use async_trait::async_trait;

use crate::error::Result;
use crate::types::PromptMessage;

/// Trait for turning a structured message sequence into an answer string
///
/// Implementations return only the newly generated continuation; the caller
/// never sees the prompt text back. Transport and runtime failures surface as
/// `Error::Generation`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer for the given messages
    async fn generate(&self, messages: &[PromptMessage], max_new_tokens: u32) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// The model being used
    fn model(&self) -> &str;
}
