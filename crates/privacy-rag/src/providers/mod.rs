//! Provider abstractions for embeddings and answer generation
//!
//! Trait-based seams so the pipeline can switch between the local (Ollama)
//! and hosted (Hugging Face Inference) backends, and so tests can inject
//! deterministic stubs.

pub mod embedding;
pub mod hosted;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use hosted::HostedLlm;
pub use llm::LlmProvider;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
