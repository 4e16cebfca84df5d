//! Configuration for the RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Generation backend (local or hosted)
    #[serde(default)]
    pub backend: GenerationBackend,
    /// Source corpora locations
    #[serde(default)]
    pub dataset: DatasetConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Local LLM (Ollama) configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Hosted inference configuration
    #[serde(default)]
    pub hosted: HostedConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file, or use defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("cannot read config {}: {}", path.display(), e))
                })?;
                toml::from_str(&raw).map_err(|e| {
                    Error::Config(format!("invalid config {}: {}", path.display(), e))
                })
            }
            None => Ok(Self::default()),
        }
    }
}

/// Generation backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    /// Local Ollama server
    #[default]
    Local,
    /// Hugging Face Inference API
    Hosted,
}

/// Source corpora locations (JSON Lines, one record per line)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Personal-profile corpus
    pub personal_path: PathBuf,
    /// Security-vulnerability corpus
    pub vulnerability_path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            personal_path: PathBuf::from("./data/personas.jsonl"),
            vulnerability_path: PathBuf::from("./data/cve_records.jsonl"),
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding model served by Ollama
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// Local LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model candidates, probed in order; first installed wins
    pub generate_models: Vec<String>,
    /// Sampling temperature
    pub temperature: f32,
    /// Repetition penalty to reduce degenerate loops
    pub repeat_penalty: f32,
    /// Maximum tokens generated per answer
    pub max_new_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_models: vec![
                "llama3.2:3b".to_string(),
                "phi3".to_string(),
                "llama3.2:1b".to_string(),
            ],
            temperature: 0.7,
            repeat_penalty: 1.1,
            max_new_tokens: 512,
            timeout_secs: 120,
        }
    }
}

/// Hosted inference (Hugging Face) configuration
///
/// The API token is not part of the config file; it is resolved from the
/// `HF_TOKEN` environment variable at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedConfig {
    /// Chat-completions endpoint
    pub endpoint: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://router.huggingface.co/v1/chat/completions".to_string(),
            model: "meta-llama/Meta-Llama-3-8B-Instruct".to_string(),
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// Storage path for the index collection; reused across runs
    pub storage_path: PathBuf,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        let storage_path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("privacy-rag")
            .join("index.db");

        Self { storage_path }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Number of documents retrieved per query
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}
