//! privacy-rag: retrieval-augmented question answering over a mixed knowledge
//! base of sensitive personal profiles and public CVE security records.
//!
//! The pipeline prepares both corpora into deterministic documents, stores them
//! in a persistent vector index with idempotent bulk ingestion, and answers
//! queries through a privacy-guarded prompt handed to a local (Ollama) or
//! hosted (Hugging Face Inference) generation backend.

pub mod config;
pub mod dataset;
pub mod error;
pub mod guard;
pub mod index;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use guard::PrivacyGuard;
pub use index::VectorIndex;
pub use ingestion::DocumentPreparer;
pub use pipeline::RagPipeline;
pub use types::{Document, DocumentMetadata, PromptMessage, Role, Sensitivity, SourceKind};
