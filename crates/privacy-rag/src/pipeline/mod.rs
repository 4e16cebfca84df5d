//! Pipeline orchestrator: ingest once, then retrieve, guard, generate

use std::sync::Arc;

use crate::config::{GenerationBackend, RagConfig};
use crate::dataset::{Corpus, DatasetSource, JsonlDataset};
use crate::error::Result;
use crate::guard::PrivacyGuard;
use crate::index::VectorIndex;
use crate::ingestion::{slice_personal, slice_vulnerability, DocumentPreparer};
use crate::providers::{
    EmbeddingProvider, HostedLlm, LlmProvider, OllamaClient, OllamaEmbedder, OllamaLlm,
};

/// Composes preparation, indexing, guarding and generation.
///
/// Engines are explicit owned instances injected at construction; there is no
/// ambient global model state.
pub struct RagPipeline {
    dataset: Box<dyn DatasetSource>,
    index: VectorIndex,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
    max_new_tokens: u32,
}

impl RagPipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        dataset: Box<dyn DatasetSource>,
        index: VectorIndex,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
        max_new_tokens: u32,
    ) -> Self {
        Self {
            dataset,
            index,
            llm,
            top_k,
            max_new_tokens,
        }
    }

    /// Wire up the configured backends: Ollama embeddings plus either an
    /// Ollama or a Hugging Face generation provider.
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(&config.llm));
        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::new(Arc::clone(&client), &config.embeddings));
        let index = VectorIndex::open(&config.vector_db.storage_path, embedder)?;

        let llm: Arc<dyn LlmProvider> = match config.backend {
            GenerationBackend::Local => {
                Arc::new(OllamaLlm::select_model(client, &config.llm).await?)
            }
            GenerationBackend::Hosted => Arc::new(HostedLlm::from_env(&config.hosted)?),
        };
        tracing::info!("Generation backend: {} ({})", llm.name(), llm.model());

        let dataset = Box::new(JsonlDataset::new(&config.dataset));

        Ok(Self::new(
            dataset,
            index,
            llm,
            config.retrieval.top_k,
            config.llm.max_new_tokens,
        ))
    }

    /// Ensure the index is populated. Safe to call repeatedly: a populated
    /// collection skips dataset loading entirely.
    pub async fn initialize(&self) -> Result<()> {
        let existing = self.index.count()?;
        if existing > 0 {
            tracing::info!(
                "Index already populated with {} documents, skipping ingestion",
                existing
            );
            return Ok(());
        }

        let personal = self.dataset.fetch(Corpus::Personal)?;
        let vulnerability = self.dataset.fetch(Corpus::Vulnerability)?;

        let documents = DocumentPreparer::prepare_all(
            slice_personal(&personal),
            slice_vulnerability(&vulnerability),
        );
        tracing::info!(
            "Prepared {} documents ({} personal, {} vulnerability)",
            documents.len(),
            slice_personal(&personal).len(),
            slice_vulnerability(&vulnerability).len()
        );

        self.index.add_documents(&documents).await
    }

    /// Answer one query. Never fails: any stage failure is reported as a
    /// user-facing error string and the process keeps serving.
    pub async fn run_query(&self, query: &str) -> String {
        match self.answer(query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Query failed: {}", e);
                format!("[Error] {}", e)
            }
        }
    }

    /// Retrieve the raw context documents for a query, without generation
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        self.index.query(query, k).await
    }

    /// Configured retrieval depth
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    async fn answer(&self, query: &str) -> Result<String> {
        let documents = self.index.query(query, self.top_k).await?;
        let messages = PrivacyGuard::build_prompt(query, &documents);
        let generated = self.llm.generate(&messages, self.max_new_tokens).await?;
        Ok(PrivacyGuard::post_process(&generated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::dataset::RawRecord;
    use crate::error::Error;
    use crate::guard::PRIVACY_REFUSAL;
    use crate::types::PromptMessage;

    /// Deterministic token-bucket embedder: related texts share buckets
    struct StubEmbedder;

    const STUB_DIMENSIONS: usize = 32;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut vector = vec![0.0f32; STUB_DIMENSIONS];
            for token in text
                .split(|c: char| !c.is_ascii_alphanumeric())
                .filter(|t| !t.is_empty())
            {
                let bucket: usize = token
                    .to_ascii_lowercase()
                    .bytes()
                    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
                    % STUB_DIMENSIONS;
                vector[bucket] += 1.0;
            }
            Ok(vector)
        }

        fn dimensions(&self) -> usize {
            STUB_DIMENSIONS
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    /// In-memory corpora with a fetch counter
    struct MemoryDataset {
        personal: Vec<RawRecord>,
        vulnerability: Vec<RawRecord>,
        fetches: Arc<AtomicUsize>,
    }

    impl MemoryDataset {
        fn sample() -> Self {
            let mut person = RawRecord::new();
            person.insert(
                "persona".to_string(),
                json!("Alicia Gonzalez is a nurse from Austin."),
            );
            person.insert(
                "professional_persona".to_string(),
                json!("Alicia Gonzalez coordinates the night shift."),
            );
            person.insert("occupation".to_string(), json!("Nurse"));

            let mut cve = RawRecord::new();
            cve.insert("CVE-ID".to_string(), json!("CVE-2025-5331"));
            cve.insert("SEVERITY".to_string(), json!("HIGH"));
            cve.insert(
                "DESCRIPTION".to_string(),
                json!("Heap overflow in the TLS handshake parser allows remote code execution."),
            );

            Self {
                personal: vec![person],
                vulnerability: vec![cve],
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl DatasetSource for MemoryDataset {
        fn fetch(&self, corpus: Corpus) -> Result<Vec<RawRecord>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(match corpus {
                Corpus::Personal => self.personal.clone(),
                Corpus::Vulnerability => self.vulnerability.clone(),
            })
        }
    }

    /// A generation engine that follows the system instruction: refuses
    /// person lookups when personal data is in context, answers CVE queries
    /// from the context.
    struct PolicyFollowingLlm;

    #[async_trait]
    impl LlmProvider for PolicyFollowingLlm {
        async fn generate(
            &self,
            messages: &[PromptMessage],
            _max_new_tokens: u32,
        ) -> Result<String> {
            let user = &messages[1].content;
            let (context, query) = user
                .split_once("\n\nUSER REQUEST:\n")
                .unwrap_or(("", user.as_str()));

            if query.to_lowercase().contains("cve") {
                let description = context
                    .lines()
                    .find_map(|line| line.strip_prefix("Description: "))
                    .unwrap_or("No technical details available.");
                return Ok(format!("According to the advisory: {}", description));
            }

            if context.contains("PERSONAL DATA RECORD") {
                return Ok(PRIVACY_REFUSAL.to_string());
            }

            Ok("I have no relevant information.".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "policy-stub"
        }

        fn model(&self) -> &str {
            "policy-stub"
        }
    }

    /// A generation engine that always fails at the transport layer
    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn generate(
            &self,
            _messages: &[PromptMessage],
            _max_new_tokens: u32,
        ) -> Result<String> {
            Err(Error::generation("connection refused"))
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "failing-stub"
        }

        fn model(&self) -> &str {
            "failing-stub"
        }
    }

    fn pipeline_with(
        dir: &std::path::Path,
        dataset: Box<dyn DatasetSource>,
        llm: Arc<dyn LlmProvider>,
    ) -> RagPipeline {
        let index = VectorIndex::open(dir.join("index.db"), Arc::new(StubEmbedder)).unwrap();
        RagPipeline::new(dataset, index, llm, 3, 512)
    }

    #[tokio::test]
    async fn initialize_ingests_once_per_collection() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Box::new(MemoryDataset::sample());
        let fetches = Arc::clone(&dataset.fetches);
        let pipeline = pipeline_with(dir.path(), dataset, Arc::new(PolicyFollowingLlm));

        pipeline.initialize().await.unwrap();
        pipeline.initialize().await.unwrap();

        // one fetch per corpus; the second initialize skipped dataset loading
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn person_lookup_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            dir.path(),
            Box::new(MemoryDataset::sample()),
            Arc::new(PolicyFollowingLlm),
        );
        pipeline.initialize().await.unwrap();

        let answer = pipeline.run_query("Who is Alicia Gonzalez?").await;
        assert!(answer.contains(PRIVACY_REFUSAL));
    }

    #[tokio::test]
    async fn technical_query_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            dir.path(),
            Box::new(MemoryDataset::sample()),
            Arc::new(PolicyFollowingLlm),
        );
        pipeline.initialize().await.unwrap();

        let answer = pipeline.run_query("What is CVE-2025-5331").await;
        assert!(answer.contains("Heap overflow in the TLS handshake parser"));
        assert!(!answer.contains(PRIVACY_REFUSAL));
    }

    #[tokio::test]
    async fn generation_failure_becomes_an_error_string() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            dir.path(),
            Box::new(MemoryDataset::sample()),
            Arc::new(FailingLlm),
        );
        pipeline.initialize().await.unwrap();

        let answer = pipeline.run_query("Who is Alicia Gonzalez?").await;
        assert!(answer.starts_with("[Error]"));
        assert!(answer.contains("connection refused"));
    }

    #[tokio::test]
    async fn retrieve_only_surfaces_context() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(
            dir.path(),
            Box::new(MemoryDataset::sample()),
            Arc::new(PolicyFollowingLlm),
        );
        pipeline.initialize().await.unwrap();

        let documents = pipeline.retrieve("CVE-2025-5331", 2).await.unwrap();
        assert_eq!(documents.len(), 2);
        assert!(documents[0].contains("CVE-2025-5331"));
    }
}
