//! Persistent vector index with idempotent bulk ingestion
//!
//! Documents and their embeddings live in a single SQLite table keyed by
//! document id. The collection is write-once: one guarded bulk insert
//! populates it, queries read it, nothing updates or deletes rows.

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Document;

/// Persistent collection of (document, embedding) pairs with k-NN retrieval
pub struct VectorIndex {
    conn: Arc<Mutex<Connection>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorIndex {
    /// Create or open the index at the given storage path
    pub fn open<P: AsRef<Path>>(path: P, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let index = Self {
            conn: Arc::new(Mutex::new(conn)),
            embedder,
        };
        index.migrate()?;
        Ok(index)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;

            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                source TEXT NOT NULL,
                sensitivity TEXT NOT NULL,
                origin_id TEXT,
                embedding BLOB NOT NULL,
                ingested_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Number of stored documents
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Embed and store all documents in one atomic bulk insert.
    ///
    /// Whole-collection idempotence guard: a non-empty collection makes this
    /// a logged no-op, never a per-document top-up. Partial prior ingestion
    /// plus a retry stays partial; only a fully empty collection ingests.
    pub async fn add_documents(&self, documents: &[Document]) -> Result<()> {
        let existing = self.count()?;
        if existing > 0 {
            tracing::info!(
                "Collection already contains {} documents, skipping ingestion",
                existing
            );
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
        tracing::info!("Embedding and storing {} documents", documents.len());
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != documents.len() {
            return Err(Error::embedding(format!(
                "embedding batch returned {} vectors for {} documents",
                embeddings.len(),
                documents.len()
            )));
        }

        let ingested_at = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (document, embedding) in documents.iter().zip(&embeddings) {
            tx.execute(
                "INSERT INTO documents (id, text, source, sensitivity, origin_id, embedding, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    document.id,
                    document.text,
                    document.metadata.source.as_str(),
                    document.metadata.sensitivity.as_str(),
                    document.metadata.origin_id,
                    vector_to_blob(embedding),
                    ingested_at,
                ],
            )?;
        }
        tx.commit()?;

        tracing::info!("Ingestion complete: {} documents stored", documents.len());
        Ok(())
    }

    /// Nearest-neighbor retrieval: texts of the `k` most similar documents,
    /// ordered most to least similar. An empty collection yields an empty
    /// sequence; fewer than `k` documents yield all of them.
    pub async fn query(&self, query_text: &str, k: usize) -> Result<Vec<String>> {
        if self.count()? == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embedder
            .embed_batch(&[query_text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::embedding("embedding batch returned no vector"))?;

        let rows: Vec<(String, Vec<f32>)> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare("SELECT text, embedding FROM documents")?;
            let mapped = stmt.query_map([], |row| {
                let text: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((text, blob))
            })?;

            let mut rows = Vec::new();
            for row in mapped {
                let (text, blob) = row?;
                rows.push((text, blob_to_vector(&blob)));
            }
            rows
        };

        let mut scored: Vec<(String, f32)> = rows
            .into_iter()
            .map(|(text, embedding)| {
                let similarity = cosine_similarity(&query_vector, &embedding);
                (text, similarity)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored.into_iter().take(k).map(|(text, _)| text).collect())
    }
}

fn vector_to_blob(vector: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

fn blob_to_vector(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
