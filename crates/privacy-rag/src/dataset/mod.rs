//! Dataset source abstraction
//!
//! The pipeline only requires ordered record sequences; where the records come
//! from is a collaborator concern. The shipped realization reads JSON Lines
//! files from configured paths.

use std::path::{Path, PathBuf};

use crate::config::DatasetConfig;
use crate::error::{Error, Result};

/// An opaque raw record: field name to value
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// The two fixed input corpora
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    Personal,
    Vulnerability,
}

/// Provider of raw record sequences, one per corpus
pub trait DatasetSource: Send + Sync {
    /// Fetch all records of a corpus in source order
    fn fetch(&self, corpus: Corpus) -> Result<Vec<RawRecord>>;
}

/// JSON Lines files on disk, one JSON object per line
pub struct JsonlDataset {
    personal_path: PathBuf,
    vulnerability_path: PathBuf,
}

impl JsonlDataset {
    /// Create a dataset source from configured paths
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            personal_path: config.personal_path.clone(),
            vulnerability_path: config.vulnerability_path.clone(),
        }
    }

    fn read_records(path: &Path) -> Result<Vec<RawRecord>> {
        if !path.exists() {
            return Err(Error::missing_input(format!(
                "dataset file not found: {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        let mut records = Vec::new();

        for (line_no, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    // malformed records degrade to all-N/A fields downstream
                    tracing::warn!(
                        "Skipping field data of malformed record at {}:{}: {}",
                        path.display(),
                        line_no + 1,
                        e
                    );
                    records.push(RawRecord::new());
                }
            }
        }

        Ok(records)
    }
}

impl DatasetSource for JsonlDataset {
    fn fetch(&self, corpus: Corpus) -> Result<Vec<RawRecord>> {
        let path = match corpus {
            Corpus::Personal => &self.personal_path,
            Corpus::Vulnerability => &self.vulnerability_path,
        };
        let records = Self::read_records(path)?;
        tracing::info!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }
}
