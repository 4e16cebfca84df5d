//! Normalized documents stored in the vector index

use serde::{Deserialize, Serialize};

/// Which corpus a document came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Identity, demographic and biographical profile records
    Personal,
    /// Public security-advisory records
    Vulnerability,
}

impl SourceKind {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Vulnerability => "vulnerability",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            "vulnerability" => Some(Self::Vulnerability),
            _ => None,
        }
    }
}

/// Sensitivity classification of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// Personally identifiable information
    Pii,
    /// Public technical security data
    Security,
}

impl Sensitivity {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pii => "pii",
            Self::Security => "security",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pii" => Some(Self::Pii),
            "security" => Some(Self::Security),
            _ => None,
        }
    }
}

/// Metadata attached to every indexed document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Source corpus
    pub source: SourceKind,
    /// Sensitivity classification
    pub sensitivity: Sensitivity,
    /// Identifier carried over from the raw record, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<String>,
}

/// The unit stored in the index: a stable id, the rendered text, and metadata
///
/// Ids are derived from source type and ordinal position (`pii_<i>`,
/// `cve_<i>`), which is what makes ingestion idempotence checks meaningful.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique, deterministic id
    pub id: String,
    /// Fixed-order rendering of the raw record's fields
    pub text: String,
    /// Source and sensitivity metadata
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a personal-profile document at ordinal position `i`
    pub fn personal(i: usize, text: String, origin_id: Option<String>) -> Self {
        Self {
            id: format!("pii_{}", i),
            text,
            metadata: DocumentMetadata {
                source: SourceKind::Personal,
                sensitivity: Sensitivity::Pii,
                origin_id,
            },
        }
    }

    /// Create a vulnerability document at ordinal position `i`
    pub fn vulnerability(i: usize, text: String, origin_id: Option<String>) -> Self {
        Self {
            id: format!("cve_{}", i),
            text,
            metadata: DocumentMetadata {
                source: SourceKind::Vulnerability,
                sensitivity: Sensitivity::Security,
                origin_id,
            },
        }
    }
}
