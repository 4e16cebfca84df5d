//! Deterministic rendering of raw records into index documents
//!
//! Rendering is total: a missing, null or empty field becomes the literal
//! `N/A`, never an error. Field order is fixed so re-running preparation on
//! identical input yields byte-identical text.

use serde_json::Value;

use crate::dataset::RawRecord;
use crate::types::Document;

const MISSING: &str = "N/A";

/// Normalizes raw records from both corpora into uniform documents
pub struct DocumentPreparer;

impl DocumentPreparer {
    /// Prepare all documents: personal records first, vulnerability records
    /// after, each numbered by its position within its corpus slice.
    pub fn prepare_all(personal: &[RawRecord], vulnerability: &[RawRecord]) -> Vec<Document> {
        let mut documents = Vec::with_capacity(personal.len() + vulnerability.len());

        for (i, record) in personal.iter().enumerate() {
            documents.push(Self::prepare_personal(i, record));
        }
        for (i, record) in vulnerability.iter().enumerate() {
            documents.push(Self::prepare_vulnerability(i, record));
        }

        documents
    }

    /// Render one personal-profile record
    pub fn prepare_personal(i: usize, record: &RawRecord) -> Document {
        let text = format!(
            "PERSONAL DATA RECORD:\n\
             Name: {}\n\
             Age: {}\n\
             Sex: {}\n\
             Marital Status: {}\n\
             Education: {}\n\
             Occupation: {}\n\
             City: {}\n\
             State: {}\n\
             Persona: {}",
            derive_identity(record),
            field(record, "age"),
            field(record, "sex"),
            field(record, "marital_status"),
            field(record, "education_level"),
            field(record, "occupation"),
            field(record, "city"),
            field(record, "state"),
            field(record, "professional_persona"),
        );

        Document::personal(i, text, optional_field(record, "uuid"))
    }

    /// Render one security-advisory record
    pub fn prepare_vulnerability(i: usize, record: &RawRecord) -> Document {
        let text = format!(
            "CVE SECURITY RECORD:\n\
             ID: {}\n\
             CWE: {}\n\
             CVSS v2: {}\n\
             CVSS v3: {}\n\
             CVSS v4: {}\n\
             Severity: {}\n\
             Description: {}",
            field(record, "CVE-ID"),
            field(record, "CWE-ID"),
            field(record, "CVSS-V2"),
            field(record, "CVSS-V3"),
            field(record, "CVSS-V4"),
            field(record, "SEVERITY"),
            field(record, "DESCRIPTION"),
        );

        Document::vulnerability(i, text, optional_field(record, "CVE-ID"))
    }
}

/// Render a field as display text, `N/A` when absent, null or blank
fn field(record: &RawRecord, key: &str) -> String {
    match record.get(key) {
        None | Some(Value::Null) => MISSING.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => MISSING.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// A field value when present and non-blank
fn optional_field(record: &RawRecord, key: &str) -> Option<String> {
    match field(record, key).as_str() {
        MISSING => None,
        value => Some(value.to_string()),
    }
}

/// Best-effort name extraction from the persona lead-in ("<Name> is a ...").
/// The split is a heuristic; anything that does not look like a short name
/// falls back to `N/A`.
fn derive_identity(record: &RawRecord) -> String {
    let persona = match record.get("persona").and_then(Value::as_str) {
        Some(p) => p,
        None => return MISSING.to_string(),
    };

    match persona.split_once(" is ") {
        Some((lead, _)) => {
            let lead = lead.trim();
            if !lead.is_empty() && lead.split_whitespace().count() <= 4 {
                lead.to_string()
            } else {
                MISSING.to_string()
            }
        }
        None => MISSING.to_string(),
    }
}
