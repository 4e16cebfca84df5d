//! Core types shared across the pipeline

pub mod document;
pub mod message;

pub use document::{Document, DocumentMetadata, Sensitivity, SourceKind};
pub use message::{PromptMessage, Role};
