//! Retrieval types — the per-file description store and its collaborators.
//!
//! The index itself lives in `codewright-index`; this module only defines the
//! entry shape and the two model-facing seams it depends on, so tools and
//! tests can be written against them without pulling in the index crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;

/// A cached description and embedding for one repository file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalEntry {
    /// Repository-relative, `/`-separated
    pub path: String,

    /// Embedding of `description`
    pub embedding: Vec<f32>,

    /// Natural-language summary of the file
    pub description: String,

    /// Hex SHA-256 of the file bytes the description was made from
    pub content_hash: String,

    pub updated_at: DateTime<Utc>,
}

/// A query hit with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: RetrievalEntry,
    pub score: f32,
}

/// Produces a natural-language description of a file.
#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, path: &str, content: &str) -> Result<String, ProviderError>;
}

/// Turns texts into embedding vectors, one per input.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError>;
}
