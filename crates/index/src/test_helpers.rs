//! Shared test helpers for index tests.

use async_trait::async_trait;
use codewright_core::error::ProviderError;
use codewright_core::retrieval::{Describer, Embedder};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Describes a file by its first line, counting calls.
#[derive(Default)]
pub struct FirstLineDescriber {
    pub calls: AtomicUsize,
}

impl FirstLineDescriber {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Describer for FirstLineDescriber {
    async fn describe(&self, path: &str, content: &str) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let first = content.lines().next().unwrap_or_default();
        Ok(format!("{path}: {first}"))
    }
}

/// Embeds text as keyword hits over a fixed vocabulary, counting calls.
///
/// Each vocabulary word owns one dimension; the last dimension is a constant
/// so no vector is all-zero.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: Vec<&'static str>) -> Self {
        Self {
            vocabulary,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = self
            .vocabulary
            .iter()
            .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
            .collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

/// An embedder whose backend is always down.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::Network("connection refused".into()))
    }
}

/// Returns the same response for every call, whatever the input.
pub struct FixedEmbedder(pub Vec<Vec<f32>>);

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(self.0.clone())
    }
}
