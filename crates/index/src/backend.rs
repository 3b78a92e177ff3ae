//! Model-backed describer and embedder.

use async_trait::async_trait;
use codewright_core::error::ProviderError;
use codewright_core::provider::{EmbeddingRequest, Provider, ProviderRequest};
use codewright_core::retrieval::{Describer, Embedder};
use std::sync::Arc;

const SUMMARIZE_FILE_PROMPT: &str = "Your task is to generate a concise summary of the file above and \
describe what the file is for. Keep your summary to 5 sentences or less. Mention important \
functions, types, and dependencies where relevant.";

/// Asks the chat model for a short summary of each file.
pub struct ModelDescriber {
    provider: Arc<dyn Provider>,
    model: String,
    max_chars: usize,
}

impl ModelDescriber {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, max_chars: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            max_chars,
        }
    }
}

/// The first `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Describer for ModelDescriber {
    async fn describe(&self, path: &str, content: &str) -> Result<String, ProviderError> {
        let body = truncate_chars(content, self.max_chars);
        let prompt = format!("### File: {path} ###\n{body}\n\n{SUMMARIZE_FILE_PROMPT}");
        let response = self
            .provider
            .complete(ProviderRequest::prompt(&self.model, prompt))
            .await?;
        Ok(response.message.content.trim().to_string())
    }
}

/// Embeds text through the provider's embeddings endpoint.
pub struct ModelEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ModelEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Embedder for ModelEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts,
            })
            .await?;
        Ok(response.embeddings)
    }
}
