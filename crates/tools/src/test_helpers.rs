//! Shared test helpers for tool tests.

use async_trait::async_trait;
use codewright_core::error::ProviderError;
use codewright_core::message::Message;
use codewright_core::provider::{Provider, ProviderRequest, ProviderResponse};
use codewright_core::retrieval::{Describer, Embedder};
use codewright_index::{RetrievalIndex, WalkOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::context::ToolContext;

/// Replies with a fixed answer and records every prompt it was sent.
pub struct RecordingProvider {
    reply: String,
    pub prompts: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    fn name(&self) -> &str {
        "recording"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let prompt = request.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt);
        Ok(ProviderResponse {
            message: Message::assistant(self.reply.clone()),
            usage: None,
            model: request.model,
        })
    }
}

pub struct FirstLineDescriber;

#[async_trait]
impl Describer for FirstLineDescriber {
    async fn describe(&self, _path: &str, content: &str) -> Result<String, ProviderError> {
        Ok(content.lines().next().unwrap_or_default().to_string())
    }
}

/// One dimension per vocabulary word plus a constant.
pub struct KeywordEmbedder(pub Vec<&'static str>);

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                let mut v: Vec<f32> = self
                    .0
                    .iter()
                    .map(|w| if lower.contains(w) { 1.0 } else { 0.0 })
                    .collect();
                v.push(0.1);
                v
            })
            .collect())
    }
}

/// An embedder that fails only for queries, after the index is built.
pub struct QueryFailingEmbedder;

#[async_trait]
impl Embedder for QueryFailingEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.iter().any(|t| t.contains('?')) {
            return Err(ProviderError::Timeout("embedding endpoint".into()));
        }
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

/// A small repository with a parser and a network module.
pub fn sample_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(
        root.join("src/parser.py"),
        "# parse tokens into an AST\n\ndef parse(src):\n    if not src:\n        return None\n    for tok in src:\n        if tok == '(':\n            pass\n    return src\n\ndef helper():\n    return 1\n",
    )
    .unwrap();
    std::fs::write(
        root.join("src/network.py"),
        "# open network sockets\ndef connect(host):\n    return host\n",
    )
    .unwrap();
    dir
}

pub async fn built_index(root: &Path, cache: &Path, embedder: Arc<dyn Embedder>) -> Arc<RetrievalIndex> {
    let index = RetrievalIndex::open(
        root,
        cache,
        WalkOptions::default(),
        Arc::new(FirstLineDescriber),
        embedder,
    )
    .unwrap();
    index.build().await.unwrap();
    Arc::new(index)
}

pub fn context(root: &Path, provider: Arc<RecordingProvider>) -> ToolContext {
    ToolContext::new(root, provider, "test-model")
}
