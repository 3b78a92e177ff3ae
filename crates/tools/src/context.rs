//! Shared collaborators handed to every built-in tool.

use codewright_config::LinterConfig;
use codewright_core::error::ToolError;
use codewright_core::provider::{Provider, ProviderRequest};
use codewright_index::RetrievalIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ToolContext {
    /// Canonical repository root
    pub repo_root: PathBuf,
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub index: Option<Arc<RetrievalIndex>>,
    pub linter: LinterConfig,
    /// Upper bound on file text placed in a single prompt
    pub max_prompt_chars: usize,
}

impl ToolContext {
    pub fn new(repo_root: impl Into<PathBuf>, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let repo_root = repo_root.into();
        let repo_root = repo_root.canonicalize().unwrap_or(repo_root);
        Self {
            repo_root,
            provider,
            model: model.into(),
            index: None,
            linter: LinterConfig::default(),
            max_prompt_chars: 12_000,
        }
    }

    pub fn with_index(mut self, index: Arc<RetrievalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_linter(mut self, linter: LinterConfig) -> Self {
        self.linter = linter;
        self
    }

    pub fn with_max_prompt_chars(mut self, max: usize) -> Self {
        self.max_prompt_chars = max;
        self
    }

    pub fn root(&self) -> &Path {
        &self.repo_root
    }

    /// The retrieval index, or an explanatory failure for `tool_name`.
    pub fn require_index(&self, tool_name: &str) -> Result<&Arc<RetrievalIndex>, ToolError> {
        self.index.as_ref().ok_or_else(|| {
            ToolError::execution_failed(
                tool_name,
                "no retrieval index is loaded; run `codewright index build` first",
            )
        })
    }

    /// One-shot generation call on behalf of `tool_name`.
    pub async fn ask(&self, tool_name: &str, prompt: String) -> Result<String, ToolError> {
        let response = self
            .provider
            .complete(ProviderRequest::prompt(&self.model, prompt))
            .await
            .map_err(|e| ToolError::execution_failed(tool_name, format!("language model error: {e}")))?;
        Ok(response.message.content.trim().to_string())
    }
}
