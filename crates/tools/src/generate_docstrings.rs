//! Docstring generation tool.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolSpec};
use codewright_index::backend::truncate_chars;
use std::sync::Arc;

use crate::context::ToolContext;
use crate::path::resolve_file;

const NAME: &str = "generate_docstrings";
const DOCSTRING_PROMPT: &str = "Write a docstring for each requested function or class above. \
    For each one, the first line of your output is the definition line exactly as written, \
    and the docstring goes below it. Do not engage in conversation.";

pub struct GenerateDocstringsTool {
    ctx: Arc<ToolContext>,
}

impl GenerateDocstringsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GenerateDocstringsTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Generate docstrings for the functions and classes in a file, or for one named symbol.",
        )
        .param(ParamSpec::required("path", ParamKind::String, "Repository-relative file path"))
        .param(ParamSpec::optional(
            "symbol",
            ParamKind::String,
            "Name of a single function or class; empty means all of them",
            "",
        ))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let path = args.str("path")?;
        let symbol = args.str("symbol")?.trim();

        let resolved = resolve_file(self.ctx.root(), path, NAME)?;
        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::execution_failed(NAME, format!("failed to read '{path}': {e}")))?;

        if !symbol.is_empty() && !content.contains(symbol) {
            return Err(ToolError::execution_failed(
                NAME,
                format!("symbol '{symbol}' does not appear in {path}"),
            ));
        }

        let body = truncate_chars(&content, self.ctx.max_prompt_chars);
        let target = if symbol.is_empty() {
            "every function and class".to_string()
        } else {
            format!("only `{symbol}`")
        };
        let prompt = format!(
            "### File: {path} ###\n{body}\n\nDocument {target}.\n{DOCSTRING_PROMPT}"
        );

        let docstrings = self.ctx.ask(NAME, prompt).await?;
        Ok(ToolOutput::text(docstrings))
    }
}
