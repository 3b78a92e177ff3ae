//! Linter tool — run the configured linter and explain its findings.
//!
//! The linter runs with the repository root as its working directory and the
//! target path appended after the configured arguments. A non-zero exit code
//! is not a failure: most linters exit non-zero when they report problems.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolSpec};
use codewright_index::backend::truncate_chars;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use crate::context::ToolContext;
use crate::path::resolve_in_repo;

const NAME: &str = "run_linter";
const LINTER_PROMPT: &str = "Use the linter output above to answer the following question in a few sentences. \
    Do not engage in conversation.";
const DEFAULT_QUESTION: &str = "Summarize the most important problems.";

pub struct RunLinterTool {
    ctx: Arc<ToolContext>,
}

impl RunLinterTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for RunLinterTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Run the linter on a file or directory and explain what it reports. Use for questions \
             about code quality, style problems, or likely bugs.",
        )
        .param(ParamSpec::required(
            "path",
            ParamKind::String,
            "Repository-relative file or directory; use . for the whole repository",
        ))
        .param(ParamSpec::optional(
            "question",
            ParamKind::String,
            "What to find out from the linter output",
            "",
        ))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let path = args.str("path")?;
        let question = match args.str("question")?.trim() {
            "" => DEFAULT_QUESTION,
            q => q,
        };

        resolve_in_repo(self.ctx.root(), path, NAME)?;
        let linter = &self.ctx.linter;
        debug!(command = %linter.command, path = %path, "Running linter");

        let output = Command::new(&linter.command)
            .args(&linter.args)
            .arg(linter_target(path))
            .current_dir(self.ctx.root())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ToolError::execution_failed(NAME, format!("failed to run '{}': {e}", linter.command))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let report = format!("{}\n{}", stdout.trim(), stderr.trim());
        let report = report.trim();

        if report.is_empty() {
            return Ok(ToolOutput::text("Linter reported no issues."));
        }

        let body = truncate_chars(report, self.ctx.max_prompt_chars);
        let prompt = format!("### Linter output ###\n{body}\n\n{LINTER_PROMPT}\n\n### Question ###\n{question}");
        let summary = self.ctx.ask(NAME, prompt).await?;

        Ok(ToolOutput {
            output: summary,
            data: Some(serde_json::json!({
                "exit_code": output.status.code(),
                "raw_output": body,
            })),
        })
    }
}

/// The path as handed to the linter; a leading `-` would read as an option.
fn linter_target(path: &str) -> String {
    let path = path.trim();
    if path.starts_with('-') {
        format!("./{path}")
    } else {
        path.to_string()
    }
}
