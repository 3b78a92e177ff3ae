//! Read file tool — return numbered lines of a repository file.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolSpec};
use std::sync::Arc;

use crate::context::ToolContext;
use crate::path::resolve_file;

const NAME: &str = "read_file";
const MAX_LINES: usize = 400;

pub struct ReadFileTool {
    ctx: Arc<ToolContext>,
}

impl ReadFileTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Read lines of a file in the repository. Use when the question names a specific file \
             or you need to see exact code.",
        )
        .param(ParamSpec::required("path", ParamKind::String, "Repository-relative file path"))
        .param(ParamSpec::optional("start_line", ParamKind::Integer, "First line to read (1-based)", 1))
        .param(ParamSpec::optional(
            "end_line",
            ParamKind::Integer,
            "Last line to read, inclusive; 0 reads to the end of the file",
            0,
        ))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let path = args.str("path")?;
        let start = args.int("start_line")?;
        let end = args.int("end_line")?;

        if start < 1 {
            return Err(ToolError::invalid_arguments("start_line must be at least 1"));
        }
        if end != 0 && end < start {
            return Err(ToolError::invalid_arguments(
                "end_line must be 0 or not less than start_line",
            ));
        }

        let resolved = resolve_file(self.ctx.root(), path, NAME)?;
        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::execution_failed(NAME, format!("failed to read '{path}': {e}")))?;

        let lines: Vec<&str> = content.lines().collect();
        let total = lines.len();
        let start = start as usize;
        if start > total {
            return Ok(ToolOutput::text(format!(
                "{path} has only {total} lines; nothing to show from line {start}."
            )));
        }

        let last = if end == 0 { total } else { (end as usize).min(total) };
        let shown_last = last.min(start + MAX_LINES - 1);

        let mut output = format!("{path} (lines {start}-{shown_last} of {total})\n");
        for (i, line) in lines[start - 1..shown_last].iter().enumerate() {
            output.push_str(&format!("{:>5} | {line}\n", start + i));
        }
        if shown_last < last {
            output.push_str(&format!(
                "... truncated; request start_line={} to continue\n",
                shown_last + 1
            ));
        }

        Ok(ToolOutput::text(output.trim_end()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn tool(root: &std::path::Path) -> ReadFileTool {
        ReadFileTool::new(Arc::new(context(root, RecordingProvider::new("unused"))))
    }

    #[tokio::test]
    async fn reads_numbered_range() {
        let repo = sample_repo();
        let tool = tool(repo.path());
        let args = tool
            .spec()
            .validate(&serde_json::json!({"path": "src/network.py", "start_line": 2, "end_line": 3}))
            .unwrap();
        let out = tool.execute(args).await.unwrap();
        assert_eq!(
            out.output,
            "src/network.py (lines 2-3 of 3)\n    2 | def connect(host):\n    3 |     return host"
        );
    }

    #[tokio::test]
    async fn defaults_read_whole_file() {
        let repo = sample_repo();
        let tool = tool(repo.path());
        let args = tool.spec().validate(&serde_json::json!({"path": "src/network.py"})).unwrap();
        let out = tool.execute(args).await.unwrap();
        assert!(out.output.starts_with("src/network.py (lines 1-3 of 3)"));
        assert!(out.output.contains("    1 | # open network sockets"));
    }

    #[tokio::test]
    async fn start_past_end_is_reported() {
        let repo = sample_repo();
        let tool = tool(repo.path());
        let args = tool
            .spec()
            .validate(&serde_json::json!({"path": "src/network.py", "start_line": 10}))
            .unwrap();
        assert!(tool.execute(args).await.unwrap().output.contains("only 3 lines"));
    }

    #[tokio::test]
    async fn invalid_range_rejected() {
        let repo = sample_repo();
        let tool = tool(repo.path());
        let args = tool
            .spec()
            .validate(&serde_json::json!({"path": "src/network.py", "start_line": 3, "end_line": 2}))
            .unwrap();
        assert!(matches!(tool.execute(args).await, Err(ToolError::InvalidArguments { .. })));
    }

    #[tokio::test]
    async fn escape_attempt_denied() {
        let repo = sample_repo();
        let tool = tool(repo.path());
        let args = tool.spec().validate(&serde_json::json!({"path": "../etc/passwd"})).unwrap();
        assert!(matches!(tool.execute(args).await, Err(ToolError::PermissionDenied { .. })));
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let repo = sample_repo();
        let tool = tool(repo.path());
        let args = tool.spec().validate(&serde_json::json!({"path": "src/gone.py"})).unwrap();
        assert!(matches!(tool.execute(args).await, Err(ToolError::ExecutionFailed { .. })));
    }
}
