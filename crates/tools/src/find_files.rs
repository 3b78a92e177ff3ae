//! Find files tool — list the indexed files nearest to a query.

use async_trait::async_trait;
use codewright_core::error::{IndexError, ToolError};
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolSpec};
use std::sync::Arc;

use crate::codebase_qa::index_unavailable;
use crate::context::ToolContext;

const NAME: &str = "find_files";

pub struct FindFilesTool {
    ctx: Arc<ToolContext>,
}

impl FindFilesTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for FindFilesTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Locate the files that deal with a topic. Returns file paths with their similarity \
             score and a short summary of each file.",
        )
        .param(ParamSpec::required("query", ParamKind::String, "What the files should be about"))
        .param(ParamSpec::optional("k", ParamKind::Integer, "How many files to list", 5))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let query = args.str("query")?;
        let k = args.int("k")?.clamp(1, 50) as usize;
        let index = self.ctx.require_index(NAME)?;

        let hits = match index.query(query, k).await {
            Ok(hits) => hits,
            Err(err @ IndexError::Backend(_)) => return Ok(index_unavailable(&err)),
            Err(err) => return Err(ToolError::execution_failed(NAME, err.to_string())),
        };

        if hits.is_empty() {
            return Ok(ToolOutput::text("No indexed files found."));
        }

        let lines: Vec<String> = hits
            .iter()
            .enumerate()
            .map(|(i, hit)| {
                format!(
                    "{}. {} (score {:.3})\n   {}",
                    i + 1,
                    hit.entry.path,
                    hit.score,
                    hit.entry.description.replace('\n', " ")
                )
            })
            .collect();
        let paths: Vec<&str> = hits.iter().map(|h| h.entry.path.as_str()).collect();

        Ok(ToolOutput {
            output: lines.join("\n"),
            data: Some(serde_json::json!({ "paths": paths })),
        })
    }
}
