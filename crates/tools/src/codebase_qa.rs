//! Codebase QA tool — answer a question from the most relevant files.

use async_trait::async_trait;
use codewright_core::error::{IndexError, ToolError};
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolSpec};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::ToolContext;

const NAME: &str = "codebase_qa";
const LEADING_LINES: usize = 60;
const CODEQA_PROMPT: &str =
    "Answer the question using only the files above. Your answer should only include information that pertains to the question.";

pub struct CodebaseQaTool {
    ctx: Arc<ToolContext>,
}

impl CodebaseQaTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

/// The text returned when the retrieval backend cannot be reached.
pub(crate) fn index_unavailable(err: &IndexError) -> ToolOutput {
    ToolOutput::text(format!(
        "The retrieval index is unavailable right now ({err}), so I could not search the codebase. \
         Try reading specific files instead."
    ))
}

#[async_trait]
impl Tool for CodebaseQaTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Answer a general question about the codebase. Finds the files most relevant to the \
             question and answers from their contents.",
        )
        .param(ParamSpec::required(
            "question",
            ParamKind::String,
            "The question to answer about the code",
        ))
        .param(ParamSpec::optional(
            "k",
            ParamKind::Integer,
            "How many files to consult",
            5,
        ))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let question = args.str("question")?;
        let k = args.int("k")?.clamp(1, 20) as usize;
        let index = self.ctx.require_index(NAME)?;

        let hits = match index.query(question, k).await {
            Ok(hits) => hits,
            Err(err @ IndexError::Backend(_)) => {
                warn!(error = %err, "Retrieval backend failed, answering degraded");
                return Ok(index_unavailable(&err));
            }
            Err(err) => return Err(ToolError::execution_failed(NAME, err.to_string())),
        };

        if hits.is_empty() {
            return Ok(ToolOutput::text(
                "The retrieval index has no files yet, so there is nothing to answer from.",
            ));
        }

        let mut prompt = String::new();
        let mut sources = Vec::new();
        for hit in &hits {
            let path = &hit.entry.path;
            debug!(path = %path, score = hit.score, "Consulting file");
            let leading = tokio::fs::read_to_string(self.ctx.root().join(path))
                .await
                .map(|text| text.lines().take(LEADING_LINES).collect::<Vec<_>>().join("\n"))
                .unwrap_or_default();
            prompt.push_str(&format!(
                "### File: {path} (similarity {:.2}) ###\nSummary: {}\n{leading}\n\n",
                hit.score, hit.entry.description
            ));
            sources.push(path.clone());
        }
        prompt.push_str(&format!("### Question ###\n{question}\n\n{CODEQA_PROMPT}"));

        let answer = self.ctx.ask(NAME, prompt).await?;
        Ok(ToolOutput {
            output: format!("{answer}\n\nSources: {}", sources.join(", ")),
            data: Some(serde_json::json!({ "sources": sources })),
        })
    }
}
