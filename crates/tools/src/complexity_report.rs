//! Complexity report tool — approximate cyclomatic complexity per function.
//!
//! A lexical estimate that works across languages: a function starts at a
//! definition keyword followed by a name and runs until the next definition.
//! Each block scores 1 plus one per branching keyword or short-circuit
//! operator. Comment lines are ignored.

use async_trait::async_trait;
use codewright_core::error::ToolError;
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolSpec};
use std::sync::Arc;

use crate::context::ToolContext;
use crate::path::resolve_file;

const NAME: &str = "complexity_report";
const DEFINITION_KEYWORDS: &[&str] = &["def", "fn", "func", "function"];
const BRANCH_KEYWORDS: &[&str] = &[
    "if", "elif", "for", "while", "case", "catch", "except", "match", "and", "or",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionComplexity {
    pub name: String,
    /// 1-based line of the definition
    pub line: usize,
    pub lines: usize,
    pub score: usize,
}

impl FunctionComplexity {
    pub fn rating(&self) -> &'static str {
        match self.score {
            0..=5 => "low",
            6..=10 => "moderate",
            11..=20 => "high",
            _ => "very high",
        }
    }
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with('#') || trimmed.starts_with("//")
}

fn words(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// The function name if `line` opens a definition.
fn definition_name(line: &str) -> Option<String> {
    if is_comment(line) {
        return None;
    }
    let mut tokens = words(line);
    while let Some(token) = tokens.next() {
        if DEFINITION_KEYWORDS.contains(&token) {
            return tokens.next().map(str::to_string);
        }
    }
    None
}

fn branch_points(line: &str) -> usize {
    if is_comment(line) {
        return 0;
    }
    let keywords = words(line).filter(|w| BRANCH_KEYWORDS.contains(w)).count();
    keywords + line.matches("&&").count() + line.matches("||").count()
}

/// Score every function in `source`, highest score first.
pub fn analyze(source: &str) -> Vec<FunctionComplexity> {
    let lines: Vec<&str> = source.lines().collect();
    let starts: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| definition_name(l).map(|name| (i, name)))
        .collect();

    let mut functions: Vec<FunctionComplexity> = starts
        .iter()
        .enumerate()
        .map(|(n, (start, name))| {
            let end = starts.get(n + 1).map(|(s, _)| *s).unwrap_or(lines.len());
            let body = &lines[*start..end];
            // Trailing blank lines belong to no one.
            let span = body.iter().rposition(|l| !l.trim().is_empty()).map_or(1, |p| p + 1);
            FunctionComplexity {
                name: name.clone(),
                line: start + 1,
                lines: span,
                score: 1 + body.iter().map(|l| branch_points(l)).sum::<usize>(),
            }
        })
        .collect();

    functions.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
    functions
}

pub struct ComplexityReportTool {
    ctx: Arc<ToolContext>,
}

impl ComplexityReportTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for ComplexityReportTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Report the cyclomatic complexity of each function in a file, ranked from most to \
             least complex.",
        )
        .param(ParamSpec::required("path", ParamKind::String, "Repository-relative file path"))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let path = args.str("path")?;
        let resolved = resolve_file(self.ctx.root(), path, NAME)?;
        let source = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::execution_failed(NAME, format!("failed to read '{path}': {e}")))?;

        let functions = analyze(&source);
        if functions.is_empty() {
            return Ok(ToolOutput::text(format!("No functions found in {path}.")));
        }

        let mut output = format!("Complexity for {path}\nscore | lines | function | rating\n");
        for f in &functions {
            output.push_str(&format!(
                "{:>5} | {:>5} | {} (line {}) | {}\n",
                f.score,
                f.lines,
                f.name,
                f.line,
                f.rating()
            ));
        }

        let data: Vec<serde_json::Value> = functions
            .iter()
            .map(|f| {
                serde_json::json!({
                    "name": f.name,
                    "line": f.line,
                    "lines": f.lines,
                    "score": f.score,
                    "rating": f.rating(),
                })
            })
            .collect();

        Ok(ToolOutput {
            output: output.trim_end().to_string(),
            data: Some(serde_json::Value::Array(data)),
        })
    }
}
