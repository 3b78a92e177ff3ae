//! The audit record of one model-requested tool call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::ToolError;

/// How a tool invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success { output: String },
    Failure { error: ToolError },
}

/// One tool call requested by the model, complete with its outcome.
///
/// Produced by the dispatcher and never mutated once it lands in working
/// memory. A failed validation still yields an invocation, with
/// `arguments == None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Monotonic within the owning session, starting at 1
    pub id: u64,

    pub tool_name: String,

    /// Arguments exactly as the model produced them
    pub raw_arguments: Value,

    /// Validated and defaulted arguments, if validation succeeded
    pub arguments: Option<Map<String, Value>>,

    pub outcome: InvocationOutcome,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ToolInvocation {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success { .. })
    }

    pub fn error(&self) -> Option<&ToolError> {
        match &self.outcome {
            InvocationOutcome::Failure { error } => Some(error),
            InvocationOutcome::Success { .. } => None,
        }
    }

    /// The text fed back to the model as the tool's response.
    pub fn result_text(&self) -> String {
        match &self.outcome {
            InvocationOutcome::Success { output } => output.clone(),
            InvocationOutcome::Failure { error } => format!("tool failed: {error}"),
        }
    }
}
