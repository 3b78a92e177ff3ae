//! Conversation turns: the units of an agent's working memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::invocation::ToolInvocation;

/// What a turn holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnKind {
    User { text: String },
    Assistant { text: String },
    ToolCall { invocation: ToolInvocation },
    ToolResult { invocation_id: u64, text: String },
}

/// One entry in working memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(flatten)]
    pub kind: TurnKind,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    fn now(kind: TurnKind) -> Self {
        Self {
            kind,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::now(TurnKind::User { text: text.into() })
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::now(TurnKind::Assistant { text: text.into() })
    }

    pub fn tool_call(invocation: ToolInvocation) -> Self {
        Self::now(TurnKind::ToolCall { invocation })
    }

    /// The result turn paired with `invocation`.
    pub fn tool_result(invocation: &ToolInvocation) -> Self {
        Self::now(TurnKind::ToolResult {
            invocation_id: invocation.id,
            text: invocation.result_text(),
        })
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self.kind {
            TurnKind::User { .. } => "user",
            TurnKind::Assistant { .. } => "assistant",
            TurnKind::ToolCall { .. } => "tool_call",
            TurnKind::ToolResult { .. } => "tool_result",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::InvocationOutcome;

    #[test]
    fn tool_result_pairs_with_invocation() {
        let now = Utc::now();
        let inv = ToolInvocation {
            id: 7,
            tool_name: "echo".into(),
            raw_arguments: serde_json::json!({"text": "hi"}),
            arguments: None,
            outcome: InvocationOutcome::Success { output: "hi".into() },
            started_at: now,
            finished_at: now,
            duration_ms: 1,
        };
        let turn = ConversationTurn::tool_result(&inv);
        match turn.kind {
            TurnKind::ToolResult { invocation_id, text } => {
                assert_eq!(invocation_id, 7);
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected turn: {other:?}"),
        }
    }

    #[test]
    fn turn_serializes_flat_with_type_tag() {
        let json = serde_json::to_value(ConversationTurn::user("where is main?")).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["text"], "where is main?");
        assert!(json.get("created_at").is_some());
    }
}
