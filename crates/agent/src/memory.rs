//! Working memory — the ordered turns of one conversation.
//!
//! Append-only while a session is live; replayed to the selection policy on
//! every decision. Only [`crate::session::AgentSession`] mutates it.

use codewright_core::turn::{ConversationTurn, TurnKind};
use codewright_core::ToolInvocation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkingMemory {
    turns: Vec<ConversationTurn>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Append a completed invocation as its `ToolCall` and `ToolResult` pair.
    pub(crate) fn append_invocation(&mut self, invocation: ToolInvocation) {
        let result = ConversationTurn::tool_result(&invocation);
        self.turns.push(ConversationTurn::tool_call(invocation));
        self.turns.push(result);
    }

    pub(crate) fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Every recorded invocation, oldest first.
    pub fn invocations(&self) -> impl Iterator<Item = &ToolInvocation> {
        self.turns.iter().filter_map(|t| match &t.kind {
            TurnKind::ToolCall { invocation } => Some(invocation),
            _ => None,
        })
    }

    /// Export as JSON for debugging.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
