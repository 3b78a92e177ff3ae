//! Selection policy — decides whether to answer or which tool to call next.
//!
//! The provider-backed policy asks the model for a single JSON directive:
//!
//! ```json
//! {"action": "call_tool", "tool": "read_file", "arguments": {"path": "src/main.rs"}}
//! {"action": "respond", "response": "The entry point is main() in src/main.rs."}
//! ```
//!
//! The directive may arrive bare, in a fenced block, or embedded in prose.
//! A reply with no JSON object at all is taken as a direct answer.
//!
//! Working memory is replayed through a sliding window: the current question
//! and its tool exchanges always go out, and earlier questions are added
//! newest first, whole, until the token budget is spent.

use async_trait::async_trait;
use codewright_config::DEFAULT_HISTORY_TOKEN_BUDGET;
use codewright_core::error::ProviderError;
use codewright_core::message::Message;
use codewright_core::provider::{Provider, ProviderRequest};
use codewright_core::tool::ToolSpec;
use codewright_core::turn::{ConversationTurn, TurnKind};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompts;
use crate::token;

/// What the policy wants the loop to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    RespondDirectly(String),
    CallTool { name: String, args: Value },
}

#[derive(Debug, Error)]
pub enum SelectionError {
    /// The model's reply could not be understood, even after a retry.
    #[error("Could not parse model decision: {reason}")]
    Parse { reason: String, raw: String },

    #[error("Model decision timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Model backend error: {0}")]
    Backend(#[from] ProviderError),
}

/// Chooses the next step given the conversation so far.
#[async_trait]
pub trait SelectionPolicy: Send + Sync {
    async fn decide(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolSpec],
    ) -> Result<Decision, SelectionError>;
}

// ── Directive parsing ─────────────────────────────────────────────────────

fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```JSON")
            .trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            if let Ok(value) = serde_json::from_str::<Value>(stripped[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}

/// Parse one model reply into a [`Decision`]; `Err` carries the reason.
pub fn parse_decision(content: &str) -> Result<Decision, String> {
    let Some(value) = extract_json(content) else {
        if content.contains('{') {
            return Err("reply contains a malformed JSON object".into());
        }
        let text = content.trim();
        if text.is_empty() {
            return Err("reply was empty".into());
        }
        return Ok(Decision::RespondDirectly(text.to_string()));
    };

    let map = match value {
        Value::Object(map) => map,
        Value::String(inner) if inner.contains('{') => return parse_decision(&inner),
        Value::String(inner) => {
            let text = inner.trim();
            if text.is_empty() {
                return Err("reply was an empty string".into());
            }
            return Ok(Decision::RespondDirectly(text.to_string()));
        }
        _ => return Ok(Decision::RespondDirectly(content.trim().to_string())),
    };

    let action = map
        .get("action")
        .and_then(Value::as_str)
        .ok_or("missing action field")?;

    match action {
        "call_tool" => {
            let tool = map
                .get("tool")
                .and_then(Value::as_str)
                .ok_or("call_tool action missing tool field")?;
            let args = match map.get("arguments") {
                None | Some(Value::Null) => Value::Object(Default::default()),
                Some(args @ Value::Object(_)) => args.clone(),
                Some(other) => return Err(format!("arguments must be an object, got {other}")),
            };
            if let Some(reason) = map.get("reason").and_then(Value::as_str) {
                debug!(tool = %tool, reason = %reason, "Model chose a tool");
            }
            Ok(Decision::CallTool {
                name: tool.to_string(),
                args,
            })
        }
        "respond" => {
            let response = map
                .get("response")
                .and_then(Value::as_str)
                .ok_or("respond action missing response field")?;
            Ok(Decision::RespondDirectly(response.to_string()))
        }
        other => Err(format!("unknown action value: {other}")),
    }
}

// ── Model-backed policy ───────────────────────────────────────────────────

pub struct ModelSelectionPolicy {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    timeout: Duration,
    preamble: String,
    history_budget: usize,
}

impl ModelSelectionPolicy {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            timeout,
            preamble: prompts::AGENT_PREAMBLE.to_string(),
            history_budget: DEFAULT_HISTORY_TOKEN_BUDGET,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Replace the agent preamble at the top of the system prompt.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Token budget for replayed conversation, excluding the system prompt.
    pub fn with_history_budget(mut self, tokens: usize) -> Self {
        self.history_budget = tokens;
        self
    }

    fn build_messages(&self, history: &[ConversationTurn], tools: &[ToolSpec]) -> Vec<Message> {
        let mut messages = vec![Message::system(prompts::system_prompt(&self.preamble, tools))];
        messages.extend(self.window(history, replay(history)));
        messages
    }

    /// Keep the current question whole; prepend earlier questions, each with
    /// its tool exchanges and answer, while they fit the budget.
    fn window(&self, history: &[ConversationTurn], mut replayed: Vec<Message>) -> Vec<Message> {
        let is_user = |turn: &ConversationTurn| matches!(turn.kind, TurnKind::User { .. });
        let current = history.iter().rposition(is_user).unwrap_or(0);

        let mut used = token::estimate_messages_tokens(&replayed[current..]);
        let mut keep_from = current;
        for start in (0..current).rev() {
            if start > 0 && !is_user(&history[start]) {
                continue;
            }
            let cost = token::estimate_messages_tokens(&replayed[start..keep_from]);
            if used + cost > self.history_budget {
                break;
            }
            used += cost;
            keep_from = start;
        }

        if keep_from > 0 {
            debug!(
                dropped_turns = keep_from,
                tokens = used,
                budget = self.history_budget,
                "Oldest turns dropped (sliding window)"
            );
        }
        replayed.split_off(keep_from)
    }

    async fn ask(&self, messages: Vec<Message>) -> Result<String, SelectionError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stop: vec![],
        };
        match tokio::time::timeout(self.timeout, self.provider.complete(request)).await {
            Ok(response) => Ok(response?.message.content),
            Err(_) => Err(SelectionError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// Replay working memory as chat messages, one per turn.
fn replay(history: &[ConversationTurn]) -> Vec<Message> {
    let mut tool_names: HashMap<u64, &str> = HashMap::new();
    history
        .iter()
        .map(|turn| match &turn.kind {
            TurnKind::User { text } => Message::user(text),
            TurnKind::Assistant { text } => Message::assistant(text),
            TurnKind::ToolCall { invocation } => {
                tool_names.insert(invocation.id, &invocation.tool_name);
                let directive = serde_json::json!({
                    "action": "call_tool",
                    "tool": invocation.tool_name,
                    "arguments": invocation.raw_arguments,
                });
                Message::assistant(directive.to_string())
            }
            TurnKind::ToolResult { invocation_id, text } => {
                let name = tool_names.get(invocation_id).copied().unwrap_or("tool");
                Message::user(prompts::tool_response(name, text))
            }
        })
        .collect()
}

#[async_trait]
impl SelectionPolicy for ModelSelectionPolicy {
    async fn decide(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolSpec],
    ) -> Result<Decision, SelectionError> {
        let mut messages = self.build_messages(history, tools);
        let reply = self.ask(messages.clone()).await?;

        let reason = match parse_decision(&reply) {
            Ok(decision) => return Ok(decision),
            Err(reason) => reason,
        };
        warn!(reason = %reason, "Unparseable decision, retrying once");

        messages.push(Message::assistant(reply));
        messages.push(Message::user(prompts::CORRECTIVE_PROMPT));
        let retry = self.ask(messages).await?;

        parse_decision(&retry).map_err(|reason| SelectionError::Parse { reason, raw: retry })
    }
}
