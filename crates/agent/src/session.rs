//! The agent session — one conversation's control loop.
//!
//! ```text
//! AwaitingUserInput ──user──▶ Deciding ──respond──▶ Responding ──▶ AwaitingUserInput
//!                               ▲   │
//!                               │   └──call_tool──▶ Invoking
//!                               └───────────────────────┘
//! ```
//!
//! Each user message runs the loop to completion: the policy either answers
//! or names a tool, the dispatcher records the invocation, and the loop asks
//! the policy again until it answers or the per-turn tool budget runs out.

use chrono::Utc;
use codewright_config::AgentConfig;
use codewright_core::error::ToolError;
use codewright_core::event::{DomainEvent, EventBus};
use codewright_core::tool::ToolRegistry;
use codewright_core::turn::ConversationTurn;
use codewright_core::ToolInvocation;
use codewright_index::RetrievalIndex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::dispatcher::ToolDispatcher;
use crate::memory::WorkingMemory;
use crate::policy::{Decision, SelectionError, SelectionPolicy};

pub const CALL_LIMIT_MARKER: &str = "[reached call limit]";
pub const PARSE_FALLBACK: &str =
    "I was unable to decide how to answer — please rephrase your question.";
pub const TIMEOUT_FALLBACK: &str =
    "The language model took too long to respond — please try again.";
pub const BACKEND_FALLBACK: &str =
    "I couldn't reach the language model just now — please try again.";

const SUMMARY_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    AwaitingUserInput,
    Deciding,
    Invoking,
    Responding,
}

/// How a user turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The policy answered.
    Answered(String),
    /// The tool budget ran out; the text starts with [`CALL_LIMIT_MARKER`].
    CallLimitReached(String),
    /// The policy failed; the text is a user-facing apology.
    Fallback(String),
    Cancelled,
}

impl TurnOutcome {
    /// Text to show the user.
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Answered(text)
            | TurnOutcome::CallLimitReached(text)
            | TurnOutcome::Fallback(text) => text,
            TurnOutcome::Cancelled => "(cancelled)",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Answered(_) => "answered",
            TurnOutcome::CallLimitReached(_) => "call_limit_reached",
            TurnOutcome::Fallback(_) => "fallback",
            TurnOutcome::Cancelled => "cancelled",
        }
    }
}

fn fallback_text(err: &SelectionError) -> &'static str {
    match err {
        SelectionError::Parse { .. } => PARSE_FALLBACK,
        SelectionError::Timeout { .. } => TIMEOUT_FALLBACK,
        SelectionError::Backend(_) => BACKEND_FALLBACK,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// The forced answer when the tool budget runs out.
fn call_limit_text(limit: usize, successes: &[&ToolInvocation]) -> String {
    let mut text = format!(
        "{CALL_LIMIT_MARKER} I used all {limit} tool calls allowed for this question without reaching a final answer."
    );
    if successes.is_empty() {
        text.push_str(" None of the tool calls succeeded.");
        return text;
    }
    text.push_str(" Here is what I found:");
    for inv in successes {
        let output = truncate(inv.result_text().trim(), SUMMARY_CHARS);
        text.push_str(&format!("\n- {}: {}", inv.tool_name, output));
    }
    text
}

pub struct AgentSession {
    id: SessionId,
    memory: WorkingMemory,
    registry: Arc<ToolRegistry>,
    index: Option<Arc<RetrievalIndex>>,
    policy: Arc<dyn SelectionPolicy>,
    dispatcher: ToolDispatcher,
    max_tool_calls: usize,
    state: AgentState,
    events: Arc<EventBus>,
}

impl AgentSession {
    pub fn new(registry: Arc<ToolRegistry>, policy: Arc<dyn SelectionPolicy>, config: &AgentConfig) -> Self {
        let dispatcher = ToolDispatcher::new(
            registry.clone(),
            Duration::from_secs(config.tool_timeout_secs),
        );
        let id = SessionId::new();
        info!(session_id = %id, tools = registry.len(), "Agent session created");
        Self {
            id,
            memory: WorkingMemory::new(),
            registry,
            index: None,
            policy,
            dispatcher,
            max_tool_calls: config.max_tool_calls,
            state: AgentState::AwaitingUserInput,
            events: Arc::new(EventBus::default()),
        }
    }

    pub fn with_index(mut self, index: Arc<RetrievalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn memory(&self) -> &WorkingMemory {
        &self.memory
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn index(&self) -> Option<&Arc<RetrievalIndex>> {
        self.index.as_ref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Forget the conversation. Tools and index stay loaded.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.state = AgentState::AwaitingUserInput;
        info!(session_id = %self.id, "Session reset");
    }

    /// Run one user turn to completion.
    pub async fn submit(&mut self, text: &str) -> TurnOutcome {
        self.submit_with_cancel(text, CancellationToken::new()).await
    }

    /// Run one user turn, abandoning it if `cancel` fires.
    pub async fn submit_with_cancel(&mut self, text: &str, cancel: CancellationToken) -> TurnOutcome {
        let span = info_span!("turn", session_id = %self.id);
        let (outcome, tool_calls) = self.run_turn(text, &cancel).instrument(span).await;

        self.state = AgentState::AwaitingUserInput;
        self.events.publish(DomainEvent::TurnCompleted {
            session_id: self.id.to_string(),
            outcome: outcome.label().into(),
            tool_calls,
            timestamp: Utc::now(),
        });
        outcome
    }

    async fn run_turn(&mut self, text: &str, cancel: &CancellationToken) -> (TurnOutcome, usize) {
        info!(turns = self.memory.len(), "Processing user message");
        self.memory.append(ConversationTurn::user(text));

        let tools = self.registry.list();
        let policy = self.policy.clone();
        let mut invocations: Vec<ToolInvocation> = Vec::new();

        loop {
            self.state = AgentState::Deciding;
            debug!(tool_calls = invocations.len(), "Deciding next step");

            let decision = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Turn cancelled while deciding");
                    return (TurnOutcome::Cancelled, invocations.len());
                }
                decision = policy.decide(self.memory.turns(), &tools) => decision,
            };

            let decision = match decision {
                Ok(decision) => decision,
                Err(err) => {
                    warn!(error = %err, "Selection failed, answering with fallback");
                    self.publish_decision("failed", None);
                    let text = fallback_text(&err);
                    self.respond(text);
                    return (TurnOutcome::Fallback(text.to_string()), invocations.len());
                }
            };

            match decision {
                Decision::RespondDirectly(answer) => {
                    self.publish_decision("respond", None);
                    self.respond(&answer);
                    return (TurnOutcome::Answered(answer), invocations.len());
                }
                Decision::CallTool { name, args } => {
                    self.publish_decision("call_tool", Some(&name));

                    if invocations.len() >= self.max_tool_calls {
                        warn!(limit = self.max_tool_calls, tool = %name, "Tool call limit reached");
                        let refused = self.dispatcher.refuse(
                            &name,
                            args,
                            ToolError::CallLimitReached { limit: self.max_tool_calls },
                        );
                        self.record(refused.clone());
                        invocations.push(refused);

                        let successes: Vec<&ToolInvocation> =
                            invocations.iter().filter(|i| i.is_success()).collect();
                        let text = call_limit_text(self.max_tool_calls, &successes);
                        self.respond(&text);
                        return (TurnOutcome::CallLimitReached(text), invocations.len());
                    }

                    self.state = AgentState::Invoking;
                    let invocation = self.dispatcher.invoke(&name, args, cancel).await;
                    let cancelled = invocation.error() == Some(&ToolError::Cancelled);
                    self.record(invocation.clone());
                    invocations.push(invocation);

                    if cancelled {
                        info!(tool = %name, "Turn cancelled while invoking");
                        return (TurnOutcome::Cancelled, invocations.len());
                    }
                }
            }
        }
    }

    fn respond(&mut self, text: &str) {
        self.state = AgentState::Responding;
        self.memory.append(ConversationTurn::assistant(text));
    }

    fn record(&mut self, invocation: ToolInvocation) {
        debug!(
            invocation_id = invocation.id,
            tool = %invocation.tool_name,
            success = invocation.is_success(),
            duration_ms = invocation.duration_ms,
            "Recording invocation"
        );
        self.events.publish(DomainEvent::ToolInvoked {
            session_id: self.id.to_string(),
            invocation_id: invocation.id,
            tool_name: invocation.tool_name.clone(),
            success: invocation.is_success(),
            duration_ms: invocation.duration_ms,
            timestamp: Utc::now(),
        });
        self.memory.append_invocation(invocation);
    }

    fn publish_decision(&self, action: &str, tool_name: Option<&str>) {
        self.events.publish(DomainEvent::DecisionMade {
            session_id: self.id.to_string(),
            action: action.into(),
            tool_name: tool_name.map(String::from),
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use codewright_core::error::ProviderError;
    use codewright_core::turn::TurnKind;

    fn session(policy: Arc<ScriptedPolicy>) -> AgentSession {
        AgentSession::new(Arc::new(test_registry()), policy, &AgentConfig::default())
    }

    fn labels(session: &AgentSession) -> Vec<&'static str> {
        session.memory().turns().iter().map(|t| t.label()).collect()
    }

    #[tokio::test]
    async fn direct_answer() {
        let policy = ScriptedPolicy::new(vec![respond("Hello!")]);
        let mut s = session(policy);
        let outcome = s.submit("hi").await;
        assert_eq!(outcome, TurnOutcome::Answered("Hello!".into()));
        assert_eq!(labels(&s), vec!["user", "assistant"]);
        assert_eq!(s.state(), AgentState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn echo_end_to_end() {
        let policy = ScriptedPolicy::new(vec![call("echo", serde_json::json!({"text": "hi"})), respond("hi")]);
        let mut s = session(policy.clone());
        let outcome = s.submit("say hi").await;
        assert_eq!(outcome.text(), "hi");

        let turns = s.memory().turns();
        assert_eq!(labels(&s), vec!["user", "tool_call", "tool_result", "assistant"]);
        match &turns[2].kind {
            TurnKind::ToolResult { invocation_id, text } => {
                assert_eq!(*invocation_id, 1);
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected turn: {other:?}"),
        }
        // The second decision saw the tool result.
        assert_eq!(policy.seen_history_lengths(), vec![1, 3]);
    }

    #[tokio::test]
    async fn memory_grows_by_appends_across_turns() {
        let policy = ScriptedPolicy::new(vec![
            call("echo", serde_json::json!({"text": "a"})),
            respond("a"),
            respond("b"),
            call("nope", serde_json::json!({})),
            call("echo", serde_json::json!({})),
            respond("c"),
        ]);
        let mut s = session(policy);
        s.submit("one").await;
        assert_eq!(s.memory().len(), 4);
        s.submit("two").await;
        assert_eq!(s.memory().len(), 6);
        s.submit("three").await;
        assert_eq!(s.memory().len(), 12);
        assert_eq!(s.memory().invocations().count(), 3);
    }

    #[tokio::test]
    async fn every_call_decision_yields_one_invocation() {
        let policy = ScriptedPolicy::new(vec![
            call("nope", serde_json::json!({})),
            call("echo", serde_json::json!({})),
            call("fail", serde_json::json!({})),
            call("echo", serde_json::json!({"text": "ok"})),
            respond("done"),
        ]);
        let mut s = session(policy);
        s.submit("go").await;
        let invocations: Vec<&ToolInvocation> = s.memory().invocations().collect();
        assert_eq!(invocations.len(), 4);
        let ids: Vec<u64> = invocations.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(matches!(invocations[0].error(), Some(ToolError::NotFound { .. })));
        assert!(matches!(invocations[1].error(), Some(ToolError::InvalidArguments { .. })));
        assert!(matches!(invocations[2].error(), Some(ToolError::ExecutionFailed { .. })));
        assert!(invocations[3].is_success());
    }

    #[tokio::test]
    async fn call_limit_forces_answer() {
        let policy = ScriptedPolicy::repeating(call("echo", serde_json::json!({"text": "found it"})));
        let config = AgentConfig { max_tool_calls: 2, ..AgentConfig::default() };
        let mut s = AgentSession::new(Arc::new(test_registry()), policy.clone(), &config);

        let outcome = s.submit("loop forever").await;
        let TurnOutcome::CallLimitReached(text) = &outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert!(text.starts_with(CALL_LIMIT_MARKER));
        assert!(text.contains("- echo: found it"));

        let invocations: Vec<&ToolInvocation> = s.memory().invocations().collect();
        assert_eq!(invocations.len(), 3);
        assert_eq!(invocations.iter().filter(|i| i.is_success()).count(), 2);
        assert_eq!(invocations[2].error(), Some(&ToolError::CallLimitReached { limit: 2 }));
        assert_eq!(policy.calls(), 3);
        assert_eq!(labels(&s).last(), Some(&"assistant"));
    }

    #[tokio::test]
    async fn call_limit_without_successes() {
        let policy = ScriptedPolicy::repeating(call("fail", serde_json::json!({})));
        let config = AgentConfig { max_tool_calls: 1, ..AgentConfig::default() };
        let mut s = AgentSession::new(Arc::new(test_registry()), policy, &config);
        let outcome = s.submit("q").await;
        assert!(outcome.text().contains("None of the tool calls succeeded"));
    }

    #[tokio::test]
    async fn memory_keeps_turns_the_window_drops() {
        let long_answer = format!(r#"{{"action":"respond","response":"{}"}}"#, "x".repeat(400));
        let provider = ScriptedProvider::new(vec![
            long_answer.as_str(),
            r#"{"action":"call_tool","tool":"echo","arguments":{"text":"hi"}}"#,
            r#"{"action":"respond","response":"hi"}"#,
        ]);
        let policy = crate::policy::ModelSelectionPolicy::new(provider.clone(), "test-model", Duration::from_secs(60))
            .with_history_budget(60);
        let mut s = AgentSession::new(Arc::new(test_registry()), Arc::new(policy), &AgentConfig::default());

        s.submit("one").await;
        let outcome = s.submit("two").await;
        assert_eq!(outcome.text(), "hi");
        assert_eq!(labels(&s), vec!["user", "assistant", "user", "tool_call", "tool_result", "assistant"]);

        let last = provider.request(2).messages;
        assert_eq!(last.len(), 4);
        assert_eq!(last[1].content, "two");
        assert!(last.iter().all(|m| !m.content.contains("xxxx")));
    }

    #[tokio::test]
    async fn selection_failures_become_fallbacks() {
        let cases = vec![
            (SelectionError::Parse { reason: "bad".into(), raw: "{".into() }, PARSE_FALLBACK),
            (SelectionError::Timeout { timeout_secs: 60 }, TIMEOUT_FALLBACK),
            (SelectionError::Backend(ProviderError::Network("down".into())), BACKEND_FALLBACK),
        ];
        for (err, expected) in cases {
            let mut s = session(ScriptedPolicy::new(vec![Err(err)]));
            let outcome = s.submit("q").await;
            assert_eq!(outcome, TurnOutcome::Fallback(expected.into()));
            match &s.memory().turns()[1].kind {
                TurnKind::Assistant { text } => assert_eq!(text, expected),
                other => panic!("unexpected turn: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn cancel_while_deciding_appends_nothing_more() {
        let mut s = session(ScriptedPolicy::hanging());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let outcome = s.submit_with_cancel("q", cancel).await;
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(labels(&s), vec!["user"]);
        assert_eq!(s.state(), AgentState::AwaitingUserInput);
    }

    #[tokio::test]
    async fn cancel_while_invoking_records_invocation() {
        let policy = ScriptedPolicy::new(vec![call("slow", serde_json::json!({}))]);
        let mut s = session(policy);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let outcome = s.submit_with_cancel("q", cancel).await;
        assert_eq!(outcome, TurnOutcome::Cancelled);
        assert_eq!(labels(&s), vec!["user", "tool_call", "tool_result"]);
        let inv = s.memory().invocations().next().unwrap();
        assert_eq!(inv.error(), Some(&ToolError::Cancelled));
    }

    #[tokio::test]
    async fn reset_clears_memory_keeps_tools() {
        let mut s = session(ScriptedPolicy::new(vec![respond("a")]));
        s.submit("q").await;
        s.reset();
        assert!(s.memory().is_empty());
        assert_eq!(s.registry().len(), 4);
    }

    #[tokio::test]
    async fn publishes_events() {
        let policy = ScriptedPolicy::new(vec![call("echo", serde_json::json!({"text": "hi"})), respond("hi")]);
        let mut s = session(policy);
        let mut rx = s.events().subscribe();
        s.submit("say hi").await;

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::DecisionMade { action, .. } => format!("decision:{action}"),
                DomainEvent::ToolInvoked { tool_name, success, .. } => format!("tool:{tool_name}:{success}"),
                DomainEvent::TurnCompleted { outcome, tool_calls, .. } => format!("turn:{outcome}:{tool_calls}"),
                DomainEvent::IndexBuilt { .. } => "index".into(),
            });
        }
        assert_eq!(
            kinds,
            vec!["decision:call_tool", "tool:echo:true", "decision:respond", "turn:answered:1"]
        );
    }

    #[test]
    fn truncates_long_outputs() {
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
