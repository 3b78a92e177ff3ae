//! Shared test helpers for agent tests.

use async_trait::async_trait;
use codewright_core::error::{ProviderError, ToolError};
use codewright_core::message::Message;
use codewright_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use codewright_core::tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolOutput, ToolRegistry, ToolSpec};
use codewright_core::turn::ConversationTurn;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::policy::{Decision, SelectionError, SelectionPolicy};

// ── Tools ─────────────────────────────────────────────────────────────────

pub fn echo_spec() -> ToolSpec {
    ToolSpec::new("echo", "Echo text back").param(ParamSpec::required("text", ParamKind::String, "Text to echo"))
}

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn spec(&self) -> ToolSpec {
        echo_spec()
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::text(args.str("text")?))
    }
}

struct FailTool;

#[async_trait]
impl Tool for FailTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("fail", "Always fails")
    }

    async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
        Err(ToolError::execution_failed("fail", "boom"))
    }
}

struct SlowTool;

#[async_trait]
impl Tool for SlowTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("slow", "Takes an hour")
    }

    async fn execute(&self, _args: ToolArgs) -> Result<ToolOutput, ToolError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ToolOutput::text("finally"))
    }
}

struct RepeatTool;

#[async_trait]
impl Tool for RepeatTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("repeat", "Repeat a word")
            .param(ParamSpec::required("word", ParamKind::String, "Word to repeat"))
            .param(ParamSpec::optional("times", ParamKind::Integer, "Repetitions", 2))
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        let word = args.str("word")?;
        let times = args.int("times")?.max(0) as usize;
        Ok(ToolOutput::text(vec![word; times].join(" ")))
    }
}

/// Registry with `echo`, `fail`, `slow`, and `repeat`.
pub fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EchoTool)).unwrap();
    registry.register(Arc::new(FailTool)).unwrap();
    registry.register(Arc::new(SlowTool)).unwrap();
    registry.register(Arc::new(RepeatTool)).unwrap();
    registry
}

// ── Policies ──────────────────────────────────────────────────────────────

pub fn respond(text: &str) -> Result<Decision, SelectionError> {
    Ok(Decision::RespondDirectly(text.into()))
}

pub fn call(name: &str, args: serde_json::Value) -> Result<Decision, SelectionError> {
    Ok(Decision::CallTool { name: name.into(), args })
}

enum Script {
    Queue(Mutex<Vec<Result<Decision, SelectionError>>>),
    Repeat(Decision),
    Hang,
}

/// A policy that replays scripted decisions and records what it was shown.
pub struct ScriptedPolicy {
    script: Script,
    history_lengths: Mutex<Vec<usize>>,
}

impl ScriptedPolicy {
    pub fn new(mut decisions: Vec<Result<Decision, SelectionError>>) -> Arc<Self> {
        decisions.reverse();
        Self::with_script(Script::Queue(Mutex::new(decisions)))
    }

    /// Returns the same decision forever.
    pub fn repeating(decision: Result<Decision, SelectionError>) -> Arc<Self> {
        Self::with_script(Script::Repeat(decision.unwrap()))
    }

    /// Never decides.
    pub fn hanging() -> Arc<Self> {
        Self::with_script(Script::Hang)
    }

    fn with_script(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            history_lengths: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.history_lengths.lock().unwrap().len()
    }

    pub fn seen_history_lengths(&self) -> Vec<usize> {
        self.history_lengths.lock().unwrap().clone()
    }
}

#[async_trait]
impl SelectionPolicy for ScriptedPolicy {
    async fn decide(
        &self,
        history: &[ConversationTurn],
        _tools: &[ToolSpec],
    ) -> Result<Decision, SelectionError> {
        self.history_lengths.lock().unwrap().push(history.len());
        match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| panic!("ScriptedPolicy: no more decisions")),
            Script::Repeat(decision) => Ok(decision.clone()),
            Script::Hang => std::future::pending().await,
        }
    }
}

// ── Providers ─────────────────────────────────────────────────────────────

enum Reply {
    Text(String),
    Fail(ProviderError),
    Hang,
}

/// A provider that returns scripted replies in order and keeps every request.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Reply>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn with_replies(mut replies: Vec<Reply>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn new(replies: Vec<&str>) -> Arc<Self> {
        Self::with_replies(replies.into_iter().map(|r| Reply::Text(r.into())).collect())
    }

    pub fn failing(error: ProviderError) -> Arc<Self> {
        Self::with_replies(vec![Reply::Fail(error)])
    }

    pub fn hanging() -> Arc<Self> {
        Self::with_replies(vec![Reply::Hang])
    }

    pub fn request(&self, index: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[index].clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop();
        match reply {
            Some(Reply::Text(text)) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model: "mock-model".into(),
            }),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Hang) => std::future::pending().await,
            None => panic!("ScriptedProvider: no more replies"),
        }
    }
}
