//! Tool dispatcher — turns a model's tool request into a recorded invocation.
//!
//! Lookup, argument validation, timeout, and cancellation are all folded into
//! the returned [`ToolInvocation`]: the dispatcher never fails, it records.

use chrono::Utc;
use codewright_core::error::ToolError;
use codewright_core::tool::ToolRegistry;
use codewright_core::{InvocationOutcome, ToolInvocation};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
    last_id: u64,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, timeout: Duration) -> Self {
        Self {
            registry,
            timeout,
            last_id: 0,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    /// Record a request that was refused without running the tool.
    pub fn refuse(&mut self, tool_name: &str, raw_arguments: Value, error: ToolError) -> ToolInvocation {
        let now = Utc::now();
        ToolInvocation {
            id: self.next_id(),
            tool_name: tool_name.to_string(),
            raw_arguments,
            arguments: None,
            outcome: InvocationOutcome::Failure { error },
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    /// Look up, validate, and run `tool_name`, producing exactly one invocation.
    pub async fn invoke(
        &mut self,
        tool_name: &str,
        raw_arguments: Value,
        cancel: &CancellationToken,
    ) -> ToolInvocation {
        let id = self.next_id();
        let started_at = Utc::now();
        let start = Instant::now();

        let (arguments, result) = match self.registry.get(tool_name) {
            Err(e) => (None, Err(e)),
            Ok((spec, tool)) => match spec.validate(&raw_arguments) {
                Err(e) => (None, Err(e)),
                Ok(args) => {
                    let resolved = args.0.clone();
                    debug!(invocation_id = id, tool = %tool_name, "Running tool");
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(ToolError::Cancelled),
                        outcome = tokio::time::timeout(self.timeout, tool.execute(args)) => {
                            match outcome {
                                Ok(result) => result,
                                Err(_) => Err(ToolError::Timeout {
                                    tool_name: tool_name.to_string(),
                                    timeout_secs: self.timeout.as_secs(),
                                }),
                            }
                        }
                    };
                    (Some(resolved), result)
                }
            },
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let outcome = match result {
            Ok(output) => InvocationOutcome::Success { output: output.output },
            Err(error) => {
                warn!(invocation_id = id, tool = %tool_name, error = %error, "Tool invocation failed");
                InvocationOutcome::Failure { error }
            }
        };

        ToolInvocation {
            id,
            tool_name: tool_name.to_string(),
            raw_arguments,
            arguments,
            outcome,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn dispatcher(timeout: Duration) -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(test_registry()), timeout)
    }

    #[tokio::test]
    async fn successful_invocation() {
        let mut d = dispatcher(Duration::from_secs(5));
        let inv = d
            .invoke("echo", serde_json::json!({"text": "hi"}), &CancellationToken::new())
            .await;
        assert_eq!(inv.id, 1);
        assert!(inv.is_success());
        assert_eq!(inv.result_text(), "hi");
        assert_eq!(inv.arguments.unwrap()["text"], "hi");
    }

    #[tokio::test]
    async fn ids_are_monotonic() {
        let mut d = dispatcher(Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let a = d.invoke("echo", serde_json::json!({"text": "a"}), &cancel).await;
        let b = d.invoke("missing", serde_json::json!({}), &cancel).await;
        let c = d.refuse("echo", serde_json::json!({}), ToolError::CallLimitReached { limit: 1 });
        assert_eq!((a.id, b.id, c.id), (1, 2, 3));
    }

    #[tokio::test]
    async fn unknown_tool_is_recorded() {
        let mut d = dispatcher(Duration::from_secs(5));
        let inv = d.invoke("nope", serde_json::json!({}), &CancellationToken::new()).await;
        assert_eq!(inv.error(), Some(&ToolError::NotFound { name: "nope".into() }));
        assert_eq!(inv.result_text(), "tool failed: Tool not found: nope");
    }

    #[tokio::test]
    async fn missing_argument_is_recorded() {
        let mut d = dispatcher(Duration::from_secs(5));
        let inv = d.invoke("echo", serde_json::json!({}), &CancellationToken::new()).await;
        assert!(matches!(inv.error(), Some(ToolError::InvalidArguments { .. })));
        assert!(inv.arguments.is_none());
        assert_eq!(inv.raw_arguments, serde_json::json!({}));
    }

    #[tokio::test]
    async fn non_object_arguments_rejected() {
        let mut d = dispatcher(Duration::from_secs(5));
        let inv = d.invoke("echo", serde_json::json!("hi"), &CancellationToken::new()).await;
        assert!(matches!(inv.error(), Some(ToolError::InvalidArguments { .. })));
    }

    #[tokio::test]
    async fn tool_failure_is_recorded() {
        let mut d = dispatcher(Duration::from_secs(5));
        let inv = d.invoke("fail", serde_json::json!({}), &CancellationToken::new()).await;
        assert!(matches!(inv.error(), Some(ToolError::ExecutionFailed { .. })));
        assert!(inv.result_text().starts_with("tool failed: "));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tool_times_out() {
        let mut d = dispatcher(Duration::from_secs(2));
        let inv = d.invoke("slow", serde_json::json!({}), &CancellationToken::new()).await;
        assert_eq!(
            inv.error(),
            Some(&ToolError::Timeout { tool_name: "slow".into(), timeout_secs: 2 })
        );
    }

    #[tokio::test]
    async fn cancelled_invocation() {
        let mut d = dispatcher(Duration::from_secs(600));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let inv = d.invoke("slow", serde_json::json!({}), &cancel).await;
        assert_eq!(inv.error(), Some(&ToolError::Cancelled));
        assert_eq!(inv.result_text(), "tool failed: cancelled");
    }
}
