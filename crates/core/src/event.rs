//! Domain event system — decoupled observation of the agent loop.
//!
//! Events are published when something interesting happens in the system.
//! The CLI subscribes to show progress; tests subscribe to assert ordering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The selection policy produced a decision
    DecisionMade {
        session_id: String,
        /// "call_tool", "respond", or "failed"
        action: String,
        tool_name: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A tool invocation was recorded
    ToolInvoked {
        session_id: String,
        invocation_id: u64,
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A user turn finished
    TurnCompleted {
        session_id: String,
        /// "answered", "call_limit_reached", "fallback", or "cancelled"
        outcome: String,
        tool_calls: usize,
        timestamp: DateTime<Utc>,
    },

    /// A retrieval index build finished
    IndexBuilt {
        repository: String,
        scanned: usize,
        reused: usize,
        described: usize,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
