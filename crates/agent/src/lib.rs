//! The agent control loop for Codewright.
//!
//! The loop follows a **Decide → Invoke → Observe** cycle:
//!
//! 1. **Receive** a user question and append it to working memory
//! 2. **Decide** via the selection policy: answer, or call one tool
//! 3. **Invoke** the tool through the dispatcher and record the result
//! 4. **Loop** back to step 2 with the result in memory
//!
//! The loop ends when the policy answers, the per-question tool budget is
//! spent, or the turn is cancelled.

pub mod dispatcher;
pub mod memory;
pub mod policy;
pub mod prompts;
pub mod session;
pub mod token;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use dispatcher::ToolDispatcher;
pub use memory::WorkingMemory;
pub use policy::{parse_decision, Decision, ModelSelectionPolicy, SelectionError, SelectionPolicy};
pub use session::{AgentSession, AgentState, SessionId, TurnOutcome};
