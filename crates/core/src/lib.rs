//! # Codewright Core
//!
//! Domain types, traits, and error definitions for the Codewright codebase
//! assistant. This crate has **no I/O of its own** — it defines the domain
//! model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator is a trait here: the model backend ([`Provider`]), the
//! tools ([`Tool`]), and the retrieval seams ([`Describer`], [`Embedder`]).
//! Implementations live in their respective crates, and tests swap in
//! scripted stand-ins.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;
pub mod invocation;
pub mod turn;
pub mod retrieval;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, IndexError, ProviderError, Result, ToolError};
pub use message::{Message, Role};
pub use provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{ParamKind, ParamSpec, Tool, ToolArgs, ToolDefinition, ToolOutput, ToolRegistry, ToolSpec};
pub use invocation::{InvocationOutcome, ToolInvocation};
pub use turn::{ConversationTurn, TurnKind};
pub use retrieval::{Describer, Embedder, RetrievalEntry, ScoredEntry};
pub use event::{DomainEvent, EventBus};
