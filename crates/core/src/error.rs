//! Error types for the Codewright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level [`Error`]
//! wraps them for startup paths that abort the process.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The top-level error type for Codewright operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Retrieval index errors ---
    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors raised by the tool registry, the dispatcher, and tool implementations.
///
/// Serializable because a failed [`crate::invocation::ToolInvocation`] keeps its
/// error as part of the audit record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    #[error("Tool already registered: {name}")]
    Duplicate { name: String },

    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Invalid tool arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("cancelled")]
    Cancelled,

    #[error("Tool call limit of {limit} reached for this question")]
    CallLimitReached { limit: usize },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },
}

impl ToolError {
    pub fn invalid_arguments(reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            reason: reason.into(),
        }
    }

    pub fn execution_failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    /// The description or embedding backend could not serve the request.
    #[error("Retrieval backend error: {0}")]
    Backend(#[from] ProviderError),

    #[error("Description cache at {path} is corrupted (line {line}): {reason}")]
    CacheCorrupted {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Failed to acquire build lock {path}: {reason}")]
    Lock { path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),
}
