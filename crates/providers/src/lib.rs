//! LLM Provider implementations for Codewright.
//!
//! All providers implement the `codewright_core::Provider` trait.
//! [`build_from_config`] selects the backend based on configuration.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
