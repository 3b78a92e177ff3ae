//! Token estimation for the conversation window.
//!
//! Character heuristic: about 4 characters per token, rounded up. Close
//! enough for BPE tokenizers on English text and code to size a prompt.

use codewright_core::message::Message;

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Estimate tokens for one message, including ~4 tokens of role and
/// delimiter overhead on the wire.
pub fn estimate_message_tokens(message: &Message) -> usize {
    4 + estimate_tokens(&message.content)
}

pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
