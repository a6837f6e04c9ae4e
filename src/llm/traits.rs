//! Chat model trait for abstracting different backends
//!
//! The orchestrator only needs one operation from a model: turn a transcript
//! into the next assistant reply.

use async_trait::async_trait;

use crate::core::Message;

/// Reply returned whenever the model cannot be reached or answers unusably
pub const FALLBACK_REPLY: &str = "I encountered an error, please check system log for more details. \
Please try again or rephrase your request.";

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

/// Trait for chat models
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce the assistant reply for a transcript.
    ///
    /// Total by contract: failures degrade to [`FALLBACK_REPLY`].
    async fn chat(&self, messages: &[Message]) -> String;

    /// Release the underlying client. Safe to call more than once.
    async fn cleanup(&mut self);

    /// Get the model name
    fn name(&self) -> &str;
}

/// Whether a reply is the degraded fallback rather than model output
pub fn is_fallback(reply: &str) -> bool {
    reply == FALLBACK_REPLY
}
