//! LLM module - Language Model integrations
//!
//! Provides the chat model abstraction and an OpenAI-compatible
//! chat-completions implementation.

pub mod completions;
pub mod extract;
pub mod traits;

pub use completions::ChatCompletionsClient;
pub use extract::extract_answer;
pub use traits::{is_fallback, ChatModel, TokenUsage, FALLBACK_REPLY};
