//! Agent module - orchestration and conversation management
//!
//! Contains the turn logic that coordinates the chat model and tool providers,
//! plus the transcript, directive decoding and recap storage.

pub mod conversation;
pub mod directive;
pub mod orchestrator;
pub mod recap;

pub use conversation::Conversation;
pub use directive::{parse_reply, Reply, DIRECTIVE_KEY};
pub use orchestrator::{build_system_prompt, Orchestrator, Phase, TurnOutcome};
pub use recap::{RecapRecord, RecapStore};
