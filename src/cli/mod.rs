//! CLI module - interactive front-end
//!
//! Contains the REPL and slash-command handling.

pub mod commands;
pub mod repl;

pub use commands::{handle_command, is_exit, CommandResult};
pub use repl::Repl;
