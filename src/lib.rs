//! Toolbridge - conversational front-end for MCP tool providers
//!
//! Runs a chat loop against a hosted chat-completions model and lets the
//! model call tools exposed by local MCP servers spawned as subprocesses.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, logging and error handling
//! - **LLM**: Chat-completions client and answer extraction
//! - **Tools**: Provider sessions over the MCP stdio transport
//! - **Agent**: Turn orchestration, transcript and recap storage
//! - **CLI**: REPL and slash commands
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolbridge::{ChatCompletionsClient, Config, Orchestrator, ProviderSet, StdioConnector, ToolSession};
//!
//! #[tokio::main]
//! async fn main() -> toolbridge::Result<()> {
//!     let config = Config::load()?;
//!     let llm = ChatCompletionsClient::from_config(&config.llm, &config.llm.api_key()?)?;
//!
//!     let connector = Arc::new(StdioConnector::default());
//!     let sessions = ProviderSet::load(&config.tools.config_file)?
//!         .into_iter()
//!         .map(|p| ToolSession::new(p, connector.clone(), config.tools.retry_policy()))
//!         .collect();
//!
//!     let mut agent = Orchestrator::new(Box::new(llm), sessions);
//!     agent.initialize().await?;
//!     let turn = agent.process_turn("What files are in my home directory?").await;
//!     agent.shutdown().await;
//!     println!("{}", turn?.answer);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;
pub mod tools;

// Re-export commonly used items
pub use agent::{Orchestrator, RecapStore, TurnOutcome};
pub use cli::Repl;
pub use core::{BridgeError, Config, ProviderSet, Result};
pub use llm::{ChatCompletionsClient, ChatModel};
pub use tools::{StdioConnector, ToolSession};
