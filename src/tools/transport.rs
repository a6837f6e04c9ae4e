//! Transport seam between a tool session and its provider process
//!
//! A [`ToolConnector`] launches a provider and completes the handshake; the
//! resulting [`ToolConnection`] is owned by exactly one session.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::{Result, ToolProviderConfig, ToolResult};

/// A tool as reported by the provider, before it is bound to a provider name
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

/// Launches a provider and performs the protocol handshake
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self, config: &ToolProviderConfig) -> Result<Box<dyn ToolConnection>>;
}

/// A live connection to one provider
#[async_trait]
pub trait ToolConnection: Send {
    /// Full tool catalog of the provider
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>>;

    /// Call one tool. `Err` means the round-trip failed; a provider-side
    /// error result comes back as `Ok` with `success == false`.
    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult>;

    /// Terminate the provider and release its pipes
    async fn close(&mut self) -> Result<()>;
}
