//! Tool session - one provider subprocess and its discovered tools
//!
//! Lifecycle: uninitialized -> `initialize()` -> ready -> `cleanup()` -> closed.
//! The connection lives behind a single async mutex, so teardown never runs
//! twice at once and never overlaps an in-flight call.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::{
    BridgeError, InvokeError, Result, RetryPolicy, ToolDescriptor, ToolProviderConfig, ToolResult,
};
use crate::tools::transport::{ToolConnection, ToolConnector};

#[derive(Default)]
struct SessionState {
    connection: Option<Box<dyn ToolConnection>>,
    tools: Vec<ToolDescriptor>,
}

/// Owns one subprocess-backed tool provider
pub struct ToolSession {
    config: ToolProviderConfig,
    connector: Arc<dyn ToolConnector>,
    retry: RetryPolicy,
    state: Mutex<SessionState>,
}

impl ToolSession {
    /// Create an uninitialized session; nothing is spawned yet
    pub fn new(
        config: ToolProviderConfig,
        connector: Arc<dyn ToolConnector>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config,
            connector,
            retry,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Logical provider name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Whether a live connection is held
    pub async fn is_ready(&self) -> bool {
        self.state.lock().await.connection.is_some()
    }

    /// Launch the provider, handshake, and discover its tools once.
    ///
    /// On any failure the partially-opened connection is torn down before the
    /// error is returned.
    pub async fn initialize(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.connection.is_some() {
            return Err(BridgeError::AlreadyInitialized(self.name().to_string()));
        }

        let mut connection = match self.connector.connect(&self.config).await {
            Ok(connection) => connection,
            Err(e) => {
                error!(provider = %self.name(), error = %e, "provider initialization failed");
                Self::teardown(self.name(), &mut state).await;
                return Err(match e {
                    BridgeError::Init { .. } => e,
                    other => BridgeError::init(self.name(), other),
                });
            }
        };

        let remote = match connection.list_tools().await {
            Ok(remote) => remote,
            Err(e) => {
                error!(provider = %self.name(), error = %e, "tool discovery failed");
                state.connection = Some(connection);
                Self::teardown(self.name(), &mut state).await;
                return Err(BridgeError::init(self.name(), e));
            }
        };

        state.tools = remote
            .into_iter()
            .map(|tool| {
                ToolDescriptor::from_schema(
                    self.name(),
                    tool.name,
                    tool.description,
                    &tool.input_schema,
                )
            })
            .collect();
        state.connection = Some(connection);

        info!(provider = %self.name(), tools = state.tools.len(), "tool provider ready");
        Ok(())
    }

    /// Tools discovered at initialize time
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        let state = self.state.lock().await;
        if state.connection.is_none() {
            return Err(BridgeError::NotInitialized(self.name().to_string()));
        }
        Ok(state.tools.clone())
    }

    /// Call a tool, retrying round-trip failures up to the retry bound.
    ///
    /// Arguments are passed through unvalidated; the provider owns the schema.
    pub async fn invoke(&self, tool: &str, arguments: Map<String, Value>) -> Result<ToolResult> {
        let mut state = self.state.lock().await;
        let connection = state
            .connection
            .as_mut()
            .ok_or_else(|| BridgeError::NotInitialized(self.name().to_string()))?;

        let mut last_cause = String::new();
        for attempt in 1..=self.retry.max_attempts {
            debug!(provider = %self.config.name, tool, attempt, "executing tool");
            match connection.call_tool(tool, arguments.clone()).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    warn!(provider = %self.config.name, tool, attempt, error = %e, "tool call failed");
                    last_cause = e.to_string();
                    if attempt < self.retry.max_attempts && !self.retry.delay.is_zero() {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }

        error!(
            provider = %self.config.name,
            tool,
            attempts = self.retry.max_attempts,
            "tool call exhausted its attempts"
        );
        Err(InvokeError {
            tool: tool.to_string(),
            attempts: self.retry.max_attempts,
            last_cause,
        }
        .into())
    }

    /// Release the connection and the process. Idempotent; never fails.
    pub async fn cleanup(&self) {
        let mut state = self.state.lock().await;
        Self::teardown(self.name(), &mut state).await;
    }

    async fn teardown(name: &str, state: &mut SessionState) {
        state.tools.clear();
        if let Some(mut connection) = state.connection.take() {
            if let Err(e) = connection.close().await {
                error!(provider = %name, error = %e, "failed to clean up provider");
            } else {
                debug!(provider = %name, "provider closed");
            }
        }
    }
}
