//! MCP stdio transport
//!
//! Uses the `rmcp` SDK to spawn a provider as a child process and speak MCP
//! over its standard input/output.

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
    PaginatedRequestParam, ProtocolVersion, RawContent, ResourceContents,
};
use rmcp::service::RunningService;
use rmcp::transport::TokioChildProcess;
use rmcp::{ClientHandler, RoleClient};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info};

use crate::core::{BridgeError, Result, ToolProviderConfig, ToolResult};
use crate::tools::transport::{RemoteTool, ToolConnection, ToolConnector};

#[derive(Clone)]
struct BridgeClientHandler {
    info: ClientInfo,
}

impl ClientHandler for BridgeClientHandler {
    fn get_info(&self) -> ClientInfo {
        self.info.clone()
    }
}

/// Spawns providers as child processes speaking MCP over stdio
#[derive(Debug, Clone)]
pub struct StdioConnector {
    client_name: String,
    client_version: String,
}

impl StdioConnector {
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            client_version: client_version.into(),
        }
    }

    fn client_info(&self) -> ClientInfo {
        ClientInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ClientCapabilities::default(),
            client_info: Implementation {
                name: self.client_name.clone(),
                title: None,
                version: self.client_version.clone(),
                icons: None,
                website_url: None,
            },
        }
    }
}

impl Default for StdioConnector {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl ToolConnector for StdioConnector {
    async fn connect(&self, config: &ToolProviderConfig) -> Result<Box<dyn ToolConnection>> {
        let mut command = Command::new(&config.command);
        command.args(&config.args).envs(&config.env);

        let transport = TokioChildProcess::new(command)
            .map_err(|e| BridgeError::init(&config.name, format!("spawn failed: {}", e)))?;

        let handler = BridgeClientHandler {
            info: self.client_info(),
        };
        let service = rmcp::serve_client(handler, transport)
            .await
            .map_err(|e| BridgeError::init(&config.name, format!("handshake failed: {}", e)))?;

        if let Some(server) = service.peer().peer_info() {
            info!(
                provider = %config.name,
                server = %server.server_info.name,
                version = %server.server_info.version,
                "connected to tool provider"
            );
        }

        Ok(Box::new(StdioConnection {
            provider: config.name.clone(),
            service: Some(service),
        }))
    }
}

/// A running MCP client session over a child process
pub struct StdioConnection {
    provider: String,
    service: Option<RunningService<RoleClient, BridgeClientHandler>>,
}

impl StdioConnection {
    fn service(&self) -> Result<&RunningService<RoleClient, BridgeClientHandler>> {
        self.service
            .as_ref()
            .ok_or_else(|| BridgeError::NotInitialized(self.provider.clone()))
    }
}

#[async_trait]
impl ToolConnection for StdioConnection {
    async fn list_tools(&mut self) -> Result<Vec<RemoteTool>> {
        let service = self.service()?;
        let mut tools = Vec::new();
        let mut cursor = None;

        loop {
            let page = service
                .peer()
                .list_tools(Some(PaginatedRequestParam { cursor }))
                .await
                .map_err(|e| BridgeError::Other(format!("tools/list failed: {}", e)))?;

            tools.extend(page.tools.into_iter().map(|tool| RemoteTool {
                name: tool.name.to_string(),
                description: tool.description.map(|d| d.to_string()),
                input_schema: Value::Object((*tool.input_schema).clone()),
            }));

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(tools)
    }

    async fn call_tool(&mut self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult> {
        let service = self.service()?;
        let result = service
            .peer()
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: Some(arguments),
            })
            .await
            .map_err(|e| BridgeError::Other(format!("tools/call failed: {}", e)))?;

        Ok(map_tool_result(name, result))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(service) = self.service.take() {
            let reason = service
                .cancel()
                .await
                .map_err(|e| BridgeError::with_context(format!("stopping {}", self.provider), e))?;
            debug!(provider = %self.provider, ?reason, "tool provider stopped");
        }
        Ok(())
    }
}

fn map_tool_result(tool: &str, result: CallToolResult) -> ToolResult {
    let data = serde_json::to_value(&result).ok();

    let mut texts: Vec<String> = result
        .content
        .into_iter()
        .map(|content| match content.raw {
            RawContent::Text(text) => text.text,
            RawContent::Resource(embedded) => match embedded.resource {
                ResourceContents::TextResourceContents { text, .. } => text,
                ResourceContents::BlobResourceContents { uri, .. } => format!("[blob] {}", uri),
            },
            RawContent::ResourceLink(link) => format!("[resource_link] {}", link.uri),
            RawContent::Image(image) => format!("[image] {}", image.mime_type),
            RawContent::Audio(audio) => format!("[audio] {}", audio.mime_type),
        })
        .collect();

    if texts.is_empty() {
        if let Some(value) = result.structured_content {
            texts.push(value.to_string());
        }
    }

    let output = texts.join("\n");
    let mapped = if result.is_error.unwrap_or(false) {
        ToolResult::failure(tool, output)
    } else {
        ToolResult::success(tool, output)
    };

    match data {
        Some(data) => mapped.with_data(data),
        None => mapped,
    }
}
