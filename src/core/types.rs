//! Shared types used across Toolbridge modules
//!
//! Contains conversation turns, tool descriptors, invocation requests and results.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// One declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub description: Option<String>,
    pub required: bool,
}

/// A tool discovered on a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Logical name of the provider that exposes the tool
    pub provider: String,
    /// Tool name as the provider knows it
    pub name: String,
    /// Human description
    pub description: String,
    /// Parameters keyed by name, in schema order
    pub parameters: IndexMap<String, ParamSpec>,
}

impl ToolDescriptor {
    /// Build a descriptor from a JSON-schema `inputSchema` object
    pub fn from_schema(
        provider: impl Into<String>,
        name: impl Into<String>,
        description: Option<String>,
        schema: &Value,
    ) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let parameters = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(param, spec)| {
                        let description = spec
                            .get("description")
                            .and_then(Value::as_str)
                            .filter(|d| !d.is_empty())
                            .map(str::to_string);
                        let spec = ParamSpec {
                            description,
                            required: required.contains(&param.as_str()),
                        };
                        (param.clone(), spec)
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            provider: provider.into(),
            name: name.into(),
            description: description.unwrap_or_default(),
            parameters,
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Logical provider name
    pub server: String,
    /// Tool to call on that provider
    pub tool: String,
    /// Arguments passed through unvalidated
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Result of executing a tool on a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Name of the tool that was executed
    pub tool: String,
    /// False when the provider flagged the result as an error
    pub success: bool,
    /// Text content of the result
    pub output: String,
    /// Raw provider payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    /// Create a result the provider marked as failed
    pub fn failure(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: false,
            output: error.into(),
            data: None,
        }
    }

    /// Attach the raw provider payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}
