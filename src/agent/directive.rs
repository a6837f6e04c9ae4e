//! Tool-call directive decoding
//!
//! The only place model output is trusted to have a shape. A reply either
//! decodes into validated invocation requests or is treated as prose.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::core::{BridgeError, Result, ToolInvocationRequest};

/// Key under which the model lists its tool calls
pub const DIRECTIVE_KEY: &str = "mcptools";

/// What a model reply asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The reply is the final answer for this turn
    Answer,
    /// The reply requests one or more tool calls
    Invocations(Vec<ToolInvocationRequest>),
}

#[derive(Deserialize)]
struct RawInvocation {
    server: String,
    tool: String,
    #[serde(default)]
    arguments: Option<Value>,
}

impl TryFrom<RawInvocation> for ToolInvocationRequest {
    type Error = BridgeError;

    fn try_from(raw: RawInvocation) -> Result<Self> {
        let arguments = match raw.arguments {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(BridgeError::InvalidDirective(format!(
                    "arguments for {}.{} must be an object, got {}",
                    raw.server, raw.tool, other
                )))
            }
        };

        Ok(ToolInvocationRequest {
            server: raw.server,
            tool: raw.tool,
            arguments,
        })
    }
}

/// Classify a model reply
pub fn parse_reply(reply: &str) -> Result<Reply> {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(reply) else {
        return Ok(Reply::Answer);
    };

    let Some(entries) = object.remove(DIRECTIVE_KEY) else {
        return Ok(Reply::Answer);
    };

    let raw: Vec<RawInvocation> = serde_json::from_value(entries)
        .map_err(|e| BridgeError::InvalidDirective(e.to_string()))?;

    if raw.is_empty() {
        return Ok(Reply::Answer);
    }

    let requests = raw
        .into_iter()
        .map(ToolInvocationRequest::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(Reply::Invocations(requests))
}
