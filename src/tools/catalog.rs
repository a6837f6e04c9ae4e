//! Tool catalog rendering for the system prompt

use std::fmt::Write as _;

use crate::core::ToolDescriptor;

/// Placeholder used when no provider exposes any tool
pub const NO_TOOLS: &str = "No Tool Available.";

/// Render one descriptor as a prompt block
pub fn render_tool(tool: &ToolDescriptor) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Server: {}", tool.provider);
    let _ = writeln!(out, "Tool: {}", tool.name);
    let _ = writeln!(out, "Description: {}", tool.description);

    if tool.parameters.is_empty() {
        out.push_str("Params: none\n");
        return out;
    }

    out.push_str("Params:\n");
    for (name, spec) in &tool.parameters {
        let _ = write!(out, "  - {}", name);
        if let Some(description) = &spec.description {
            let _ = write!(out, ": {}", description);
        }
        if spec.required {
            out.push_str(" (required)");
        }
        out.push('\n');
    }
    out
}

/// Render every descriptor, or the placeholder if there are none
pub fn render_catalog(tools: &[ToolDescriptor]) -> String {
    if tools.is_empty() {
        return NO_TOOLS.to_string();
    }

    tools
        .iter()
        .map(render_tool)
        .collect::<Vec<_>>()
        .join("\n")
}
