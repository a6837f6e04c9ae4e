//! Tools module - sessions against external tool providers
//!
//! Contains the provider session lifecycle, the transport seam with its MCP
//! stdio implementation, and catalog rendering.

pub mod catalog;
pub mod session;
pub mod stdio;
pub mod transport;

pub use catalog::{render_catalog, NO_TOOLS};
pub use session::ToolSession;
pub use stdio::StdioConnector;
pub use transport::{RemoteTool, ToolConnection, ToolConnector};
