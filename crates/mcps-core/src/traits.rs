//! Session capabilities consumed by the orchestration layer
//!
//! The wire protocol lives behind these traits: the registry only ever asks a
//! [`SessionConnector`] for a session and then talks to it through
//! [`McpSession`].

use async_trait::async_trait;

use crate::{McpResult, ServerConfig, ToolDefinition, ToolResult};

/// A live, stateful connection to one MCP server
#[async_trait]
pub trait McpSession: Send + Sync {
    /// List all tools the server advertises
    async fn list_tools(&self) -> McpResult<Vec<ToolDefinition>>;

    /// Call a tool by name with JSON arguments
    ///
    /// A tool that ran but failed is reported through
    /// [`ToolResult::is_error`]; `Err` is reserved for transport failures.
    async fn call_tool(&self, name: &str, arguments: serde_json::Value)
        -> McpResult<ToolResult>;

    /// Close the connection. Calling it twice is not an error.
    async fn close(&mut self) -> McpResult<()>;
}

/// Opens sessions for server definitions
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Establish and initialize a session using the config's transport and
    /// headers. Timeouts are enforced by the caller.
    async fn connect(&self, config: &ServerConfig) -> McpResult<Box<dyn McpSession>>;
}
