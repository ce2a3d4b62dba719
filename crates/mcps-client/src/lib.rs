//! MCPS Client - multi-server Model Context Protocol client
//!
//! This crate keeps sessions to any number of MCP servers and presents
//! their tools as one catalog.
//!
//! # Features
//!
//! - **Transports**: SSE and streamable HTTP via `rmcp`
//! - **Session Lifecycle**: `Connecting -> Connected | Failed -> Closed`
//! - **Tool Catalog**: merged, atomically refreshed tool-to-server map
//! - **Dispatch**: per-server timeouts, failures returned as data
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mcps_client::McpClient;
//! use mcps_core::{ConfigSource, ServerConfig, TransportKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = McpClient::with_rmcp();
//!     client
//!         .add_server(
//!             "weather",
//!             ServerConfig::new("weather", "http://localhost:8001/mcp")
//!                 .with_transport(TransportKind::Http),
//!         )
//!         .await?;
//!
//!     for tool in client.all_tools() {
//!         println!("{} ({})", tool.name, tool.server);
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

mod catalog;
mod client;
mod dispatcher;
mod registry;
mod session;
mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use catalog::{CatalogSnapshot, RefreshReport, ToolCatalog, ToolCollision};
pub use client::{LoadReport, McpClient};
pub use dispatcher::ToolDispatcher;
pub use registry::{CloseReport, ConnectReport, ServerRegistry};
pub use session::{ServerSession, SessionState};
pub use transport::RmcpConnector;

// Re-export core types for convenience
pub use mcps_core::{
    ConfigSource, McpError, McpResult, ServerConfig, ServerSet, ToolCallResult, ToolDescriptor,
};
