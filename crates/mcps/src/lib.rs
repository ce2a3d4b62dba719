//! # MCPS - multi-server Model Context Protocol orchestration
//!
//! This crate provides a unified interface to the MCPS crates:
//!
//! - **Core types and traits** (`mcps-core`) - configuration, errors, tool types
//! - **Client** (`mcps-client`) - sessions, tool catalog and dispatch
//! - **Agent** (`mcps-agent`) - model adapters and the conversation loop
//!
//! ## Features
//!
//! - `agent` (default) - Include model adapters and [`McpChatClient`]
//! - `cli` (default) - Build the `mcps` binary
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcps::{ConfigSource, McpClient};
//!
//! # async fn demo() -> Result<(), mcps::McpError> {
//! let mut client = McpClient::with_rmcp();
//! let report = client
//!     .load(ConfigSource::infer(
//!         r#"{"mcpServers": {"math_server": {"url": "http://localhost:8000/sse"}}}"#,
//!     ))
//!     .await?;
//! println!("{} tool(s)", report.refresh.tool_count);
//!
//! let result = client.call_tool("add", serde_json::json!({"a": 10, "b": 20})).await;
//! assert_eq!(result.to_model_text(), "30");
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub use mcps_client as client;
pub use mcps_core as core;

#[cfg(feature = "agent")]
pub use mcps_agent as agent;

pub use mcps_client::{
    CloseReport, LoadReport, McpClient, RmcpConnector, ServerRegistry, SessionState, ToolCatalog,
    ToolDispatcher,
};
pub use mcps_core::{
    ConfigError, ConfigResolver, ConfigSource, McpError, McpResult, ServerConfig, ServerSet,
    ToolCallError, ToolCallResult, ToolDescriptor, TransportKind,
};

#[cfg(feature = "agent")]
pub use mcps_agent::{
    AgentError, ChatOptions, GeminiAdapter, McpChatClient, ModelAdapter, OpenAiAdapter, Settings,
};
