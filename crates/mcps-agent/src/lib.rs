//! MCPS Agent - tool-calling conversations over MCP servers
//!
//! This crate connects an LLM provider to the tools of every configured MCP
//! server: the model sees the merged catalog, its tool calls are dispatched
//! to the owning servers, and results are fed back until it answers.
//!
//! # Example
//!
//! ```no_run
//! use mcps_agent::{GeminiAdapter, McpChatClient, Settings};
//! use mcps_core::ConfigSource;
//!
//! #[tokio::main]
//! async fn main() -> mcps_agent::Result<()> {
//!     let settings = Settings::from_env();
//!     let adapter = GeminiAdapter::from_settings(&settings)?;
//!     let path = settings.mcp_servers_path.clone();
//!
//!     let answer = McpChatClient::open(adapter)
//!         .run(|client| {
//!             Box::pin(async move {
//!                 client.load(ConfigSource::FilePath(path)).await?;
//!                 client.chat("What is 15 multiplied by 3, then divided by 5?").await
//!             })
//!         })
//!         .await?;
//!     println!("Response: {}", answer);
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod client;
pub mod errors;
pub mod orchestrator;
pub mod providers;
pub mod settings;
pub mod types;

pub use adapter::ModelAdapter;
pub use client::McpChatClient;
pub use errors::{AgentError, Result};
pub use orchestrator::{
    ChatOptions, ConversationOrchestrator, TurnState, DEFAULT_MAX_TURNS, REACT_SYSTEM_PROMPT,
};
pub use providers::{GeminiAdapter, GeminiReply, OpenAiAdapter, OpenAiReply};
pub use settings::Settings;
pub use types::Usage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::{
        AgentError, ChatOptions, ConversationOrchestrator, GeminiAdapter, McpChatClient,
        ModelAdapter, OpenAiAdapter, Settings, Usage,
    };
}
