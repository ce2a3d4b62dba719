//! Scoped chat client: servers, catalog and conversation under one owner

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use mcps_client::{CloseReport, LoadReport, McpClient};
use mcps_core::{
    ConfigSource, ConversationMessage, McpResult, ServerConfig, SessionConnector, ToolCallResult,
    ToolDescriptor,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::adapter::ModelAdapter;
use crate::errors::Result;
use crate::orchestrator::{ChatOptions, ConversationOrchestrator};
use crate::types::Usage;

/// An MCP client paired with a model.
///
/// Prefer [`McpChatClient::run`], which closes every session when the
/// closure finishes, fails or panics.
///
/// # Example
///
/// ```rust,no_run
/// use mcps_agent::{McpChatClient, OpenAiAdapter};
/// use mcps_core::ConfigSource;
///
/// # async fn demo() -> mcps_agent::Result<()> {
/// let adapter = OpenAiAdapter::new("sk-...")?;
/// let answer = McpChatClient::open(adapter)
///     .run(|client| {
///         Box::pin(async move {
///             client
///                 .load(ConfigSource::infer(
///                     r#"{"mcpServers": {"math_server": {"url": "http://localhost:8000/sse"}}}"#,
///                 ))
///                 .await?;
///             client.chat("What is 15 multiplied by 3, then divided by 5?").await
///         })
///     })
///     .await?;
/// println!("{}", answer);
/// # Ok(())
/// # }
/// ```
pub struct McpChatClient<A: ModelAdapter> {
    mcp: McpClient,
    orchestrator: ConversationOrchestrator<A>,
}

impl<A: ModelAdapter> McpChatClient<A> {
    /// Client that reaches servers over the network
    pub fn open(adapter: A) -> Self {
        Self::from_parts(McpClient::with_rmcp(), adapter)
    }

    pub fn with_connector(adapter: A, connector: Arc<dyn SessionConnector>) -> Self {
        Self::from_parts(McpClient::new(connector), adapter)
    }

    pub fn from_parts(mcp: McpClient, adapter: A) -> Self {
        Self {
            mcp,
            orchestrator: ConversationOrchestrator::new(adapter),
        }
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.orchestrator = self.orchestrator.with_options(options);
        self
    }

    pub async fn load(&mut self, source: ConfigSource) -> McpResult<LoadReport> {
        self.mcp.load(source).await
    }

    pub async fn add_server(&mut self, name: &str, config: ServerConfig) -> McpResult<()> {
        self.mcp.add_server(name, config).await
    }

    pub async fn remove_server(&mut self, name: &str) -> McpResult<()> {
        self.mcp.remove_server(name).await
    }

    pub fn all_tools(&self) -> &[ToolDescriptor] {
        self.mcp.all_tools()
    }

    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        self.mcp.call_tool(name, arguments).await
    }

    pub async fn chat(&mut self, input: &str) -> Result<String> {
        self.orchestrator.chat(&self.mcp, input).await
    }

    pub fn history(&self) -> &[ConversationMessage] {
        self.orchestrator.history()
    }

    pub fn usage(&self) -> Usage {
        self.orchestrator.usage()
    }

    pub fn adapter(&self) -> &A {
        self.orchestrator.adapter()
    }

    pub fn mcp(&self) -> &McpClient {
        &self.mcp
    }

    pub async fn close(&mut self) -> CloseReport {
        self.mcp.close().await
    }

    /// Run `f` with this client, then close it.
    ///
    /// Sessions are closed exactly once whatever `f` does; a panic inside
    /// `f` is resumed after teardown.
    pub async fn run<T, F>(mut self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Self) -> BoxFuture<'c, Result<T>>,
    {
        let outcome = AssertUnwindSafe(f(&mut self)).catch_unwind().await;

        let report = self.close().await;
        for (server, e) in &report.errors {
            warn!("Error closing server {}: {}", server, e);
        }
        info!("Client closed ({} session(s))", report.closed);

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
