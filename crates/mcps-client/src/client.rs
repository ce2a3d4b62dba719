//! Unified MCP client for multi-server orchestration
//!
//! [`McpClient`] owns a [`ServerRegistry`] and a [`ToolCatalog`] and keeps
//! them in step: every change to the set of servers is followed by a
//! catalog refresh, so the advertised tools always match the connected
//! servers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use mcps_core::{
    ConfigResolver, ConfigSource, McpResult, ResolverDefaults, ServerConfig,
    SessionConnector, ToolCallResult, ToolDescriptor,
};
use serde_json::Value;
use tracing::{error, info};

use crate::catalog::{RefreshReport, ToolCatalog};
use crate::dispatcher::ToolDispatcher;
use crate::registry::{CloseReport, ConnectReport, ServerRegistry};
use crate::transport::RmcpConnector;

/// Result of loading a server configuration
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Number of servers in the configuration
    pub servers: usize,
    pub connect: ConnectReport,
    pub refresh: RefreshReport,
}

/// Multi-server MCP client
///
/// # Example
///
/// ```rust,no_run
/// use mcps_client::McpClient;
/// use mcps_core::ConfigSource;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut client = McpClient::with_rmcp();
/// client.load(ConfigSource::infer("mcp-servers.json")).await?;
///
/// let result = client.call_tool("add", serde_json::json!({"a": 10, "b": 20})).await;
/// println!("{}", result.to_model_text());
///
/// client.close().await;
/// # Ok(())
/// # }
/// ```
pub struct McpClient {
    resolver: ConfigResolver,
    registry: ServerRegistry,
    catalog: ToolCatalog,
    call_count: AtomicUsize,
}

impl McpClient {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            resolver: ConfigResolver::default(),
            registry: ServerRegistry::new(connector),
            catalog: ToolCatalog::new(),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Client that talks to real servers over SSE or streamable HTTP
    pub fn with_rmcp() -> Self {
        Self::new(Arc::new(RmcpConnector::new()))
    }

    pub fn with_defaults(mut self, defaults: ResolverDefaults) -> Self {
        self.resolver = ConfigResolver::new(defaults);
        self
    }

    /// Resolve `source` and connect every server in it.
    ///
    /// A configuration error aborts before anything connects. Connection
    /// failures do not: they are listed in the report and the healthy
    /// servers stay usable.
    pub async fn load(&mut self, source: ConfigSource) -> McpResult<LoadReport> {
        let servers = self.resolver.resolve(source)?;
        let started = Instant::now();
        info!("[START] load_servers: {} server(s)", servers.len());

        let connect = self.registry.add_all(&servers).await;
        for (name, e) in &connect.failed {
            error!("Server {} unavailable: {}", name, e);
        }
        let refresh = self.catalog.refresh(&self.registry).await;
        info!(
            "[END] load_servers: {} connected, {} tool(s) ({:.3}ms)",
            connect.connected.len(),
            refresh.tool_count,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(LoadReport {
            servers: servers.len(),
            connect,
            refresh,
        })
    }

    /// Connect one server and refresh the catalog. The catalog is refreshed
    /// even when the connection fails, since a same-named server may have
    /// been replaced.
    pub async fn add_server(&mut self, name: &str, config: ServerConfig) -> McpResult<()> {
        let result = self.registry.add(name, config).await.map(|_| ());
        self.catalog.refresh(&self.registry).await;
        result
    }

    pub async fn remove_server(&mut self, name: &str) -> McpResult<()> {
        let result = self.registry.remove(name).await;
        self.catalog.refresh(&self.registry).await;
        result
    }

    pub async fn refresh_tools(&mut self) -> RefreshReport {
        self.catalog.refresh(&self.registry).await
    }

    /// Union of the tools of every connected server
    pub fn all_tools(&self) -> &[ToolDescriptor] {
        self.catalog.all_tools()
    }

    /// Server that owns `tool`
    pub fn server_for(&self, tool: &str) -> McpResult<&str> {
        self.catalog.resolve(tool)
    }

    pub fn dispatcher(&self) -> ToolDispatcher<'_> {
        ToolDispatcher::new(&self.catalog, &self.registry)
    }

    /// Execute a tool on its owning server. Never fails; see
    /// [`ToolDispatcher::call`].
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        let number = self.call_count.fetch_add(1, Ordering::Relaxed) + 1;
        info!("#{} Tool called: {}({})", number, name, arguments);

        let started = Instant::now();
        let result = self.dispatcher().call(name, arguments).await;
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;

        if result.success {
            info!("#{} Tool result: {} ({:.3}ms)", number, result.to_model_text(), elapsed);
        } else {
            error!(
                "#{} Tool error: {} ({:.3}ms)",
                number,
                result.error_message.as_deref().unwrap_or("unknown"),
                elapsed
            );
        }
        result
    }

    /// Number of tool calls made so far
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn registry(&self) -> &ServerRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Close every session. The catalog is emptied afterwards.
    pub async fn close(&mut self) -> CloseReport {
        let report = self.registry.close_all().await;
        self.catalog.refresh(&self.registry).await;
        report
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("servers", &self.registry.names())
            .field("tools", &self.catalog.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::test_util::{FakeConnector, FakeServer};
    use mcps_core::{ConfigError, McpError, ToolCallError};
    use serde_json::json;

    fn two_server_connector() -> FakeConnector {
        FakeConnector::new()
            .with_server("http://localhost:8000/sse", FakeServer::math())
            .with_server(
                "http://localhost:8001/mcp",
                FakeServer::new()
                    .with_tool("get_alerts", "Weather alerts for a US state")
                    .with_tool("get_forecast", "Forecast for a location"),
            )
    }

    fn two_server_config() -> Value {
        json!({
            "mcpServers": {
                "math": {"url": "http://localhost:8000/sse"},
                "weather": {"url": "http://localhost:8001/mcp", "transport": "http"}
            }
        })
    }

    #[tokio::test]
    async fn test_load_exposes_union_of_tools() {
        let mut client = McpClient::new(Arc::new(two_server_connector()));
        let report = client
            .load(ConfigSource::Mapping(two_server_config()))
            .await
            .unwrap();

        assert_eq!(report.servers, 2);
        assert!(report.connect.all_connected());
        assert_eq!(client.all_tools().len(), 6);
        assert_eq!(client.server_for("get_forecast").unwrap(), "weather");

        let result = client.call_tool("add", json!({"a": 10, "b": 20})).await;
        assert_eq!(result.to_model_text(), "30");
        assert_eq!(client.call_count(), 1);
        client.close().await;
    }

    #[tokio::test]
    async fn test_calls_reach_only_known_tools() {
        let connector = two_server_connector();
        let stats = connector.stats();
        let mut client = McpClient::new(Arc::new(connector));
        client
            .load(ConfigSource::Mapping(two_server_config()))
            .await
            .unwrap();

        client.call_tool("get_alerts", json!({"state": "CA"})).await;
        let missing = client.call_tool("nonexistent", json!({})).await;
        client.call_tool("multiply", json!({"a": 6, "b": 7})).await;

        assert_eq!(missing.error, Some(ToolCallError::NotFound("nonexistent".into())));
        assert_eq!(stats.calls(), vec!["get_alerts".to_string(), "multiply".to_string()]);
        assert_eq!(client.call_count(), 3);
        client.close().await;
    }

    #[tokio::test]
    async fn test_config_error_aborts_load() {
        let mut client = McpClient::new(Arc::new(two_server_connector()));
        let err = client
            .load(ConfigSource::Mapping(json!({"mcpServers": {"math": {}}})))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::Config(ConfigError::MissingUrl(ref s)) if s == "math"));
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_does_not_block_others() {
        let connector = FakeConnector::new()
            .with_server("http://localhost:8000/sse", FakeServer::math())
            .with_unreachable("http://localhost:8001/mcp");
        let mut client = McpClient::new(Arc::new(connector));
        let report = client
            .load(ConfigSource::Mapping(two_server_config()))
            .await
            .unwrap();

        assert_eq!(report.connect.failed.len(), 1);
        assert_eq!(client.all_tools().len(), 4);
        assert_eq!(client.registry().state("weather"), Some(SessionState::Failed));
        client.close().await;
    }

    #[tokio::test]
    async fn test_remove_server_drops_its_tools() {
        let mut client = McpClient::new(Arc::new(two_server_connector()));
        client
            .load(ConfigSource::Mapping(two_server_config()))
            .await
            .unwrap();

        client.remove_server("math").await.unwrap();
        assert_eq!(client.all_tools().len(), 2);
        let result = client.call_tool("add", json!({"a": 1, "b": 2})).await;
        assert_eq!(result.error, Some(ToolCallError::NotFound("add".into())));
        client.close().await;
    }

    #[tokio::test]
    async fn test_add_server_refreshes_catalog() {
        let mut client = McpClient::new(Arc::new(two_server_connector()));
        client
            .add_server("math", ServerConfig::new("math", "http://localhost:8000/sse"))
            .await
            .unwrap();
        assert_eq!(client.all_tools().len(), 4);
        assert!(!client.catalog().is_stale(client.registry()));

        let err = client
            .add_server("math", ServerConfig::new("math", "http://nowhere/sse"))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ConnectionError { .. }));
        assert!(client.all_tools().is_empty());
        client.close().await;
    }

    #[tokio::test]
    async fn test_close_empties_catalog() {
        let mut client = McpClient::new(Arc::new(two_server_connector()));
        client
            .load(ConfigSource::Mapping(two_server_config()))
            .await
            .unwrap();

        let report = client.close().await;
        assert!(report.is_clean());
        assert!(client.all_tools().is_empty());
        assert!(client
            .registry()
            .sessions()
            .iter()
            .all(|s| s.state() == SessionState::Closed));
    }
}
