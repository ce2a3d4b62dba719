//! Loading servers from files and talking to them through the facade

use std::io::Write;
use std::sync::Arc;

use mcps::client::test_util::{FakeConnector, FakeServer};
use mcps::{
    ConfigError, ConfigResolver, ConfigSource, McpClient, McpError, ServerConfig, ServerSet,
    SessionState, ToolCallError, TransportKind,
};
use serde_json::json;
use tempfile::NamedTempFile;

const MATH_JSON: &str = r#"{"mcpServers": {"math_server": {"url": "http://localhost:8000/sse"}}}"#;

fn write_config(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn math_connector() -> Arc<FakeConnector> {
    Arc::new(FakeConnector::new().with_server("http://localhost:8000/sse", FakeServer::math()))
}

#[tokio::test]
async fn add_ten_and_twenty_from_config_file() {
    let file = write_config(".json", MATH_JSON);
    let mut client = McpClient::new(math_connector());

    let report = client
        .load(ConfigSource::FilePath(file.path().to_path_buf()))
        .await
        .unwrap();
    assert_eq!(report.servers, 1);

    let result = client.call_tool("add", json!({"a": 10, "b": 20})).await;
    assert!(result.success);
    assert_eq!(result.server.as_deref(), Some("math_server"));
    assert_eq!(result.to_model_text(), "30");
    client.close().await;
}

#[test]
fn every_source_form_resolves_identically() {
    let toml_file = write_config(
        ".toml",
        r#"
[mcpServers.math_server]
url = "http://localhost:8000/sse"

[mcpServers.weather]
url = "http://localhost:8001/mcp"
transport = "HTTP"
timeout = 10
headers = { Authorization = "Bearer abc" }
"#,
    );
    let mapping = json!({
        "mcpServers": {
            "math_server": {"url": "http://localhost:8000/sse", "transport": "carrier-pigeon"},
            "weather": {
                "url": "http://localhost:8001/mcp",
                "transport": "http",
                "timeout": 10,
                "headers": {"Authorization": "Bearer abc"}
            }
        }
    });
    let prebuilt: ServerSet = [
        ServerConfig::new("math_server", "http://localhost:8000/sse"),
        ServerConfig::new("weather", "http://localhost:8001/mcp")
            .with_transport(TransportKind::Http)
            .with_timeout_secs(10)
            .with_header("Authorization", "Bearer abc"),
    ]
    .into_iter()
    .collect();

    let resolver = ConfigResolver::default();
    let from_toml = resolver
        .resolve(ConfigSource::FilePath(toml_file.path().to_path_buf()))
        .unwrap();
    let from_text = resolver.resolve(ConfigSource::RawText(mapping.to_string())).unwrap();
    let from_mapping = resolver.resolve(ConfigSource::Mapping(mapping)).unwrap();
    let passed_through = resolver.resolve(ConfigSource::Resolved(prebuilt.clone())).unwrap();

    assert_eq!(from_toml, prebuilt);
    assert_eq!(from_text, prebuilt);
    assert_eq!(from_mapping, prebuilt);
    assert_eq!(passed_through, prebuilt);
}

#[tokio::test]
async fn missing_file_is_a_config_error() {
    let mut client = McpClient::new(math_connector());
    let err = client
        .load(ConfigSource::infer("/definitely/not/here/mcp-servers.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, McpError::Config(ConfigError::NotFound(_))));
}

#[tokio::test]
async fn close_after_partial_setup_closes_everything() {
    let connector = Arc::new(
        FakeConnector::new()
            .with_server("http://localhost:8000/sse", FakeServer::math())
            .with_server(
                "http://localhost:8002/sse",
                FakeServer::new().with_tool("echo", "Echo the input"),
            )
            .with_unreachable("http://localhost:8001/mcp"),
    );
    let stats = connector.stats();
    let mut client = McpClient::new(connector);
    client
        .load(ConfigSource::Mapping(json!({"mcpServers": {
            "math_server": {"url": "http://localhost:8000/sse"},
            "weather": {"url": "http://localhost:8001/mcp", "transport": "http"},
            "echo": {"url": "http://localhost:8002/sse"}
        }})))
        .await
        .unwrap();
    assert_eq!(client.registry().connected_count(), 2);
    assert_eq!(client.all_tools().len(), 5);

    let report = client.close().await;
    assert!(report.is_clean());
    assert_eq!(stats.closes(), 2);
    assert!(client
        .registry()
        .sessions()
        .iter()
        .all(|s| s.state() == SessionState::Closed));

    let after = client.call_tool("add", json!({"a": 1, "b": 2})).await;
    assert_eq!(after.error, Some(ToolCallError::NotFound("add".into())));
}
