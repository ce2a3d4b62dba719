//! End-to-end conversations against in-process servers

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mcps_agent::{AgentError, ChatOptions, McpChatClient, ModelAdapter, Result};
use mcps_client::test_util::{FakeConnector, FakeServer};
use mcps_core::{ConfigSource, ConversationMessage, Role, ToolCall, ToolDescriptor};
use serde_json::{json, Value};

/// Model double: replays scripted turns and records every tool schema it saw
struct Script {
    turns: Mutex<VecDeque<Vec<(&'static str, Value)>>>,
    schemas: Arc<Mutex<Vec<Value>>>,
}

impl Script {
    fn new(turns: Vec<Vec<(&'static str, Value)>>) -> Self {
        Self {
            turns: Mutex::new(turns.into()),
            schemas: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl ModelAdapter for Script {
    type Response = Vec<ToolCall>;

    fn name(&self) -> &str {
        "script"
    }

    fn model(&self) -> &str {
        "script-1"
    }

    fn build_tool_schema(&self, tools: &[ToolDescriptor]) -> Value {
        json!(tools.iter().map(|t| &t.name).collect::<Vec<_>>())
    }

    async fn send(&self, _history: &[ConversationMessage], tools: &Value) -> Result<Vec<ToolCall>> {
        self.schemas.lock().unwrap().push(tools.clone());
        let turn = self.turns.lock().unwrap().pop_front().unwrap_or_default();
        Ok(turn
            .into_iter()
            .enumerate()
            .map(|(i, (name, args))| ToolCall::new(format!("call_{}", i), name, args))
            .collect())
    }

    fn extract_tool_calls(&self, response: &Vec<ToolCall>) -> Vec<ToolCall> {
        response.clone()
    }

    fn final_text(&self, response: &Vec<ToolCall>) -> String {
        if response.is_empty() {
            "done".to_string()
        } else {
            String::new()
        }
    }
}

const TWO_SERVERS: &str = r#"{"mcpServers": {
    "math_server": {"url": "http://localhost:8000/sse"},
    "weather": {"url": "http://localhost:8001/mcp", "transport": "http", "timeout": 5}
}}"#;

fn weather() -> FakeServer {
    FakeServer::new()
        .with_tool("get_alerts", "Get weather alerts for a US state")
        .with_tool("get_forecast", "Get weather forecast for a location")
        .with_handler(|name, args| {
            Ok(mcps_core::ToolResult::text(format!(
                "{} for {}",
                name,
                args["state"].as_str().unwrap_or("?")
            )))
        })
}

#[tokio::test]
async fn disjoint_servers_expose_union_and_route_calls() {
    let connector = FakeConnector::new()
        .with_server("http://localhost:8000/sse", FakeServer::math())
        .with_server("http://localhost:8001/mcp", weather());
    let script = Script::new(vec![
        vec![("add", json!({"a": 10, "b": 20})), ("get_alerts", json!({"state": "CA"}))],
        vec![],
    ]);
    let schemas = script.schemas.clone();
    let mut client = McpChatClient::with_connector(script, Arc::new(connector))
        .with_options(ChatOptions::new().without_system_prompt());

    client.load(ConfigSource::infer(TWO_SERVERS)).await.unwrap();
    assert_eq!(client.all_tools().len(), 6);

    client.chat("go").await.unwrap();
    let results: Vec<(&str, &str)> = client
        .history()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| (m.name.as_deref().unwrap_or(""), m.content.as_str()))
        .collect();
    assert_eq!(results, vec![("add", "30"), ("get_alerts", "get_alerts for CA")]);

    let seen = schemas.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].as_array().unwrap().len(), 6);
    drop(seen);

    client.close().await;
}

#[tokio::test]
async fn unreachable_server_leaves_healthy_tools_usable() {
    let connector = FakeConnector::new()
        .with_server("http://localhost:8000/sse", FakeServer::math())
        .with_unreachable("http://localhost:8001/mcp");
    let mut client =
        McpChatClient::with_connector(Script::new(vec![vec![("multiply", json!({"a": 15, "b": 3}))]]), Arc::new(connector));

    let report = client.load(ConfigSource::infer(TWO_SERVERS)).await.unwrap();
    assert_eq!(report.connect.connected, vec!["math_server".to_string()]);
    assert_eq!(report.connect.failed[0].0, "weather");

    let result = client.call_tool("get_alerts", json!({"state": "CA"})).await;
    assert!(!result.success);

    assert_eq!(client.chat("15 * 3").await.unwrap(), "done");
    assert_eq!(client.history().last().unwrap().content, "done");
    client.close().await;
}

#[tokio::test(start_paused = true)]
async fn slow_tool_times_out_and_conversation_continues() {
    let connector = FakeConnector::new()
        .with_server("http://localhost:8000/sse", FakeServer::math())
        .with_server(
            "http://localhost:8001/mcp",
            weather().with_call_delay(Duration::from_secs(60)),
        );
    let script = Script::new(vec![
        vec![("get_forecast", json!({"state": "WA"}))],
        vec![("add", json!({"a": 1, "b": 2}))],
    ]);

    let answer = McpChatClient::with_connector(script, Arc::new(connector))
        .run(|client| {
            Box::pin(async move {
                client.load(ConfigSource::infer(TWO_SERVERS)).await?;
                let answer = client.chat("forecast please").await?;
                let tool_messages: Vec<&str> = client
                    .history()
                    .iter()
                    .filter(|m| m.role == Role::Tool)
                    .map(|m| m.content.as_str())
                    .collect();
                assert_eq!(
                    tool_messages,
                    vec!["Error: Tool 'get_forecast' timed out after 5 seconds", "3"]
                );
                Ok(answer)
            })
        })
        .await
        .unwrap();

    assert_eq!(answer, "done");
}

#[tokio::test]
async fn max_turns_surfaces_to_caller() {
    let connector = FakeConnector::new().with_server("http://localhost:8000/sse", FakeServer::math());
    let turns = (0..5).map(|_| vec![("add", json!({"a": 1, "b": 1}))]).collect();
    let mut client = McpChatClient::with_connector(Script::new(turns), Arc::new(connector))
        .with_options(ChatOptions::new().with_max_turns(3));
    client
        .load(ConfigSource::infer(r#"{"mcpServers": {"math_server": {"url": "http://localhost:8000/sse"}}}"#))
        .await
        .unwrap();

    let err = client.chat("again and again").await.unwrap_err();
    assert!(matches!(err, AgentError::MaxTurnsExceeded(3)));
    assert_eq!(client.mcp().call_count(), 3);
    let tool_results = client.history().iter().filter(|m| m.role == Role::Tool).count();
    assert_eq!(tool_results, 3);
    assert_eq!(client.history()[1].content, "again and again");
    client.close().await;
}
