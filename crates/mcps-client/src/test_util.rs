//! In-process fakes for exercising the registry, catalog and dispatcher
//! without a network. Enabled for downstream crates by the `test-util`
//! feature.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mcps_core::{
    McpError, McpResult, McpSession, ServerConfig, SessionConnector, ToolDefinition, ToolResult,
};
use serde_json::{json, Value};

type Handler = Arc<dyn Fn(&str, &Value) -> McpResult<ToolResult> + Send + Sync>;

/// A scripted MCP server
#[derive(Clone)]
pub struct FakeServer {
    tools: Vec<ToolDefinition>,
    handler: Handler,
    discovery_error: Option<String>,
    call_delay: Option<Duration>,
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            handler: Arc::new(|name, _| Ok(ToolResult::text(format!("{} ok", name)))),
            discovery_error: None,
            call_delay: None,
        }
    }

    /// Advertise a tool with a permissive object schema
    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push(
            ToolDefinition::new(name, description)
                .with_schema(json!({"type": "object", "properties": {}})),
        );
        self
    }

    pub fn with_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &Value) -> McpResult<ToolResult> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// `list_tools` fails with this message
    pub fn failing_discovery(mut self, message: &str) -> Self {
        self.discovery_error = Some(message.to_string());
        self
    }

    /// Every `call_tool` sleeps before answering
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Arithmetic server exposing `add`, `subtract`, `multiply` and `divide`
    pub fn math() -> Self {
        let number = json!({"type": "number"});
        let schema = json!({
            "type": "object",
            "properties": {"a": number, "b": number},
            "required": ["a", "b"]
        });
        let mut server = Self::new();
        for (name, description) in [
            ("add", "Add two numbers"),
            ("subtract", "Subtract b from a"),
            ("multiply", "Multiply two numbers"),
            ("divide", "Divide a by b"),
        ] {
            server
                .tools
                .push(ToolDefinition::new(name, description).with_schema(schema.clone()));
        }
        server.with_handler(|name, args| {
            let a = args.get("a").and_then(Value::as_f64);
            let b = args.get("b").and_then(Value::as_f64);
            let (a, b) = match (a, b) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(ToolResult::error("Both 'a' and 'b' must be numbers.")),
            };
            let value = match name {
                "add" => a + b,
                "subtract" => a - b,
                "multiply" => a * b,
                "divide" if b == 0.0 => return Ok(ToolResult::error("Cannot divide by zero.")),
                "divide" => a / b,
                other => return Err(McpError::execution(other, "unknown tool")),
            };
            Ok(ToolResult::text(format_number(value)))
        })
    }
}

/// `30` rather than `30.0` for integral values
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Counters shared by a connector and every session it opened
#[derive(Debug, Default)]
pub struct FakeStats {
    connects: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeStats {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Names of the tools invoked, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// Connector that serves [`FakeServer`]s keyed by URL
#[derive(Default)]
pub struct FakeConnector {
    servers: HashMap<String, FakeServer>,
    unreachable: HashSet<String>,
    connect_delay: Option<Duration>,
    stats: Arc<FakeStats>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, url: &str, server: FakeServer) -> Self {
        self.servers.insert(url.to_string(), server);
        self
    }

    /// Connecting to `url` is refused
    pub fn with_unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(url.to_string());
        self
    }

    /// Every connection attempt sleeps before completing
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn stats(&self) -> Arc<FakeStats> {
        self.stats.clone()
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn connect(&self, config: &ServerConfig) -> McpResult<Box<dyn McpSession>> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.contains(&config.url) {
            return Err(McpError::connection(&config.name, "connection refused"));
        }
        let server = self
            .servers
            .get(&config.url)
            .cloned()
            .ok_or_else(|| McpError::connection(&config.name, "no server at url"))?;

        self.stats.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            server,
            stats: self.stats.clone(),
            open: true,
        }))
    }
}

struct FakeSession {
    server: FakeServer,
    stats: Arc<FakeStats>,
    open: bool,
}

#[async_trait]
impl McpSession for FakeSession {
    async fn list_tools(&self) -> McpResult<Vec<ToolDefinition>> {
        match &self.server.discovery_error {
            Some(message) => Err(McpError::connection("fake", message)),
            None => Ok(self.server.tools.clone()),
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolResult> {
        if let Ok(mut calls) = self.stats.calls.lock() {
            calls.push(name.to_string());
        }
        if let Some(delay) = self.server.call_delay {
            tokio::time::sleep(delay).await;
        }
        (self.server.handler)(name, &arguments)
    }

    async fn close(&mut self) -> McpResult<()> {
        if self.open {
            self.open = false;
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
