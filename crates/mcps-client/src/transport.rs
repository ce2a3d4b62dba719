//! rmcp-backed sessions for the `sse` and `http` transports
//!
//! Both transports run over a `reqwest::Client` that carries the configured
//! headers as default headers, so authentication is simply forwarded.

use async_trait::async_trait;
use mcps_core::{
    ContentBlock, McpError, McpResult, McpSession, ServerConfig, SessionConnector,
    ToolDefinition, ToolResult, TransportKind,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use rmcp::model::{CallToolRequestParam, CallToolResult, RawContent};
use rmcp::service::RunningService;
use rmcp::transport::sse_client::SseClientConfig;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{SseClientTransport, StreamableHttpClientTransport};
use rmcp::{RoleClient, ServiceExt};
use serde_json::Value;
use tracing::debug;

type ClientService = RunningService<RoleClient, ()>;

/// Opens real MCP sessions with `rmcp`
#[derive(Debug, Clone, Default)]
pub struct RmcpConnector;

impl RmcpConnector {
    pub fn new() -> Self {
        Self
    }

    fn http_client(&self, config: &ServerConfig) -> McpResult<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .default_headers(header_map(config)?)
            .build()
            .map_err(|e| McpError::connection(&config.name, format!("build HTTP client: {}", e)))
    }
}

fn header_map(config: &ServerConfig) -> McpResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            McpError::connection(&config.name, format!("invalid header name '{}': {}", key, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            McpError::connection(&config.name, format!("invalid value for header '{}': {}", key, e))
        })?;
        headers.insert(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl SessionConnector for RmcpConnector {
    async fn connect(&self, config: &ServerConfig) -> McpResult<Box<dyn McpSession>> {
        let http_client = self.http_client(config)?;

        let service: ClientService = match config.transport {
            TransportKind::Sse => {
                let sse_config = SseClientConfig {
                    sse_endpoint: config.url.clone().into(),
                    ..Default::default()
                };
                let transport = SseClientTransport::start_with_client(http_client, sse_config)
                    .await
                    .map_err(|e| {
                        McpError::connection(&config.name, format!("create SSE transport: {}", e))
                    })?;

                ().serve(transport).await.map_err(|e| {
                    McpError::connection(&config.name, format!("initialize SSE client: {}", e))
                })?
            }
            TransportKind::Http => {
                let transport = StreamableHttpClientTransport::with_client(
                    http_client,
                    StreamableHttpClientTransportConfig::with_uri(config.url.clone()),
                );

                ().serve(transport).await.map_err(|e| {
                    McpError::connection(&config.name, format!("initialize HTTP client: {}", e))
                })?
            }
        };

        debug!(
            "Session established with {} at {} ({})",
            config.name, config.url, config.transport
        );

        Ok(Box::new(RmcpSession {
            server: config.name.clone(),
            service: Some(service),
        }))
    }
}

/// One running rmcp client service
struct RmcpSession {
    server: String,
    service: Option<ClientService>,
}

impl RmcpSession {
    fn service(&self) -> McpResult<&ClientService> {
        self.service
            .as_ref()
            .ok_or_else(|| McpError::SessionClosed(self.server.clone()))
    }
}

#[async_trait]
impl McpSession for RmcpSession {
    async fn list_tools(&self) -> McpResult<Vec<ToolDefinition>> {
        let raw_tools = self
            .service()?
            .list_all_tools()
            .await
            .map_err(|e| McpError::connection(&self.server, format!("list tools: {}", e)))?;

        Ok(raw_tools
            .into_iter()
            .map(|t| ToolDefinition {
                name: t.name.to_string(),
                description: t.description.map(|d| d.to_string()).unwrap_or_default(),
                input_schema: Value::Object((*t.input_schema).clone()),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> McpResult<ToolResult> {
        let arguments = match arguments {
            Value::Object(map) => Some(map),
            Value::Null => None,
            other => {
                return Err(McpError::execution(
                    name,
                    format!("arguments must be a JSON object, got {}", other),
                ))
            }
        };

        let result = self
            .service()?
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(|e| McpError::execution(name, e))?;

        Ok(convert_call_result(result))
    }

    async fn close(&mut self) -> McpResult<()> {
        if let Some(service) = self.service.take() {
            service
                .cancel()
                .await
                .map_err(|e| McpError::connection(&self.server, format!("close: {}", e)))?;
        }
        Ok(())
    }
}

/// Map an rmcp result into core content blocks. Anything that is neither
/// text nor image is kept as its JSON form so nothing is silently dropped.
fn convert_call_result(result: CallToolResult) -> ToolResult {
    let mut content: Vec<ContentBlock> = result
        .content
        .iter()
        .map(|c| match &c.raw {
            RawContent::Text(t) => ContentBlock::Text {
                text: t.text.clone(),
            },
            RawContent::Image(image) => ContentBlock::Image {
                data: image.data.clone(),
                mime_type: image.mime_type.clone(),
            },
            other => ContentBlock::Text {
                text: serde_json::to_string(other).unwrap_or_default(),
            },
        })
        .collect();

    if content.is_empty() {
        if let Some(structured) = result.structured_content {
            content.push(ContentBlock::Text {
                text: structured.to_string(),
            });
        }
    }

    ToolResult {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}
