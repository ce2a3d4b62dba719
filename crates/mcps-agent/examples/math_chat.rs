//! Chat with a model that can use a math MCP server
//!
//! Run with:
//! ```bash
//! export OPENAI_API_KEY=sk-...
//! cargo run --example math_chat -- "What is 15 multiplied by 3, then divided by 5?"
//! ```
//!
//! Expects an MCP server exposing arithmetic tools at
//! `http://localhost:8000/sse`.

use mcps_agent::prelude::*;
use mcps_core::ConfigSource;

const SERVERS: &str = r#"{"mcpServers": {"math_server": {"url": "http://localhost:8000/sse"}}}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is 15 multiplied by 3, then divided by 5?".to_string());

    let adapter = OpenAiAdapter::from_settings(&Settings::from_env())?;
    let answer = McpChatClient::open(adapter)
        .run(|client| {
            Box::pin(async move {
                let report = client.load(ConfigSource::infer(SERVERS)).await?;
                println!(
                    "Connected to {} of {} server(s), {} tool(s)",
                    report.connect.connected.len(),
                    report.servers,
                    report.refresh.tool_count
                );
                client.chat(&prompt).await
            })
        })
        .await?;

    println!("Response: {}", answer);
    Ok(())
}
