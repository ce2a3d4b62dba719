//! Provider-neutral model capability used by the orchestrator

use std::fmt;

use async_trait::async_trait;
use mcps_core::{ConversationMessage, ToolCall, ToolDescriptor};
use serde_json::Value;

use crate::errors::Result;
use crate::types::Usage;

/// One LLM provider.
///
/// The orchestrator only talks to this trait: it asks for a tool schema
/// once per chat, sends the full history every round, and reads tool calls
/// and text back out of the provider's own response type.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    type Response: fmt::Debug + Send + Sync;

    /// Provider name, e.g. `openai`
    fn name(&self) -> &str;

    /// Model used for requests
    fn model(&self) -> &str;

    /// Provider-specific tool declarations for the catalog
    fn build_tool_schema(&self, tools: &[ToolDescriptor]) -> Value;

    async fn send(&self, history: &[ConversationMessage], tools: &Value) -> Result<Self::Response>;

    /// Tool calls requested by the response, in the order the model issued them
    fn extract_tool_calls(&self, response: &Self::Response) -> Vec<ToolCall>;

    /// Text of the response; empty when the model only requested tools
    fn final_text(&self, response: &Self::Response) -> String;

    fn usage(&self, _response: &Self::Response) -> Usage {
        Usage {
            requests: 1,
            ..Usage::default()
        }
    }
}
