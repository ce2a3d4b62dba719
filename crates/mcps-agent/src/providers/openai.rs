//! OpenAI chat completions

use async_trait::async_trait;
use mcps_core::{ConversationMessage, Role, ToolCall, ToolDescriptor};
use serde_json::{json, Value};
use tracing::debug;

use crate::adapter::ModelAdapter;
use crate::errors::{AgentError, Result};
use crate::settings::Settings;
use crate::types::Usage;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Parsed chat completion
#[derive(Debug, Clone, Default)]
pub struct OpenAiReply {
    pub id: Option<String>,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

pub struct OpenAiAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: super::http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Adapter configured from `OPENAI_API_KEY` and `OPENAI_API_BASE`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let adapter = Self::new(settings.require_openai_key()?)?;
        Ok(match &settings.openai_api_base {
            Some(base) => adapter.with_api_base(base.clone()),
            None => adapter,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build the request body for `history`
    fn request_body(&self, history: &[ConversationMessage], tools: &Value) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": to_openai_messages(history),
        });
        if tools.as_array().is_some_and(|t| !t.is_empty()) {
            body["tools"] = tools.clone();
        }
        body
    }
}

/// Convert history to OpenAI message format
fn to_openai_messages(history: &[ConversationMessage]) -> Vec<Value> {
    history
        .iter()
        .map(|message| match message.role {
            Role::Assistant if !message.tool_calls.is_empty() => {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.name,
                                "arguments": call.arguments.to_string(),
                            }
                        })
                    })
                    .collect();
                let content = if message.content.is_empty() {
                    Value::Null
                } else {
                    json!(message.content)
                };
                json!({
                    "role": "assistant",
                    "content": content,
                    "tool_calls": calls,
                })
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": message.tool_call_id,
                "content": message.content,
            }),
            role => json!({
                "role": role.as_str(),
                "content": message.content,
            }),
        })
        .collect()
}

/// Parse a chat completion
fn parse_response(response: Value) -> Result<OpenAiReply> {
    let choice = response["choices"]
        .get(0)
        .ok_or_else(|| AgentError::ModelBehavior("No choices in response".to_string()))?;
    let message = &choice["message"];

    let content = message["content"]
        .as_str()
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"]
                .as_str()
                .ok_or_else(|| AgentError::ModelBehavior("Missing tool call id".to_string()))?;
            let function = &call["function"];
            let name = function["name"]
                .as_str()
                .ok_or_else(|| AgentError::ModelBehavior("Missing tool name".to_string()))?;
            let raw_args = function["arguments"].as_str().unwrap_or("{}");
            let arguments: Value = if raw_args.trim().is_empty() {
                json!({})
            } else {
                serde_json::from_str(raw_args).map_err(|e| {
                    AgentError::ModelBehavior(format!("Invalid arguments for {}: {}", name, e))
                })?
            };
            tool_calls.push(ToolCall::new(id, name, arguments));
        }
    }

    let usage = match response["usage"].as_object() {
        Some(u) => Usage {
            requests: 1,
            input_tokens: u["prompt_tokens"].as_u64().unwrap_or(0) as usize,
            output_tokens: u["completion_tokens"].as_u64().unwrap_or(0) as usize,
            total_tokens: u["total_tokens"].as_u64().unwrap_or(0) as usize,
        },
        None => Usage {
            requests: 1,
            ..Usage::default()
        },
    };

    Ok(OpenAiReply {
        id: response["id"].as_str().map(str::to_string),
        content,
        tool_calls,
        usage,
    })
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    type Response = OpenAiReply;

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn build_tool_schema(&self, tools: &[ToolDescriptor]) -> Value {
        Value::Array(
            tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.input_schema,
                        }
                    })
                })
                .collect(),
        )
    }

    async fn send(&self, history: &[ConversationMessage], tools: &Value) -> Result<OpenAiReply> {
        let body = self.request_body(history, tools);
        debug!("Calling LLM: {}", self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Model(format!(
                "LLM API error {}: {}",
                status, error_text
            )));
        }

        let response_json: Value = response.json().await?;
        debug!("LLM response: {:?}", response_json);

        parse_response(response_json)
    }

    fn extract_tool_calls(&self, response: &OpenAiReply) -> Vec<ToolCall> {
        response.tool_calls.clone()
    }

    fn final_text(&self, response: &OpenAiReply) -> String {
        response.content.clone().unwrap_or_default()
    }

    fn usage(&self, response: &OpenAiReply) -> Usage {
        response.usage
    }
}
