//! Google Gemini `generateContent`
//!
//! Gemini has no tool call ids and no `tool` role: calls get generated ids,
//! and results travel back as `functionResponse` parts in a user turn.

use async_trait::async_trait;
use mcps_core::{ConversationMessage, Role, ToolCall, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::adapter::ModelAdapter;
use crate::errors::{AgentError, Result};
use crate::settings::Settings;
use crate::types::Usage;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Parsed Gemini candidate
#[derive(Debug, Clone, Default)]
pub struct GeminiReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<String>,
    pub usage: Usage,
}

pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: super::http_client()?,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Adapter configured from `GEMINI_API_KEY`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.require_gemini_key()?)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn to_gemini_request(&self, history: &[ConversationMessage], tools: &Value) -> GeminiRequest {
        let system_text: Vec<&str> = history
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let system_instruction = if system_text.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: system_text.join("\n\n"),
                }],
            })
        };

        let tools = match serde_json::from_value::<Vec<GeminiTools>>(tools.clone()) {
            Ok(tools) if tools.iter().any(|t| !t.function_declarations.is_empty()) => Some(tools),
            _ => None,
        };

        GeminiRequest {
            contents: to_gemini_contents(history),
            tools,
            system_instruction,
        }
    }
}

/// Convert history to Gemini contents. Consecutive tool results are merged
/// into one user turn so they answer the preceding model turn together.
fn to_gemini_contents(history: &[ConversationMessage]) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in history {
        match message.role {
            Role::System => {}
            Role::User => contents.push(GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart::Text {
                    text: message.content.clone(),
                }],
            }),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(GeminiPart::Text {
                        text: message.content.clone(),
                    });
                }
                for call in &message.tool_calls {
                    parts.push(GeminiPart::FunctionCall {
                        function_call: GeminiFunctionCall {
                            name: call.name.clone(),
                            args: call.arguments.clone(),
                        },
                    });
                }
                contents.push(GeminiContent {
                    // Gemini uses "model" instead of "assistant"
                    role: Some("model".to_string()),
                    parts,
                });
            }
            Role::Tool => {
                let part = GeminiPart::FunctionResponse {
                    function_response: GeminiFunctionResponse {
                        name: message.name.clone().unwrap_or_default(),
                        response: json!({"result": message.content}),
                    },
                };
                match contents.last_mut() {
                    Some(last)
                        if last.role.as_deref() == Some("user")
                            && last
                                .parts
                                .iter()
                                .all(|p| matches!(p, GeminiPart::FunctionResponse { .. })) =>
                    {
                        last.parts.push(part)
                    }
                    _ => contents.push(GeminiContent {
                        role: Some("user".to_string()),
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    contents
}

fn from_gemini_response(response: GeminiResponse) -> Result<GeminiReply> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::ModelBehavior("Gemini returned no candidates".to_string()))?;

    let mut text = Vec::new();
    let mut tool_calls = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        match part {
            GeminiPart::Text { text: t } if !t.is_empty() => text.push(t),
            GeminiPart::Text { .. } => {}
            GeminiPart::FunctionCall { function_call } => {
                // Gemini doesn't provide tool call ids
                let id = format!("gemini_{}_{}", function_call.name, Uuid::new_v4());
                let args = if function_call.args.is_null() {
                    json!({})
                } else {
                    function_call.args
                };
                tool_calls.push(ToolCall::new(id, function_call.name, args));
            }
            GeminiPart::FunctionResponse { .. } => {}
        }
    }

    let usage = match response.usage_metadata {
        Some(u) => Usage {
            requests: 1,
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        },
        None => Usage {
            requests: 1,
            ..Usage::default()
        },
    };

    Ok(GeminiReply {
        text: text.join(""),
        tool_calls,
        finish_reason: candidate.finish_reason,
        usage,
    })
}

#[async_trait]
impl ModelAdapter for GeminiAdapter {
    type Response = GeminiReply;

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn build_tool_schema(&self, tools: &[ToolDescriptor]) -> Value {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.input_schema,
                })
            })
            .collect();
        json!([{ "functionDeclarations": declarations }])
    }

    async fn send(&self, history: &[ConversationMessage], tools: &Value) -> Result<GeminiReply> {
        let request = self.to_gemini_request(history, tools);
        debug!("Sending request to Gemini API: {}", self.model);

        let response = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AgentError::Model(format!(
                "Gemini API error {}: {}",
                status, error_body
            )));
        }

        let gemini_response: GeminiResponse = response.json().await?;
        debug!("Received response: {:?}", gemini_response);

        from_gemini_response(gemini_response)
    }

    fn extract_tool_calls(&self, response: &GeminiReply) -> Vec<ToolCall> {
        response.tool_calls.clone()
    }

    fn final_text(&self, response: &GeminiReply) -> String {
        response.text.clone()
    }

    fn usage(&self, response: &GeminiReply) -> Usage {
        response.usage
    }
}

// Gemini API types

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    // "user" or "model"; absent on system instructions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: GeminiFunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: GeminiFunctionResponse,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiTools {
    #[serde(rename = "functionDeclarations", default)]
    function_declarations: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcps_core::{ContentBlock, ToolCallResult, ToolDefinition};

    fn adapter() -> GeminiAdapter {
        GeminiAdapter::new("test-key").unwrap()
    }

    #[test]
    fn test_defaults() {
        let adapter = adapter();
        assert_eq!(adapter.name(), "gemini");
        assert_eq!(adapter.model(), "gemini-2.5-flash");
        assert_eq!(adapter.with_model("gemini-pro").model(), "gemini-pro");
    }

    #[test]
    fn test_endpoint_carries_no_key() {
        let endpoint = adapter().with_base_url("http://localhost:9/v1beta/").endpoint();
        assert_eq!(endpoint, "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent");
    }

    #[tokio::test]
    async fn test_transport_error_does_not_leak_key() {
        let adapter = GeminiAdapter::new("secret-gemini-key")
            .unwrap()
            .with_base_url("http://127.0.0.1:9/v1beta");
        let err = adapter
            .send(&[ConversationMessage::user("hi")], &json!([]))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Http(_)));
        assert!(!err.to_string().contains("secret-gemini-key"));
        assert!(!format!("{:?}", err).contains("secret-gemini-key"));
    }

    #[test]
    fn test_tool_schema_uses_function_declarations() {
        let tools = vec![ToolDefinition::new("get_alerts", "Weather alerts")
            .with_schema(json!({"type": "object", "properties": {"state": {"type": "string"}}}))
            .owned_by("weather")];
        let schema = adapter().build_tool_schema(&tools);
        let declaration = &schema[0]["functionDeclarations"][0];
        assert_eq!(declaration["name"], "get_alerts");
        assert_eq!(declaration["parameters"]["properties"]["state"]["type"], "string");
    }

    #[test]
    fn test_request_maps_roles_and_results() {
        let adapter = adapter();
        let sub = ToolCall::new("1", "sub", json!({"a": 5, "b": 2}));
        let mul = ToolCall::new("2", "mul", json!({"a": 3, "b": 4}));
        let text = |t: &str| vec![ContentBlock::Text { text: t.into() }];
        let history = vec![
            ConversationMessage::system("be brief"),
            ConversationMessage::user("compute"),
            ConversationMessage::assistant_with_calls("", vec![sub.clone(), mul.clone()]),
            ConversationMessage::tool_result(&sub, &ToolCallResult::success("sub", "math", text("3"))),
            ConversationMessage::tool_result(&mul, &ToolCallResult::success("mul", "math", text("12"))),
        ];
        let tools = adapter.build_tool_schema(&[]);

        let body = serde_json::to_value(adapter.to_gemini_request(&history, &tools)).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(body.get("tools").is_none());

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "sub");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["name"], "sub");
        assert_eq!(contents[2]["parts"][0]["functionResponse"]["response"]["result"], "3");
        assert_eq!(contents[2]["parts"][1]["functionResponse"]["name"], "mul");
    }

    #[test]
    fn test_parse_function_calls_get_ids() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [
                    {"functionCall": {"name": "multiply", "args": {"a": 15, "b": 3}}},
                    {"functionCall": {"name": "divide", "args": {"a": 45, "b": 5}}}
                ]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 30, "candidatesTokenCount": 10, "totalTokenCount": 40}
        }))
        .unwrap();

        let reply = from_gemini_response(response).unwrap();
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].name, "multiply");
        assert!(reply.tool_calls[0].id.starts_with("gemini_multiply_"));
        assert_ne!(reply.tool_calls[0].id, reply.tool_calls[1].id);
        assert_eq!(reply.usage.total_tokens, 40);
        assert!(reply.text.is_empty());
    }

    #[test]
    fn test_parse_text_answer() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "The result is 9."}]}}]
        }))
        .unwrap();
        let reply = from_gemini_response(response).unwrap();
        assert!(reply.tool_calls.is_empty());
        assert_eq!(adapter().final_text(&reply), "The result is 9.");
    }

    #[test]
    fn test_no_candidates_is_model_behavior_error() {
        let response: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        assert!(matches!(
            from_gemini_response(response),
            Err(AgentError::ModelBehavior(_))
        ));
    }
}
