//! Core types shared by the client and the conversation layer

use crate::ToolCallError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tool as advertised by a server's `list_tools`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool on its server
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for input parameters
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object"}),
        }
    }

    /// Set the input schema
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Attach the owning server, producing a catalog entry
    pub fn owned_by(self, server: impl Into<String>) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name,
            description: self.description,
            input_schema: self.input_schema,
            server: server.into(),
        }
    }
}

/// Catalog entry: a tool plus the name of the server that owns it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Opaque to the core; handed to the model adapter unchanged
    pub input_schema: serde_json::Value,
    /// Name of the owning server
    ///
    /// Used to route tool calls to the correct session.
    pub server: String,
}

/// Raw result of a remote `call_tool`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content returned by the tool
    pub content: Vec<ContentBlock>,
    /// Whether the remote tool reported an error
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: content.into(),
            }],
            is_error: false,
        }
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Concatenated text of all text blocks
    pub fn joined_text(&self) -> String {
        join_text(&self.content)
    }
}

/// Content block in MCP responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },
    /// Image content (base64 encoded)
    Image { data: String, mime_type: String },
    /// Resource reference
    Resource { uri: String, text: Option<String> },
}

impl ContentBlock {
    /// Get text content if this is a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

fn join_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Resource { text, .. } => text.as_deref(),
            ContentBlock::Image { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of dispatching one tool call
///
/// Always produced, never raised: failures are carried in `error` so the
/// orchestrator can hand them back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Name of the tool that was requested
    pub tool: String,
    /// Server that handled the call, if the name resolved
    pub server: Option<String>,
    pub success: bool,
    /// Payload on success
    pub content: Vec<ContentBlock>,
    /// Failure on error
    #[serde(skip)]
    pub error: Option<ToolCallError>,
    /// Message preserved from the failure
    pub error_message: Option<String>,
}

impl ToolCallResult {
    /// Successful result
    pub fn success(
        tool: impl Into<String>,
        server: impl Into<String>,
        content: Vec<ContentBlock>,
    ) -> Self {
        Self {
            tool: tool.into(),
            server: Some(server.into()),
            success: true,
            content,
            error: None,
            error_message: None,
        }
    }

    /// Failed result
    pub fn failure(tool: impl Into<String>, server: Option<String>, error: ToolCallError) -> Self {
        Self {
            tool: tool.into(),
            server,
            success: false,
            content: Vec::new(),
            error_message: Some(error.to_string()),
            error: Some(error),
        }
    }

    /// Text handed back to the model: the content on success, the error
    /// message otherwise
    pub fn to_model_text(&self) -> String {
        if self.success {
            join_text(&self.content)
        } else {
            format!(
                "Error: {}",
                self.error_message.as_deref().unwrap_or("tool call failed")
            )
        }
    }
}

/// Role of a message in the conversation history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id used to pair the result with the request
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    /// Ordered tool calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// On tool messages: id of the call this result answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// On tool messages: name of the tool that produced the result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ConversationMessage {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Create a tool-result message answering `call`
    pub fn tool_result(call: &ToolCall, result: &ToolCallResult) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::plain(Role::Tool, result.to_model_text())
        }
    }
}
