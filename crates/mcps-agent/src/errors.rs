//! Error types for the conversation layer

use mcps_core::McpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Max turns exceeded: {0}")]
    MaxTurnsExceeded(usize),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Model behavior error: {0}")]
    ModelBehavior(String),

    #[error("Agent configuration error: {0}")]
    Configuration(String),

    #[error("Chat cancelled")]
    Cancelled,

    #[error(transparent)]
    Mcp(#[from] McpError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl AgentError {
    /// Whether the failure came from the upstream model call
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            AgentError::Model(_)
                | AgentError::ModelBehavior(_)
                | AgentError::Http(_)
                | AgentError::JsonParse(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_classification() {
        assert!(AgentError::Model("503".into()).is_model_error());
        assert!(AgentError::ModelBehavior("no choices".into()).is_model_error());
        assert!(!AgentError::MaxTurnsExceeded(10).is_model_error());
        assert!(!AgentError::Configuration("no key".into()).is_model_error());
    }

    #[test]
    fn test_mcp_error_is_transparent() {
        let err: AgentError = McpError::ToolNotFound("add".into()).into();
        assert_eq!(err.to_string(), "Tool not found: add");
    }
}
