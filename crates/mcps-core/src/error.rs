//! Error types for MCP operations
//!
//! The taxonomy mirrors where a failure is allowed to surface:
//! configuration problems abort a whole load, connection problems stay with
//! the server that caused them, and tool failures are turned into a
//! [`ToolCallResult`](crate::ToolCallResult) instead of being raised.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while resolving a configuration source into a
/// [`ServerSet`](crate::ServerSet)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file exists but could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid structured data
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// A server entry has no `url`
    #[error("Server '{0}' is missing a url")]
    MissingUrl(String),

    /// A server entry has the wrong shape (e.g. headers that are not strings)
    #[error("Invalid entry for server '{server}': {message}")]
    InvalidEntry { server: String, message: String },
}

/// Errors that can occur during MCP operations
#[derive(Debug, Error)]
pub enum McpError {
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A server failed to establish (or lost) its session
    #[error("Connection error ({server}): {message}")]
    ConnectionError { server: String, message: String },

    /// Tool not found in the catalog
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed on the remote side or in transit
    #[error("Tool execution failed: {tool} - {message}")]
    ToolExecutionFailed { tool: String, message: String },

    /// An operation exceeded the server's configured timeout
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },

    /// The session was already closed
    #[error("Session for server '{0}' is closed")]
    SessionClosed(String),
}

impl McpError {
    /// Shorthand for a connection error attributed to `server`
    pub fn connection(server: impl Into<String>, message: impl ToString) -> Self {
        McpError::ConnectionError {
            server: server.into(),
            message: message.to_string(),
        }
    }

    /// Shorthand for a tool execution error
    pub fn execution(tool: impl Into<String>, message: impl ToString) -> Self {
        McpError::ToolExecutionFailed {
            tool: tool.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;

/// Failure carried inside a [`ToolCallResult`](crate::ToolCallResult)
///
/// Unlike [`McpError`] this is cheap to clone and compare, because it travels
/// back into the conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolCallError {
    /// No server in the catalog owns the tool; no transport call was made
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// The owning server has no usable session
    #[error("Server '{server}' is not connected ({state})")]
    Unavailable { server: String, state: String },

    /// The transport failed or the remote tool reported an error
    #[error("Tool '{tool}' failed: {message}")]
    Execution { tool: String, message: String },

    /// The call did not finish within the server's timeout
    #[error("Tool '{tool}' timed out after {secs} seconds")]
    Timeout { tool: String, secs: u64 },
}

impl ToolCallError {
    /// Whether the failure happened before any transport call was attempted
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ToolCallError::NotFound(_) | ToolCallError::Unavailable { .. }
        )
    }
}
