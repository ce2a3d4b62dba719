//! Per-server session record and its lifecycle

use std::fmt;

use mcps_core::{McpError, McpResult, McpSession, ServerConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Lifecycle state of a server session
///
/// `Connecting -> Connected | Failed`, `Connected -> Failed | Closed`,
/// `Failed -> Closed` (teardown only). `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Connected,
    Failed,
    Closed,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        }
    }

    /// Whether a session in this state may move to `target`
    pub fn can_transition_to(self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, target),
            (Connecting, Connected)
                | (Connecting, Failed)
                | (Connecting, Closed)
                | (Connected, Failed)
                | (Connected, Closed)
                | (Failed, Closed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live or failed connection to one named server
pub struct ServerSession {
    config: ServerConfig,
    state: SessionState,
    handle: Option<Box<dyn McpSession>>,
    last_error: Option<String>,
}

impl ServerSession {
    pub(crate) fn connecting(config: ServerConfig) -> Self {
        Self {
            config,
            state: SessionState::Connecting,
            handle: None,
            last_error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Message of the failure that moved this session to `Failed`
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The transport handle, only while `Connected`
    pub(crate) fn handle(&self) -> Option<&dyn McpSession> {
        if self.is_connected() {
            self.handle.as_deref()
        } else {
            None
        }
    }

    fn transition(&mut self, target: SessionState) -> bool {
        if self.state.can_transition_to(target) {
            debug!("Server {}: {} -> {}", self.config.name, self.state, target);
            self.state = target;
            true
        } else {
            warn!(
                "Server {}: ignoring transition {} -> {}",
                self.config.name, self.state, target
            );
            false
        }
    }

    /// Record the outcome of a connection attempt
    pub(crate) fn finish_connect(
        &mut self,
        outcome: McpResult<Box<dyn McpSession>>,
    ) -> McpResult<()> {
        match outcome {
            Ok(handle) => {
                if self.transition(SessionState::Connected) {
                    self.handle = Some(handle);
                }
                Ok(())
            }
            Err(e) => {
                self.last_error = Some(e.to_string());
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    /// Release the transport. The session ends `Closed` even when the
    /// transport reports an error while shutting down.
    pub async fn close(&mut self) -> McpResult<()> {
        if self.state.is_terminal() {
            return Ok(());
        }

        let result = match self.handle.take() {
            Some(mut handle) => {
                match tokio::time::timeout(self.config.timeout(), handle.close()).await {
                    Ok(result) => result,
                    Err(_) => Err(McpError::Timeout {
                        operation: format!("closing session '{}'", self.config.name),
                        secs: self.config.timeout_secs,
                    }),
                }
            }
            None => Ok(()),
        };

        self.transition(SessionState::Closed);
        result
    }
}

impl fmt::Debug for ServerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSession")
            .field("name", &self.config.name)
            .field("url", &self.config.url)
            .field("transport", &self.config.transport)
            .field("state", &self.state)
            .field("last_error", &self.last_error)
            .finish()
    }
}
