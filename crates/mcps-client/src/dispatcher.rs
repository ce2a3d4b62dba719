//! Routes a tool call to the server that owns the tool

use std::time::Instant;

use mcps_core::{ToolCallError, ToolCallResult};
use serde_json::Value;
use tracing::{debug, warn};

use crate::catalog::ToolCatalog;
use crate::registry::ServerRegistry;

/// Borrowed view over a catalog and registry that executes tool calls.
///
/// `call` never fails: every outcome, including unknown tools, is reported
/// as a [`ToolCallResult`] so it can be shown to the model.
#[derive(Clone, Copy)]
pub struct ToolDispatcher<'a> {
    catalog: &'a ToolCatalog,
    registry: &'a ServerRegistry,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(catalog: &'a ToolCatalog, registry: &'a ServerRegistry) -> Self {
        Self { catalog, registry }
    }

    pub async fn call(&self, name: &str, arguments: Value) -> ToolCallResult {
        let started = Instant::now();

        let server = match self.catalog.resolve(name) {
            Ok(server) => server.to_string(),
            Err(_) => {
                warn!("Tool {} is not in the catalog", name);
                return ToolCallResult::failure(name, None, ToolCallError::NotFound(name.into()));
            }
        };

        let session = match self.registry.get(&server) {
            Some(session) => session,
            None => {
                return ToolCallResult::failure(
                    name,
                    Some(server.clone()),
                    ToolCallError::Unavailable {
                        server,
                        state: "removed".into(),
                    },
                );
            }
        };

        let handle = match session.handle() {
            Some(handle) => handle,
            None => {
                let state = session.state().to_string();
                warn!("Tool {} routed to server {} in state {}", name, server, state);
                return ToolCallResult::failure(
                    name,
                    Some(server.clone()),
                    ToolCallError::Unavailable { server, state },
                );
            }
        };

        let timeout = session.config().timeout();
        let result = match tokio::time::timeout(timeout, handle.call_tool(name, arguments)).await {
            Ok(Ok(output)) if output.is_error => ToolCallResult::failure(
                name,
                Some(server.clone()),
                ToolCallError::Execution {
                    tool: name.into(),
                    message: output.joined_text(),
                },
            ),
            Ok(Ok(output)) => ToolCallResult::success(name, server.clone(), output.content),
            Ok(Err(e)) => ToolCallResult::failure(
                name,
                Some(server.clone()),
                ToolCallError::Execution {
                    tool: name.into(),
                    message: e.to_string(),
                },
            ),
            Err(_) => ToolCallResult::failure(
                name,
                Some(server.clone()),
                ToolCallError::Timeout {
                    tool: name.into(),
                    secs: session.config().timeout_secs,
                },
            ),
        };

        debug!(
            "Tool {} on server {} finished in {}ms (success: {})",
            name,
            server,
            started.elapsed().as_millis(),
            result.success
        );
        result
    }
}
