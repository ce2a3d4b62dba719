//! Merged view of the tools exposed by every connected server

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use mcps_core::{McpError, McpResult, ToolDefinition, ToolDescriptor};
use tracing::{debug, info, warn};

use crate::registry::ServerRegistry;
use crate::session::ServerSession;

/// Two servers advertised the same tool name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCollision {
    pub tool: String,
    /// Server whose definition was kept
    pub kept: String,
    /// Server whose definition was ignored
    pub ignored: String,
}

/// What a refresh found
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub tool_count: usize,
    /// Connected servers whose discovery failed; they contribute no tools
    pub discovery_errors: Vec<(String, McpError)>,
    pub collisions: Vec<ToolCollision>,
}

/// Immutable catalog contents. A refresh builds a new one and swaps it in,
/// so readers never see a half-built catalog.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
    generation: u64,
}

impl CatalogSnapshot {
    pub fn all_tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Name of the server owning `name`
    pub fn resolve(&self, name: &str) -> McpResult<&str> {
        self.get(name)
            .map(|tool| tool.server.as_str())
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registry generation this snapshot was built from
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tool name to owning server, rebuilt from the registry on refresh
#[derive(Debug, Default)]
pub struct ToolCatalog {
    snapshot: Arc<CatalogSnapshot>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rediscover tools on every `Connected` server.
    ///
    /// Servers are queried concurrently and merged in registry order, so
    /// when two servers expose the same name the one added first wins.
    pub async fn refresh(&mut self, registry: &ServerRegistry) -> RefreshReport {
        let connected: Vec<&ServerSession> = registry
            .sessions()
            .iter()
            .filter(|s| s.is_connected())
            .collect();
        let discoveries = join_all(connected.iter().map(|session| discover(session))).await;

        let mut report = RefreshReport::default();
        let mut tools: Vec<ToolDescriptor> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (server, outcome) in discoveries {
            let definitions = match outcome {
                Ok(definitions) => definitions,
                Err(e) => {
                    warn!("Tool discovery failed for server {}: {}", server, e);
                    report.discovery_errors.push((server, e));
                    continue;
                }
            };
            debug!("Server {} exposes {} tool(s)", server, definitions.len());

            for definition in definitions {
                if let Some(&existing) = index.get(&definition.name) {
                    let kept = tools[existing].server.clone();
                    warn!(
                        "Tool {} from server {} shadowed by server {}",
                        definition.name, server, kept
                    );
                    report.collisions.push(ToolCollision {
                        tool: definition.name,
                        kept,
                        ignored: server.clone(),
                    });
                    continue;
                }
                index.insert(definition.name.clone(), tools.len());
                tools.push(definition.owned_by(server.clone()));
            }
        }

        report.tool_count = tools.len();
        self.snapshot = Arc::new(CatalogSnapshot {
            tools,
            index,
            generation: registry.generation(),
        });
        info!(
            "Tool catalog refreshed: {} tool(s) from {} server(s)",
            report.tool_count,
            connected.len() - report.discovery_errors.len()
        );

        report
    }

    pub fn all_tools(&self) -> &[ToolDescriptor] {
        self.snapshot.all_tools()
    }

    pub fn resolve(&self, name: &str) -> McpResult<&str> {
        self.snapshot.resolve(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.snapshot.get(name)
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// Cheap shared handle to the current contents
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Whether the registry changed since the last refresh
    pub fn is_stale(&self, registry: &ServerRegistry) -> bool {
        self.snapshot.generation != registry.generation()
    }
}

async fn discover(session: &ServerSession) -> (String, McpResult<Vec<ToolDefinition>>) {
    let name = session.name().to_string();
    let outcome = match session.handle() {
        Some(handle) => {
            let timeout = session.config().timeout();
            match tokio::time::timeout(timeout, handle.list_tools()).await {
                Ok(result) => result,
                Err(_) => Err(McpError::Timeout {
                    operation: format!("listing tools on '{}'", name),
                    secs: session.config().timeout_secs,
                }),
            }
        }
        None => Err(McpError::SessionClosed(name.clone())),
    };
    (name, outcome)
}
