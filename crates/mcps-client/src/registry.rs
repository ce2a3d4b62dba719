//! Named server sessions and their lifecycle

use std::sync::Arc;

use futures::future::join_all;
use mcps_core::{McpError, McpResult, McpSession, ServerConfig, ServerSet, SessionConnector};
use tracing::{debug, error, info, warn};

use crate::session::{ServerSession, SessionState};

/// Per-server outcome of a bulk connect
#[derive(Debug, Default)]
pub struct ConnectReport {
    /// Servers now `Connected`, in name order
    pub connected: Vec<String>,
    /// Servers left `Failed` with the reason
    pub failed: Vec<(String, McpError)>,
}

impl ConnectReport {
    pub fn all_connected(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of tearing every session down
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Sessions that released their transport cleanly
    pub closed: usize,
    /// Sessions whose transport reported an error while closing
    pub errors: Vec<(String, McpError)>,
}

impl CloseReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Owns every session, keyed by server name, in the order they were added
pub struct ServerRegistry {
    connector: Arc<dyn SessionConnector>,
    sessions: Vec<ServerSession>,
    generation: u64,
}

impl ServerRegistry {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            connector,
            sessions: Vec::new(),
            generation: 0,
        }
    }

    /// Connect `name`, replacing (and closing) any session of the same name.
    ///
    /// On failure the session is kept in `Failed` state and the error is
    /// returned as a `ConnectionError`.
    pub async fn add(&mut self, name: &str, mut config: ServerConfig) -> McpResult<&ServerSession> {
        config.name = name.to_string();
        self.discard(name).await;

        info!("Connecting to server {} at {} ({})", name, config.url, config.transport);
        let mut session = ServerSession::connecting(config);
        let outcome = connect_with_timeout(self.connector.as_ref(), session.config()).await;
        let result = session.finish_connect(outcome);
        log_outcome(name, &result);

        let index = self.sessions.len();
        self.sessions.push(session);
        self.generation += 1;

        result.map(|()| &self.sessions[index])
    }

    /// Connect every server in `servers` with overlapping attempts.
    ///
    /// A slow or failing server never prevents the others from connecting.
    pub async fn add_all(&mut self, servers: &ServerSet) -> ConnectReport {
        for name in servers.names() {
            self.discard(name).await;
        }

        let connector = Arc::clone(&self.connector);
        let attempts = servers.iter().map(|config| {
            let connector = Arc::clone(&connector);
            async move {
                info!(
                    "Connecting to server {} at {} ({})",
                    config.name, config.url, config.transport
                );
                (config, connect_with_timeout(connector.as_ref(), config).await)
            }
        });
        let outcomes = join_all(attempts).await;

        let mut report = ConnectReport::default();
        for (config, outcome) in outcomes {
            let mut session = ServerSession::connecting(config.clone());
            let result = session.finish_connect(outcome);
            log_outcome(&config.name, &result);
            match result {
                Ok(()) => report.connected.push(config.name.clone()),
                Err(e) => report.failed.push((config.name.clone(), e)),
            }
            self.sessions.push(session);
        }
        self.generation += 1;

        report
    }

    /// Close and forget `name`. Unknown names are a no-op.
    pub async fn remove(&mut self, name: &str) -> McpResult<()> {
        match self.sessions.iter().position(|s| s.name() == name) {
            Some(index) => {
                let mut session = self.sessions.remove(index);
                self.generation += 1;
                info!("Removing server {}", name);
                session.close().await
            }
            None => Ok(()),
        }
    }

    /// Close every session, whatever its state. Each session is attempted
    /// even if another one fails, and all of them end `Closed`.
    pub async fn close_all(&mut self) -> CloseReport {
        let outcomes = join_all(self.sessions.iter_mut().map(|session| async move {
            let name = session.name().to_string();
            (name, session.close().await)
        }))
        .await;
        self.generation += 1;

        let mut report = CloseReport::default();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(()) => report.closed += 1,
                Err(e) => {
                    error!("Error closing server {}: {}", name, e);
                    report.errors.push((name, e));
                }
            }
        }
        info!(
            "Closed {} server session(s), {} error(s)",
            report.closed,
            report.errors.len()
        );
        report
    }

    pub fn get(&self, name: &str) -> Option<&ServerSession> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    pub fn state(&self, name: &str) -> Option<SessionState> {
        self.get(name).map(ServerSession::state)
    }

    /// All sessions in the order they were added
    pub fn sessions(&self) -> &[ServerSession] {
        &self.sessions
    }

    pub fn names(&self) -> Vec<&str> {
        self.sessions.iter().map(ServerSession::name).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_connected()).count()
    }

    /// Bumped on every membership or state change
    pub fn generation(&self) -> u64 {
        self.generation
    }

    async fn discard(&mut self, name: &str) {
        if self.get(name).is_some() {
            debug!("Replacing existing session for {}", name);
            if let Err(e) = self.remove(name).await {
                warn!("Error closing replaced session {}: {}", name, e);
            }
        }
    }
}

impl Drop for ServerRegistry {
    fn drop(&mut self) {
        let open = self.connected_count();
        if open > 0 {
            warn!(
                "ServerRegistry dropped with {} open session(s); call close_all() first",
                open
            );
        }
    }
}

async fn connect_with_timeout(
    connector: &dyn SessionConnector,
    config: &ServerConfig,
) -> McpResult<Box<dyn McpSession>> {
    match tokio::time::timeout(config.timeout(), connector.connect(config)).await {
        Ok(Ok(session)) => Ok(session),
        Ok(Err(e @ McpError::ConnectionError { .. })) => Err(e),
        Ok(Err(e)) => Err(McpError::connection(&config.name, e)),
        Err(_) => Err(McpError::connection(
            &config.name,
            format!("timed out after {}s", config.timeout_secs),
        )),
    }
}

fn log_outcome(name: &str, result: &McpResult<()>) {
    match result {
        Ok(()) => info!("Connected to server {}", name),
        Err(e) => error!("Failed to connect to server {}: {}", name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{FakeConnector, FakeServer};
    use std::time::Duration;

    fn registry(connector: FakeConnector) -> ServerRegistry {
        ServerRegistry::new(Arc::new(connector))
    }

    #[tokio::test]
    async fn test_add_connects_session() {
        let mut registry = registry(FakeConnector::new().with_server("http://math/sse", FakeServer::math()));
        let session = registry
            .add("math", ServerConfig::new("ignored", "http://math/sse"))
            .await
            .unwrap();
        assert_eq!(session.name(), "math");
        assert_eq!(session.state(), SessionState::Connected);
        assert_eq!(registry.connected_count(), 1);
        registry.close_all().await;
    }

    #[tokio::test]
    async fn test_failed_add_is_tracked() {
        let mut registry = registry(FakeConnector::new().with_unreachable("http://down/sse"));
        let err = registry
            .add("down", ServerConfig::new("down", "http://down/sse"))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ConnectionError { ref server, .. } if server == "down"));
        assert_eq!(registry.state("down"), Some(SessionState::Failed));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_replacing_a_session_closes_the_old_one() {
        let connector = FakeConnector::new()
            .with_server("http://a/sse", FakeServer::math())
            .with_server("http://b/sse", FakeServer::math());
        let stats = connector.stats();
        let mut registry = registry(connector);

        registry.add("math", ServerConfig::new("math", "http://a/sse")).await.unwrap();
        registry.add("math", ServerConfig::new("math", "http://b/sse")).await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("math").unwrap().config().url, "http://b/sse");
        assert_eq!(stats.closes(), 1);
        registry.close_all().await;
        assert_eq!(stats.closes(), 2);
    }

    #[tokio::test]
    async fn test_remove_unknown_is_noop() {
        let mut registry = registry(FakeConnector::new());
        registry.remove("nothing").await.unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_add_all_isolates_failures() {
        let servers: ServerSet = [
            ServerConfig::new("math", "http://math/sse"),
            ServerConfig::new("weather", "http://weather/sse"),
        ]
        .into_iter()
        .collect();
        let mut registry = registry(
            FakeConnector::new()
                .with_server("http://math/sse", FakeServer::math())
                .with_unreachable("http://weather/sse"),
        );

        let report = registry.add_all(&servers).await;
        assert_eq!(report.connected, vec!["math".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "weather");
        assert!(!report.all_connected());
        assert_eq!(registry.state("math"), Some(SessionState::Connected));
        assert_eq!(registry.state("weather"), Some(SessionState::Failed));
        registry.close_all().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_marks_failed() {
        let mut registry = registry(
            FakeConnector::new()
                .with_server("http://slow/sse", FakeServer::math())
                .with_connect_delay(Duration::from_secs(60)),
        );
        let err = registry
            .add("slow", ServerConfig::new("slow", "http://slow/sse").with_timeout_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(registry.state("slow"), Some(SessionState::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_all_overlaps_connects() {
        let servers: ServerSet = (0..4)
            .map(|i| ServerConfig::new(format!("s{}", i), "http://math/sse").with_timeout_secs(15))
            .collect();
        let mut registry = registry(
            FakeConnector::new()
                .with_server("http://math/sse", FakeServer::math())
                .with_connect_delay(Duration::from_secs(10)),
        );

        let started = tokio::time::Instant::now();
        let report = registry.add_all(&servers).await;
        assert!(report.all_connected());
        assert!(started.elapsed() < Duration::from_secs(15));
        registry.close_all().await;
    }

    #[tokio::test]
    async fn test_close_all_closes_every_state() {
        let servers: ServerSet = [
            ServerConfig::new("math", "http://math/sse"),
            ServerConfig::new("down", "http://down/sse"),
        ]
        .into_iter()
        .collect();
        let connector = FakeConnector::new()
            .with_server("http://math/sse", FakeServer::math())
            .with_unreachable("http://down/sse");
        let stats = connector.stats();
        let mut registry = registry(connector);
        registry.add_all(&servers).await;

        let report = registry.close_all().await;
        assert!(report.is_clean());
        assert_eq!(report.closed, 2);
        assert!(registry
            .sessions()
            .iter()
            .all(|s| s.state() == SessionState::Closed));
        assert_eq!(stats.closes(), 1);
    }
}
