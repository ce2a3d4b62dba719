//! Server configuration and its normalization
//!
//! A configuration source may be a file, raw text, an in-memory mapping or an
//! already resolved [`ServerSet`]. All of them go through
//! [`ConfigResolver::resolve`], which applies the named defaults in
//! [`ResolverDefaults`] and produces the canonical server definitions.
//!
//! ```rust
//! use mcps_core::{resolve, ConfigSource, TransportKind};
//!
//! let set = resolve(ConfigSource::RawText(
//!     r#"{"mcpServers": {"math_server": {"url": "http://localhost:8000/sse"}}}"#.to_string(),
//! ))
//! .unwrap();
//!
//! let math = set.get("math_server").unwrap();
//! assert_eq!(math.transport, TransportKind::Sse);
//! assert_eq!(math.timeout_secs, 30);
//! ```

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Timeout applied when a server entry has none
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport applied when a server entry has none, or an unrecognized one
pub const DEFAULT_TRANSPORT: TransportKind = TransportKind::Sse;

/// Top-level key holding the server table
pub const SERVERS_KEY: &str = "mcpServers";

/// Accepted alias for [`SERVERS_KEY`]
pub const SERVERS_KEY_ALIAS: &str = "servers";

/// Network mechanism underlying a session
///
/// Both are request/response at the session boundary; the difference only
/// matters to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent server-sent-events stream
    #[default]
    Sse,
    /// Streamable HTTP (request/response)
    Http,
}

impl TransportKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransportKind::Sse => "sse",
            TransportKind::Http => "http",
        }
    }

    /// Parse a transport name, case-insensitively. Returns `None` for
    /// anything that is not `sse` or `http`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sse" => Some(TransportKind::Sse),
            "http" => Some(TransportKind::Http),
            _ => None,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical definition of one MCP server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unique key of the server within a [`ServerSet`]
    pub name: String,
    /// Endpoint URL
    pub url: String,
    pub transport: TransportKind,
    /// Headers forwarded verbatim on every request (e.g. `Authorization`)
    pub headers: BTreeMap<String, String>,
    /// Applies to session establishment and to every tool call
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// New definition with the default transport, no headers and the default
    /// timeout
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            transport: DEFAULT_TRANSPORT,
            headers: BTreeMap::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Zero is not a valid timeout and falls back to [`DEFAULT_TIMEOUT_SECS`]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = positive_or_default(secs);
        self
    }

    /// The configured timeout as a [`Duration`]. A zero `timeout_secs` set
    /// directly on the field reads as the default.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(positive_or_default(self.timeout_secs))
    }
}

fn positive_or_default(secs: u64) -> u64 {
    if secs == 0 {
        DEFAULT_TIMEOUT_SECS
    } else {
        secs
    }
}

/// Named server definitions; names are unique and the last write wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSet {
    servers: BTreeMap<String, ServerConfig>,
}

impl ServerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing (and returning) any previous one with
    /// the same name
    pub fn insert(&mut self, config: ServerConfig) -> Option<ServerConfig> {
        self.servers.insert(config.name.clone(), config)
    }

    pub fn get(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    /// Definitions in name order
    pub fn iter(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.values()
    }
}

impl FromIterator<ServerConfig> for ServerSet {
    fn from_iter<I: IntoIterator<Item = ServerConfig>>(iter: I) -> Self {
        let mut set = ServerSet::new();
        for config in iter {
            set.insert(config);
        }
        set
    }
}

impl IntoIterator for ServerSet {
    type Item = ServerConfig;
    type IntoIter = std::collections::btree_map::IntoValues<String, ServerConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.into_values()
    }
}

/// Where a configuration comes from
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Path to a JSON file, or TOML when the extension is `.toml`
    FilePath(PathBuf),
    /// JSON (or TOML) text
    RawText(String),
    /// In-memory mapping shaped like the file format
    Mapping(Value),
    /// Already resolved; only zero timeouts are replaced by the default
    Resolved(ServerSet),
}

impl ConfigSource {
    /// Text whose trimmed form starts with `{` is treated as raw text,
    /// anything else as a path.
    pub fn infer(input: &str) -> Self {
        if input.trim_start().starts_with('{') {
            ConfigSource::RawText(input.to_string())
        } else {
            ConfigSource::FilePath(PathBuf::from(input))
        }
    }
}

impl From<ServerSet> for ConfigSource {
    fn from(set: ServerSet) -> Self {
        ConfigSource::Resolved(set)
    }
}

impl From<Value> for ConfigSource {
    fn from(value: Value) -> Self {
        ConfigSource::Mapping(value)
    }
}

impl From<PathBuf> for ConfigSource {
    fn from(path: PathBuf) -> Self {
        ConfigSource::FilePath(path)
    }
}

impl From<&Path> for ConfigSource {
    fn from(path: &Path) -> Self {
        ConfigSource::FilePath(path.to_path_buf())
    }
}

/// Defaults applied while normalizing server entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverDefaults {
    pub timeout_secs: u64,
    pub transport: TransportKind,
}

impl Default for ResolverDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            transport: DEFAULT_TRANSPORT,
        }
    }
}

/// Normalizes any [`ConfigSource`] into a [`ServerSet`]. Pure: no connections
/// are made.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    defaults: ResolverDefaults,
}

impl ConfigResolver {
    pub fn new(defaults: ResolverDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ResolverDefaults {
        &self.defaults
    }

    pub fn resolve(&self, source: ConfigSource) -> Result<ServerSet, ConfigError> {
        match source {
            ConfigSource::Resolved(set) => Ok(self.normalize_resolved(set)),
            ConfigSource::Mapping(value) => self.resolve_mapping(&value),
            ConfigSource::RawText(text) => self.resolve_text(&text),
            ConfigSource::FilePath(path) => self.resolve_file(&path),
        }
    }

    /// Load from a file. `.toml` files are parsed as TOML, everything else as
    /// JSON.
    pub fn resolve_file(&self, path: &Path) -> Result<ServerSet, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let value = if is_toml {
            parse_toml(&content)?
        } else {
            parse_json(&content)?
        };

        let set = self.resolve_mapping(&value)?;
        info!("Loaded config from file: {} ({} server(s))", path.display(), set.len());
        Ok(set)
    }

    /// Parse raw text. JSON is tried first; text that is not JSON is given a
    /// second chance as TOML.
    pub fn resolve_text(&self, text: &str) -> Result<ServerSet, ConfigError> {
        let value = match parse_json(text) {
            Ok(value) => value,
            Err(json_err) if !text.trim_start().starts_with('{') => {
                parse_toml(text).map_err(|_| json_err)?
            }
            Err(json_err) => return Err(json_err),
        };
        self.resolve_mapping(&value)
    }

    /// Normalize a mapping shaped `{"mcpServers": {name: {url, transport?,
    /// headers?, timeout?}}}`. A missing server table yields an empty set.
    pub fn resolve_mapping(&self, value: &Value) -> Result<ServerSet, ConfigError> {
        let root = value
            .as_object()
            .ok_or_else(|| ConfigError::Parse("config root must be an object".to_string()))?;

        let table = match root.get(SERVERS_KEY).or_else(|| root.get(SERVERS_KEY_ALIAS)) {
            None | Some(Value::Null) => return Ok(ServerSet::new()),
            Some(Value::Object(table)) => table,
            Some(_) => {
                return Err(ConfigError::Parse(format!(
                    "'{}' must be an object keyed by server name",
                    SERVERS_KEY
                )))
            }
        };

        let mut set = ServerSet::new();
        for (name, entry) in table {
            let config = self.normalize_entry(name, entry)?;
            debug!(
                "Loaded server config: {} -> {} ({})",
                name, config.url, config.transport
            );
            set.insert(config);
        }
        Ok(set)
    }

    fn normalize_entry(&self, name: &str, entry: &Value) -> Result<ServerConfig, ConfigError> {
        let entry = entry.as_object().ok_or_else(|| ConfigError::InvalidEntry {
            server: name.to_string(),
            message: "server entry must be an object".to_string(),
        })?;

        let url = match entry.get("url") {
            Some(Value::String(url)) if !url.trim().is_empty() => url.clone(),
            None | Some(Value::Null) | Some(Value::String(_)) => {
                return Err(ConfigError::MissingUrl(name.to_string()))
            }
            Some(other) => {
                return Err(ConfigError::InvalidEntry {
                    server: name.to_string(),
                    message: format!("url must be a string, got {}", other),
                })
            }
        };

        Ok(ServerConfig {
            name: name.to_string(),
            url,
            transport: self.normalize_transport(name, entry.get("transport")),
            headers: normalize_headers(name, entry.get("headers"))?,
            timeout_secs: self.normalize_timeout(name, entry.get("timeout")),
        })
    }

    fn normalize_transport(&self, name: &str, value: Option<&Value>) -> TransportKind {
        match value {
            None | Some(Value::Null) => self.defaults.transport,
            Some(Value::String(raw)) => TransportKind::parse(raw).unwrap_or_else(|| {
                warn!(
                    "Unknown transport '{}' for {}, falling back to '{}'",
                    raw, name, self.defaults.transport
                );
                self.defaults.transport
            }),
            Some(other) => {
                warn!(
                    "Unknown transport {} for {}, falling back to '{}'",
                    other, name, self.defaults.transport
                );
                self.defaults.transport
            }
        }
    }

    fn normalize_resolved(&self, set: ServerSet) -> ServerSet {
        set.into_iter()
            .map(|mut config| {
                if config.timeout_secs == 0 {
                    warn!(
                        "Invalid timeout 0 for {}, using {}s",
                        config.name, self.defaults.timeout_secs
                    );
                    config.timeout_secs = self.defaults.timeout_secs;
                }
                config
            })
            .collect()
    }

    fn normalize_timeout(&self, name: &str, value: Option<&Value>) -> u64 {
        match value {
            None | Some(Value::Null) => self.defaults.timeout_secs,
            Some(v) => match v.as_u64() {
                Some(secs) if secs > 0 => secs,
                _ => {
                    warn!(
                        "Invalid timeout {} for {}, using {}s",
                        v, name, self.defaults.timeout_secs
                    );
                    self.defaults.timeout_secs
                }
            },
        }
    }
}

fn normalize_headers(
    name: &str,
    value: Option<&Value>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    let map: &Map<String, Value> = match value {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ConfigError::InvalidEntry {
                server: name.to_string(),
                message: "headers must be an object of strings".to_string(),
            })
        }
    };

    map.iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key.clone(), s.clone())),
            other => Err(ConfigError::InvalidEntry {
                server: name.to_string(),
                message: format!("header '{}' must be a string, got {}", key, other),
            }),
        })
        .collect()
}

fn parse_json(text: &str) -> Result<Value, ConfigError> {
    serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
}

fn parse_toml(text: &str) -> Result<Value, ConfigError> {
    toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
}

/// Resolve `source` with the default [`ResolverDefaults`]
pub fn resolve(source: ConfigSource) -> Result<ServerSet, ConfigError> {
    ConfigResolver::default().resolve(source)
}
