//! Application settings read from the environment and an optional `.env` file

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::{AgentError, Result};

/// Server configuration file used when `MCP_SERVERS_PATH` is unset
pub const DEFAULT_SERVERS_PATH: &str = "mcp-servers.json";

/// Dotenv file read by [`Settings::from_env`], relative to the working directory
pub const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Clone)]
pub struct Settings {
    /// `MCP_SERVERS_PATH`
    pub mcp_servers_path: PathBuf,
    /// `OPENAI_API_KEY`
    pub openai_api_key: Option<String>,
    /// `OPENAI_API_BASE`
    pub openai_api_base: Option<String>,
    /// `GEMINI_API_KEY`
    pub gemini_api_key: Option<String>,
    /// `ANTHROPIC_API_KEY`
    pub anthropic_api_key: Option<String>,
}

impl Settings {
    /// Process environment, falling back to `./.env` for unset keys
    pub fn from_env() -> Self {
        Self::from_env_file(DEFAULT_ENV_FILE)
    }

    /// Process environment, falling back to the dotenv file at `path`.
    /// A missing file is not an error.
    pub fn from_env_file(path: impl AsRef<Path>) -> Self {
        Self::layered(|key| std::env::var(key).ok(), path.as_ref())
    }

    fn layered<F>(env: F, path: &Path) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = read_env_file(path);
        Self::from_lookup(|key| {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.get(key).cloned())
        })
    }

    /// Build settings from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            mcp_servers_path: get("MCP_SERVERS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVERS_PATH)),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_api_base: get("OPENAI_API_BASE"),
            gemini_api_key: get("GEMINI_API_KEY"),
            anthropic_api_key: get("ANTHROPIC_API_KEY"),
        }
    }

    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| AgentError::Configuration("OPENAI_API_KEY is not set".to_string()))
    }

    pub fn require_gemini_key(&self) -> Result<&str> {
        self.gemini_api_key
            .as_deref()
            .ok_or_else(|| AgentError::Configuration("GEMINI_API_KEY is not set".to_string()))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn read_env_file(path: &Path) -> HashMap<String, String> {
    let entries = match dotenv::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No env file at {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let mut values = HashMap::new();
    for entry in entries {
        match entry {
            Ok((key, value)) => {
                values.insert(key, value);
            }
            Err(e) => warn!("Skipping malformed line in {}: {}", path.display(), e),
        }
    }
    values
}

fn redact(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("mcp_servers_path", &self.mcp_servers_path)
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_api_base", &self.openai_api_base)
            .field("gemini_api_key", &redact(&self.gemini_api_key))
            .field("anthropic_api_key", &redact(&self.anthropic_api_key))
            .finish()
    }
}
