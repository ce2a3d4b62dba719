//! MCPS Core - shared types for multi-server MCP orchestration
//!
//! This crate provides the foundational pieces used by:
//! - `mcps-client` - sessions, registry, tool catalog and dispatch
//! - `mcps-agent` - the model-driven conversation loop
//!
//! # Configuration
//!
//! Any configuration input is normalized by [`ConfigResolver`]:
//!
//! ```rust
//! use mcps_core::{ConfigResolver, ConfigSource, TransportKind};
//! use serde_json::json;
//!
//! let servers = ConfigResolver::default()
//!     .resolve(ConfigSource::Mapping(json!({
//!         "mcpServers": {
//!             "math_server": {"url": "http://localhost:8000/mcp", "transport": "http"}
//!         }
//!     })))
//!     .unwrap();
//!
//! assert_eq!(servers.get("math_server").unwrap().transport, TransportKind::Http);
//! ```

mod config;
mod error;
mod traits;
mod types;

pub use config::*;
pub use error::*;
pub use traits::*;
pub use types::*;
