//! Server configuration
//!
//! Loaded from an optional JSON file; every field has a default.

use crate::aof::AofConfig;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

/// Top-level server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the RESP listener binds to
    pub bind: String,
    /// Append-only file settings
    pub aof: AofConfig,
}

impl ServerConfig {
    /// Read a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::from_json(&raw).with_context(|| format!("invalid config file {:?}", path))
    }

    /// Parse a configuration from JSON text
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:6379".to_string(),
            aof: AofConfig::default(),
        }
    }
}
