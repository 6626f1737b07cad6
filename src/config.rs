//! Application configuration.
//!
//! Loaded from an explicit TOML file or the platform config directory.
//! Target-server connection parameters stay opaque to the engine; only the
//! remote platform implementation interprets them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::TargetServer;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path of the JSON-lines audit log. Defaults to `sync-objects.log` in
    /// the working directory.
    #[serde(default)]
    pub audit_log: Option<PathBuf>,
    /// Per-export timeout in seconds.
    #[serde(default)]
    pub export_timeout_secs: Option<u64>,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

/// One administered target server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub key: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the platform API.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token for the platform API.
    #[serde(default)]
    pub token: Option<String>,
    /// Force a full image resync pass on every export to this server.
    #[serde(default)]
    pub image_full_sync: bool,
}

fn default_true() -> bool {
    true
}

impl ServerConfig {
    pub fn to_server(&self) -> TargetServer {
        TargetServer {
            key: self.key.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
            connection: serde_json::json!({
                "endpoint": self.endpoint,
            }),
            image_full_sync: self.image_full_sync,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the default location when `path` is none.
    /// A missing default file yields the default configuration.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
    }

    /// `<config dir>/outflow/config.toml` when the platform exposes one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("outflow").join("config.toml"))
    }

    pub fn export_timeout(&self) -> Option<Duration> {
        self.export_timeout_secs.map(Duration::from_secs)
    }

    pub fn server(&self, key: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str(
            r#"
            export_timeout_secs = 10

            [[servers]]
            key = "shop"
            name = "Main Shop"
            endpoint = "https://shop.example/api"
            image_full_sync = true
        "#,
        )
        .unwrap();

        assert_eq!(config.export_timeout(), Some(Duration::from_secs(10)));
        let server = config.server("shop").unwrap();
        assert!(server.enabled);
        let target = server.to_server();
        assert!(target.image_full_sync);
        assert_eq!(target.name, "Main Shop");
    }
}
