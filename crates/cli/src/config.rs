//! Configuration for the kdbx-dav command line
//!
//! Reads config from ~/.config/kdbx-dav/config.toml

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use kdbx_dav::TransportConfig;
use kdbx_dav_protocol::StoredCredentials;

const DEFAULT_CONFIG: &str = r#"# kdbx-dav configuration

[transport]
timeout_secs = 30
# Relative paths are resolved against this location
# base_url = "https://dav.example.com/remote.php/webdav/"

# Saved connections are added with `kdbx-dav remember`
"#;

/// A connection saved under a short name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConnection {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Password obfuscated with `file_id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encpass: Option<String>,
    pub file_id: String,
}

impl SavedConnection {
    pub fn stored(&self) -> StoredCredentials {
        StoredCredentials {
            user: self.user.clone(),
            encpass: self.encpass.clone(),
        }
    }
}

/// Full CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<SavedConnection>,
}

impl Config {
    /// Get default config path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kdbx-dav")
            .join("config.toml")
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        toml::from_str(&content).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    /// Create default config file if it doesn't exist
    pub fn create_default_if_missing(path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn connection(&self, name: &str) -> Option<&SavedConnection> {
        self.connections.iter().find(|c| c.name == name)
    }

    /// Add `connection`, replacing any saved under the same name
    pub fn remember(&mut self, connection: SavedConnection) {
        match self.connections.iter_mut().find(|c| c.name == connection.name) {
            Some(existing) => *existing = connection,
            None => self.connections.push(connection),
        }
    }

    /// Remove a saved connection; `false` if there was none
    pub fn forget(&mut self, name: &str) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.name != name);
        self.connections.len() != before
    }
}
