//! Configuration loading and persistence.
//!
//! Handles reading and writing the roomchat configuration file. The session
//! token is not part of the configuration; it lives in the credentials file
//! managed by [`crate::auth`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::constants;

/// File name of the configuration inside the config directory.
const CONFIG_FILE: &str = "config.json";

/// Configuration for the roomchat client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat server (`http://` or `https://`).
    ///
    /// The WebSocket scheme mirrors it: `https` connects over `wss`.
    pub server_url: String,
    /// Token supplied through `ROOMCHAT_TOKEN` - never serialized to disk.
    #[serde(skip)]
    pub token_override: Option<String>,
    /// Page size for room list requests.
    pub room_page_size: u32,
    /// Page size for chat history requests.
    pub history_page_size: u32,
    /// Delay before each reconnect attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Consecutive reconnect attempts before the session gives up.
    pub max_reconnect_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: constants::DEFAULT_SERVER_URL.to_string(),
            token_override: None,
            room_page_size: constants::ROOM_PAGE_SIZE,
            history_page_size: constants::HISTORY_PAGE_SIZE,
            reconnect_delay_ms: constants::RECONNECT_DELAY.as_millis() as u64,
            max_reconnect_attempts: constants::MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// Directory selection priority:
    /// 1. `ROOMCHAT_CONFIG_DIR` env var: explicit override
    /// 2. Default: platform config dir (macOS: ~/Library/Application Support/roomchat)
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(dir) = std::env::var("ROOMCHAT_CONFIG_DIR") {
            PathBuf::from(dir)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("roomchat")
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config dir {}", dir.display()))?;
        Ok(dir)
    }

    /// Loads configuration from the default directory, with environment
    /// variable overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_dir()?)
    }

    /// Loads configuration from `dir`, falling back to defaults when the file
    /// is missing, then applies environment overrides.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("invalid config file {}", path.display()))?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(server_url) = std::env::var("ROOMCHAT_SERVER_URL") {
            self.server_url = server_url;
        }

        // Token from env var (for scripting)
        if let Ok(token) = std::env::var("ROOMCHAT_TOKEN") {
            if !token.is_empty() {
                self.token_override = Some(token);
            }
        }
    }

    /// Persists the configuration to the default directory.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_dir()?)
    }

    /// Persists the configuration to `dir`.
    pub fn save_to(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("failed to write {}", path.display()))?;

        // Set restrictive permissions (owner read/write only)
        #[cfg(unix)]
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.server_url.trim_end_matches('/')
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
