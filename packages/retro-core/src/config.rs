/// Configuration for retro board clients.
/// Reads config.json from ~/.config/retro-board/config.json (or platform equivalent).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::storage::local::LocalStoreOptions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetroConfig {
    /// Directory holding the local board document.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_watch_external")]
    pub watch_external: bool,
    /// HTTP origin of the relay serving remote sessions.
    #[serde(default)]
    pub relay_url: Option<String>,
    /// Page URL that share links are built on.
    #[serde(default = "default_share_base_url")]
    pub share_base_url: String,
    /// Team name printed in exported reports.
    #[serde(default)]
    pub team_name: Option<String>,
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retro-board")
}

fn default_refresh_interval_ms() -> u64 {
    500
}

fn default_watch_external() -> bool {
    true
}

fn default_share_base_url() -> String {
    "http://localhost:3000/".to_string()
}

impl Default for RetroConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            refresh_interval_ms: default_refresh_interval_ms(),
            watch_external: default_watch_external(),
            relay_url: None,
            share_base_url: default_share_base_url(),
            team_name: None,
        }
    }
}

impl RetroConfig {
    pub fn local_options(&self) -> LocalStoreOptions {
        LocalStoreOptions {
            storage_dir: self.storage_dir.clone(),
            // A zero period would make the refresh timer panic.
            refresh_interval: Duration::from_millis(self.refresh_interval_ms.max(1)),
            watch_external: self.watch_external,
        }
    }
}

/// Default config path: ~/.config/retro-board/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retro-board")
        .join("config.json")
}

/// Load config from path. Returns default if file doesn't exist.
pub fn load_config(path: &Path) -> RetroConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[retro.config] Failed to parse config {}: {}", path.display(), e);
            RetroConfig::default()
        }),
        Err(_) => {
            log::info!("[retro.config] No config at {}, using defaults", path.display());
            RetroConfig::default()
        }
    }
}
