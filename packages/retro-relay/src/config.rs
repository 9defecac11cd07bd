/// Configuration for the retro relay.
/// Reads relay.json from ~/.config/retro-board/relay.json (or platform equivalent).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_port() -> u16 {
    8787
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
        }
    }
}

/// Default config path: ~/.config/retro-board/relay.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retro-board")
        .join("relay.json")
}

/// Load config from path. Returns default if file doesn't exist.
pub fn load_config(path: &Path) -> RelayConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("[retro.relay.config] Failed to parse config {}: {}", path.display(), e);
            RelayConfig::default()
        }),
        Err(_) => {
            log::info!("[retro.relay.config] No config at {}, using defaults", path.display());
            RelayConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("relay.json"));
        assert_eq!(config.port, 8787);
        assert_eq!(config.bind_address, "127.0.0.1");
    }

    #[test]
    fn test_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        fs::write(&path, r#"{"bind_address": "0.0.0.0"}"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.port, 8787);
        assert_eq!(config.bind_address, "0.0.0.0");
    }

    #[test]
    fn test_invalid_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.json");
        fs::write(&path, r#"{"port": "eighty"}"#).unwrap();
        assert_eq!(load_config(&path), RelayConfig::default());
    }
}
