//! Watch configuration.

use crate::error::{PipelineError, PipelineResult};
use bookwatch_ws::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a book watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// WebSocket endpoint URL of the feed.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Symbol of the instrument to watch at startup.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Book depth requested per side.
    #[serde(default = "default_depth")]
    pub depth: usize,
}

fn default_ws_url() -> String {
    "wss://ws.kraken.com/v2".to_string()
}

fn default_symbol() -> String {
    "BTC/USD".to_string()
}

fn default_depth() -> usize {
    25
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            symbol: default_symbol(),
            depth: default_depth(),
        }
    }
}

impl WatchConfig {
    /// Load configuration from the `BOOKWATCH_CONFIG` path, falling back to
    /// `config/default.toml`, then to built-in defaults.
    pub fn load() -> PipelineResult<Self> {
        let config_path =
            std::env::var("BOOKWATCH_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("Failed to parse config: {e}")))
    }

    /// Transport configuration for this watch.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            url: self.ws_url.clone(),
        }
    }
}
