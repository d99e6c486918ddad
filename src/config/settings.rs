use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub ui: UiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub vulnerability_feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
    pub auto_refresh_secs: u64, // 0 keeps refresh manual
    pub default_view: String,
    pub demo_mode: bool,
    pub mock_packet_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            vulnerability_feed_url: "http://localhost:4000/cve".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 100,
            auto_refresh_secs: 0,
            default_view: "traffic".to_string(),
            demo_mode: false,
            mock_packet_count: 500,
        }
    }
}

impl SessionConfig {
    /// Configured path, else `$HOME/.config/anomaly-dashboard/session.json`,
    /// else a file in the working directory.
    pub fn resolve_store_path(&self) -> PathBuf {
        if let Some(path) = &self.store_path {
            return path.clone();
        }
        match std::env::var_os("HOME").filter(|h| !h.is_empty()) {
            Some(home) => PathBuf::from(home)
                .join(".config")
                .join("anomaly-dashboard")
                .join("session.json"),
            None => PathBuf::from(".anomaly-dashboard-session.json"),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read configuration file '{}'", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid configuration in '{}'", path))?;
        Ok(config)
    }

    /// Load `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&str>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self).context("Cannot serialise configuration")?;
        fs::write(path, content).with_context(|| format!("Cannot write configuration file '{}'", path))?;
        Ok(())
    }
}
