use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::models::Interval;
use crate::orchestrator::MergeStrategy;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub vs_currency: String,
    pub api_key: Option<String>,
    /// Send the key as a pro-plan key instead of a demo key.
    pub pro: bool,
    pub timeout_secs: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            vs_currency: "usd".to_string(),
            api_key: None,
            pro: false,
            timeout_secs: None,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub coins: Vec<String>,
    pub range_days: u32,
    pub interval: Interval,
    pub debounce_ms: u64,
    pub merge: MergeStrategy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            coins: vec!["bitcoin".to_string()],
            range_days: 120,
            interval: Interval::Daily,
            debounce_ms: 500,
            merge: MergeStrategy::Positional,
        }
    }
}

impl DashboardConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise the default path when it exists,
    /// otherwise built-in defaults. Environment overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::load(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                info!("No config file at {}, using defaults", DEFAULT_CONFIG_PATH);
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.upstream.api_key = Some(key);
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        fs::write(path, config_str)?;
        Ok(())
    }
}
