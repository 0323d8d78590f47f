use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::pipeline::DEFAULT_QUIET_PERIOD;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const LOG_ENV: &str = "GRAMMAR_CHAT_LOG";

/// On-disk configuration. Every field is optional; gaps fall back to
/// environment variables and then built-in defaults.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub debounce_ms: Option<u64>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("grammar-chat").join("config.json"))
    }
}

/// Command-line values that win over everything else.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model: Option<String>,
    pub debounce_ms: Option<u64>,
}

/// Fully resolved settings, fixed for the life of the process.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub quiet_period: Duration,
    pub log_filter: String,
}

impl Settings {
    /// Merge flags, environment, and file. `env` is passed in so resolution
    /// stays a pure function.
    pub fn resolve(config: &Config, overrides: &Overrides, env: impl Fn(&str) -> Option<String>) -> Self {
        let api_key = env(API_KEY_ENV)
            .filter(|k| !k.trim().is_empty())
            .or_else(|| config.api_key.clone());

        let model = overrides.model.clone()
            .or_else(|| config.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let base_url = config.base_url.clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let quiet_period = overrides.debounce_ms
            .or(config.debounce_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_QUIET_PERIOD);

        let log_filter = env(LOG_ENV)
            .or_else(|| config.log_level.clone())
            .unwrap_or_else(|| "info".to_string());

        Self { api_key, model, base_url, quiet_period, log_filter }
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Install the process-wide settings. Fails if called twice.
pub fn install(settings: Settings) -> Result<&'static Settings> {
    SETTINGS
        .set(settings)
        .map_err(|_| anyhow!("settings already installed"))?;
    settings_or_err()
}

/// The installed settings, if `install` has run.
pub fn get() -> Option<&'static Settings> {
    SETTINGS.get()
}

fn settings_or_err() -> Result<&'static Settings> {
    get().ok_or_else(|| anyhow!("settings not installed"))
}
