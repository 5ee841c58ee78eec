use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub plot: PlotConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where and how to reach the API backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the backend, without the `/api` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Use the in-process simulated backend instead of HTTP
    #[serde(default)]
    pub mock: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            mock: false,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Backoff settings for retried operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per operation (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles per retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Also retry to-do list fetches and inserts
    #[serde(default)]
    pub apply_to_todos: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            apply_to_todos: false,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

/// Plot screen settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Amplitude pre-filled in the plot form
    #[serde(default = "default_amplitude")]
    pub default_amplitude: f64,
    /// Artificial latency of the simulated plot backend
    #[serde(default = "default_mock_delay_ms")]
    pub mock_delay_ms: u64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            default_amplitude: default_amplitude(),
            mock_delay_ms: default_mock_delay_ms(),
        }
    }
}

fn default_amplitude() -> f64 {
    1.0
}

fn default_mock_delay_ms() -> u64 {
    1500
}

/// Appearance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_true")]
    pub dark_theme: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { dark_theme: true }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "plotdo", "Plotdo")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        let config_dir = dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Invalid configuration in {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            Ok(config)
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from the default location, logging and falling back to defaults on error
    pub fn load_or_default() -> Self {
        match Self::config_path() {
            Ok(path) => Self::load_from_or_default(&path),
            Err(e) => {
                tracing::error!("Failed to locate config: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {:#}", e);
            Self::default()
        })
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Look up a setting by its dotted key
    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["backend", "base_url"] => Ok(self.backend.base_url.clone()),
            ["backend", "timeout_secs"] => Ok(self.backend.timeout_secs.to_string()),
            ["backend", "mock"] => Ok(self.backend.mock.to_string()),
            ["retry", "max_attempts"] => Ok(self.retry.max_attempts.to_string()),
            ["retry", "base_delay_ms"] => Ok(self.retry.base_delay_ms.to_string()),
            ["retry", "apply_to_todos"] => Ok(self.retry.apply_to_todos.to_string()),
            ["plot", "default_amplitude"] => Ok(self.plot.default_amplitude.to_string()),
            ["plot", "mock_delay_ms"] => Ok(self.plot.mock_delay_ms.to_string()),
            ["ui", "dark_theme"] => Ok(self.ui.dark_theme.to_string()),
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
    }

    /// Update a setting by its dotted key, parsing the value to the field's type
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["backend", "base_url"] => {
                self.backend.base_url = value.trim_end_matches('/').to_string();
            }
            ["backend", "timeout_secs"] => {
                let secs: u64 = parse_value(key, value)?;
                if secs == 0 {
                    anyhow::bail!("backend.timeout_secs must be at least 1");
                }
                self.backend.timeout_secs = secs;
            }
            ["backend", "mock"] => self.backend.mock = parse_value(key, value)?,
            ["retry", "max_attempts"] => {
                let attempts: u32 = parse_value(key, value)?;
                if attempts == 0 {
                    anyhow::bail!("retry.max_attempts must be at least 1");
                }
                self.retry.max_attempts = attempts;
            }
            ["retry", "base_delay_ms"] => self.retry.base_delay_ms = parse_value(key, value)?,
            ["retry", "apply_to_todos"] => self.retry.apply_to_todos = parse_value(key, value)?,
            ["plot", "default_amplitude"] => {
                self.plot.default_amplitude = parse_value(key, value)?;
            }
            ["plot", "mock_delay_ms"] => self.plot.mock_delay_ms = parse_value(key, value)?,
            ["ui", "dark_theme"] => self.ui.dark_theme = parse_value(key, value)?,
            _ => anyhow::bail!("Unknown config key: {}", key),
        }

        Ok(())
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {} ({})", key, value, e))
}
