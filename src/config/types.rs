//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Bot identity.
    pub bot: BotConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cogs loaded at startup.
    #[serde(default)]
    pub cogs: CogsConfig,
    /// Optional structured command schema export.
    pub export: Option<ExportConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Display name, used in logs and the help footer.
    pub name: String,
    /// Text command prefix for DMs and guilds without their own.
    #[serde(default = "default_prefix")]
    pub default_prefix: String,
    /// User ids seeded with admin clearance at startup.
    #[serde(default)]
    pub owners: Vec<u64>,
}

fn default_prefix() -> String {
    car::bot::DEFAULT_PREFIX.to_string()
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "data/carbot.db".to_string()
}

/// Cog loading configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CogsConfig {
    /// Cog names, loaded in order.
    #[serde(default = "default_cogs")]
    pub load: Vec<String>,
}

impl Default for CogsConfig {
    fn default() -> Self {
        Self {
            load: default_cogs(),
        }
    }
}

fn default_cogs() -> Vec<String> {
    crate::cogs::BUILTIN.iter().map(|s| s.to_string()).collect()
}

/// Schema export configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// File the registration JSON is written to.
    pub path: String,
}
