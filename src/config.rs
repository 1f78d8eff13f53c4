use serde::Deserialize;
use std::{fs, path::Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Credentials for the Telegram notification channel.
#[derive(Deserialize, Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

/// One monitored organisation: a display name, a service description, and
/// the two endpoints probed as independent channels.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub service: String,
    pub primary_url: String,
    pub secondary_url: String,
}

/// Static configuration for one monitoring run. Loaded once at startup and
/// never refreshed.
#[derive(Deserialize, Debug, Clone)]
pub struct MonitorConfig {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub targets: Vec<Target>,
}

pub fn load_config(path: &Path) -> Result<MonitorConfig, ConfigError> {
    let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&config_str).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}
