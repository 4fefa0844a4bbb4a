//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    pub telegram: TelegramConfig,
    /// User ids shown with the Owner role
    pub owners: Vec<i64>,
    pub plugins: PluginConfig,
    pub watcher: WatcherConfig,
    pub messages: MessagesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Long-poll timeout for getUpdates
    pub poll_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PluginConfig {
    pub directory: PathBuf,
    /// Plugin file extension, without the dot
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WatcherConfig {
    pub enabled: bool,
    pub poll_interval_ms: u64,
}

/// Texts users see when something goes wrong or takes a while
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MessagesConfig {
    pub command_error: String,
    pub callback_error: String,
    pub loading: String,
    pub loading_done: String,
    pub media_error: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "cocoa-bot".to_string(),
            prefix: "/".to_string(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            poll_timeout_secs: 30,
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./plugins"),
            extension: "yaml".to_string(),
        }
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 500,
        }
    }
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            command_error: "❌ Error while running the command.".to_string(),
            callback_error: "❌ Callback error".to_string(),
            loading: "⏳ Loading...".to_string(),
            loading_done: "✅ Done.".to_string(),
            media_error: "❌ Failed to send file.".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Load `path` if it exists, defaults otherwise; env overrides and
    /// validation apply either way
    pub fn resolve(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `BOT_TOKEN` / `BOT_PREFIX` from the given lookup
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("BOT_TOKEN").filter(|t| !t.is_empty()) {
            self.telegram.token = Some(token);
        }

        if let Some(prefix) = var("BOT_PREFIX") {
            self.bot.prefix = prefix;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.chars().count() != 1 {
            return Err(ConfigError::InvalidValue(format!(
                "bot.prefix must be a single character, got {:?}",
                self.bot.prefix
            )));
        }
        if self.watcher.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "watcher.poll-interval-ms must be greater than 0".to_string(),
            ));
        }
        if self.plugins.extension.trim_start_matches('.').is_empty() {
            return Err(ConfigError::MissingField("plugins.extension".to_string()));
        }
        Ok(())
    }

    pub fn prefix(&self) -> char {
        self.bot.prefix.chars().next().unwrap_or('/')
    }

    /// Extension without a leading dot
    pub fn plugin_extension(&self) -> &str {
        self.plugins.extension.trim_start_matches('.')
    }

    pub fn token(&self) -> Option<&str> {
        self.telegram.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_owner(&self, user_id: i64) -> bool {
        self.owners.contains(&user_id)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
