//! Application layer errors

use thiserror::Error;

/// Errors raised by a platform connector
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Update stream closed")]
    Closed,
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BotError::Parse(e.to_string())
        } else {
            BotError::Network(e.to_string())
        }
    }
}

/// Plugin loading and validation errors
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to read plugin: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse manifest: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("Missing command in manifest")]
    MissingCommand,

    #[error("Missing handler in manifest")]
    MissingHandler,

    #[error("Invalid handler settings: {0}")]
    InvalidHandler(String),
}

/// Errors surfaced by a handler invocation
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Bot error: {0}")]
    Bot(#[from] BotError),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type PluginResult<T> = Result<T, PluginError>;
pub type HandlerResult = Result<(), HandlerError>;
