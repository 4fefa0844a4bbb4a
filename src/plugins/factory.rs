//! Handler factory - turns manifest settings into live handlers

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::errors::PluginResult;
use crate::domain::entities::CommandSpec;
use crate::infrastructure::plugins::HandlerSpec;
use super::exec::ExecHandler;
use super::get::GetHandler;
use super::media::MediaHandler;
use super::menu::MenuHandler;
use super::reply::ReplyHandler;
use super::CommandHandler;

/// Process-wide values handlers are built with
#[derive(Debug, Clone)]
pub struct PluginEnv {
    pub bot_name: String,
    /// User ids shown with the Owner role
    pub owners: Vec<i64>,
    /// Base for relative paths in manifests
    pub plugin_dir: PathBuf,
    pub http: reqwest::Client,
    /// Sent when a local media file cannot be read
    pub media_error: String,
}

impl PluginEnv {
    pub fn new(bot_name: impl Into<String>, plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bot_name: bot_name.into(),
            owners: Vec::new(),
            plugin_dir: plugin_dir.into(),
            http: reqwest::Client::new(),
            media_error: "❌ Failed to send file.".to_string(),
        }
    }

    pub fn with_owners(mut self, owners: Vec<i64>) -> Self {
        self.owners = owners;
        self
    }

    pub fn with_media_error(mut self, notice: impl Into<String>) -> Self {
        self.media_error = notice.into();
        self
    }
}

/// Builds handlers for every kind a manifest may name
#[derive(Clone)]
pub struct HandlerFactory {
    env: Arc<PluginEnv>,
}

impl HandlerFactory {
    pub fn new(env: PluginEnv) -> Self {
        Self { env: Arc::new(env) }
    }

    pub fn build(&self, spec: CommandSpec, handler: HandlerSpec) -> PluginResult<Arc<dyn CommandHandler>> {
        let handler: Arc<dyn CommandHandler> = match handler {
            HandlerSpec::Reply(settings) => Arc::new(ReplyHandler::new(spec, settings)?),
            HandlerSpec::Media(settings) => Arc::new(MediaHandler::new(spec, settings, &self.env)?),
            HandlerSpec::Get(settings) => Arc::new(GetHandler::new(spec, settings, &self.env)),
            HandlerSpec::Menu(settings) => Arc::new(MenuHandler::new(spec, settings, &self.env)?),
            HandlerSpec::Exec(settings) => Arc::new(ExecHandler::new(spec, settings, &self.env)?),
        };
        Ok(handler)
    }
}
