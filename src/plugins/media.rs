//! `media` handler: sends a local file

use std::path::PathBuf;
use async_trait::async_trait;
use serde::Deserialize;

use crate::application::errors::{HandlerResult, PluginError, PluginResult};
use crate::application::services::send_media;
use crate::domain::entities::CommandSpec;
use crate::domain::traits::SendOptions;
use super::{CommandHandler, InboundContext, PluginEnv};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MediaSettings {
    /// File to send; relative paths resolve against the plugin directory
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub caption: Option<String>,
}

pub struct MediaHandler {
    spec: CommandSpec,
    path: PathBuf,
    caption: Option<String>,
    failure_notice: String,
}

impl MediaHandler {
    pub fn new(spec: CommandSpec, settings: MediaSettings, env: &PluginEnv) -> PluginResult<Self> {
        if settings.path.as_os_str().is_empty() {
            return Err(PluginError::InvalidHandler("media needs a `path`".to_string()));
        }

        let path = if settings.path.is_relative() {
            env.plugin_dir.join(&settings.path)
        } else {
            settings.path
        };

        Ok(Self {
            spec,
            path,
            caption: settings.caption,
            failure_notice: env.media_error.clone(),
        })
    }
}

#[async_trait]
impl CommandHandler for MediaHandler {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
        let mut opts = SendOptions::reply_to(ctx.message.message_id);
        if let Some(caption) = &self.caption {
            opts = opts.with_caption(caption.clone());
        }

        send_media(ctx.bot.as_ref(), ctx.chat_id(), &self.path, opts, &self.failure_notice).await?;
        Ok(())
    }
}
