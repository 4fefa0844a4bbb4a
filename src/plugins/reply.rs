//! `reply` handler: answers with a fixed text

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::errors::{HandlerResult, PluginError, PluginResult};
use crate::domain::entities::CommandSpec;
use crate::domain::traits::{ParseMode, SendOptions};
use super::{CommandHandler, InboundContext};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReplySettings {
    /// Reply text; `{args}`, `{name}` and `{command}` are filled in
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub markdown: bool,
}

pub struct ReplyHandler {
    spec: CommandSpec,
    settings: ReplySettings,
}

impl ReplyHandler {
    pub fn new(spec: CommandSpec, settings: ReplySettings) -> PluginResult<Self> {
        if settings.text.trim().is_empty() {
            return Err(PluginError::InvalidHandler("reply needs a non-empty `text`".to_string()));
        }
        Ok(Self { spec, settings })
    }

    fn render(&self, ctx: &InboundContext) -> String {
        let name = ctx
            .message
            .from
            .as_ref()
            .map(|u| u.display_name())
            .unwrap_or_else(|| "there".to_string());

        self.settings
            .text
            .replace("{args}", &ctx.args)
            .replace("{name}", &name)
            .replace("{command}", &ctx.command)
    }
}

#[async_trait]
impl CommandHandler for ReplyHandler {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
        let mut opts = SendOptions::reply_to(ctx.message.message_id);
        if self.settings.markdown {
            opts = opts.with_parse_mode(ParseMode::Markdown);
        }
        ctx.bot.send_message(ctx.chat_id(), &self.render(&ctx), opts).await?;
        Ok(())
    }
}
