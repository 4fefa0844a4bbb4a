//! Handler contract every plugin satisfies

use std::sync::Arc;
use async_trait::async_trait;

use crate::application::errors::{BotError, HandlerResult};
use crate::application::messaging::LoadingTracker;
use crate::domain::entities::{CallbackQuery, ChatId, CommandSpec, InboundMessage, MessageId};
use crate::domain::traits::{Bot, SendOptions};
use crate::infrastructure::plugins::Generation;

/// Core trait that all command handlers implement
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Commands, tags and usage lines this handler is registered with
    fn spec(&self) -> &CommandSpec;

    /// Handle a command addressed to this handler
    async fn invoke(&self, ctx: InboundContext) -> HandlerResult;

    /// Which callback events this handler wants to see
    fn callback_interest(&self) -> CallbackInterest {
        CallbackInterest::None
    }

    /// Optional: handle an inline-button press
    async fn on_callback(&self, _ctx: CallbackContext) -> HandlerResult {
        Ok(())
    }

    fn commands(&self) -> &[String] {
        &self.spec().commands
    }

    fn tags(&self) -> &[String] {
        &self.spec().tags
    }

    fn help(&self) -> &[String] {
        &self.spec().help
    }
}

/// Filter applied before a callback event is fanned out to a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackInterest {
    /// Handler has no callback logic
    None,
    /// Every callback event, the handler filters itself
    All,
    /// Only callback data starting with this prefix
    Prefix(String),
}

impl CallbackInterest {
    pub fn accepts(&self, data: &str) -> bool {
        match self {
            CallbackInterest::None => false,
            CallbackInterest::All => true,
            CallbackInterest::Prefix(prefix) => data.starts_with(prefix.as_str()),
        }
    }
}

/// Everything a single command invocation gets to work with
#[derive(Clone)]
pub struct InboundContext {
    pub bot: Arc<dyn Bot>,
    pub message: InboundMessage,
    /// Command token the message was routed by
    pub command: String,
    /// Remaining words, joined with single spaces
    pub args: String,
    /// Registry generation the command was resolved against
    pub plugins: Arc<Generation>,
    pub loading: Arc<LoadingTracker>,
}

impl InboundContext {
    pub fn chat_id(&self) -> ChatId {
        self.message.chat.id
    }

    /// Reply to the originating message with plain text
    pub async fn reply(&self, text: &str) -> Result<MessageId, BotError> {
        self.bot
            .send_message(self.chat_id(), text, SendOptions::reply_to(self.message.message_id))
            .await
    }

    pub async fn start_loading(&self) {
        self.loading
            .start(self.bot.as_ref(), self.chat_id(), self.message.message_id)
            .await;
    }

    pub async fn finish_loading(&self) {
        self.loading
            .finish(self.bot.as_ref(), self.chat_id(), self.message.message_id)
            .await;
    }
}

/// Context handed to `on_callback`
#[derive(Clone)]
pub struct CallbackContext {
    pub bot: Arc<dyn Bot>,
    pub query: CallbackQuery,
    pub plugins: Arc<Generation>,
}
