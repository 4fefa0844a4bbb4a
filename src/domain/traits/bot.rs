use async_trait::async_trait;
use crate::domain::entities::{ChatId, MessageId, Update};
use crate::application::errors::BotError;

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: Send + Sync {
    /// Send a text message to a chat
    async fn send_message(&self, chat_id: ChatId, text: &str, opts: SendOptions) -> Result<MessageId, BotError>;

    async fn send_photo(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError>;

    async fn send_video(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError>;

    async fn send_document(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError>;

    /// Replace the text of a message the bot sent earlier
    async fn edit_message_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<(), BotError>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), BotError>;

    /// Answer a callback query
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), BotError>;

    /// Publish the command menu; platforms without one ignore it
    async fn set_commands(&self, _commands: &[(String, String)]) -> Result<(), BotError> {
        Ok(())
    }

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Source of inbound platform events
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Wait for the next batch of updates. An empty batch is not an error.
    async fn poll_updates(&self) -> Result<Vec<Update>, BotError>;
}

/// Text formatting mode understood by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::Markdown => "Markdown",
        }
    }
}

/// Optional parameters shared by the send operations
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub reply_to: Option<MessageId>,
    pub parse_mode: Option<ParseMode>,
    /// Media caption; ignored for text messages
    pub caption: Option<String>,
    pub keyboard: Option<Vec<Vec<KeyboardButton>>>,
    pub disable_web_page_preview: bool,
}

impl SendOptions {
    pub fn reply_to(message_id: MessageId) -> Self {
        Self {
            reply_to: Some(message_id),
            ..Self::default()
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn with_keyboard(mut self, keyboard: Vec<Vec<KeyboardButton>>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn without_preview(mut self) -> Self {
        self.disable_web_page_preview = true;
        self
    }
}

/// In-memory file upload
#[derive(Debug, Clone)]
pub struct InputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Keyboard button for inline keyboards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardButton {
    pub text: String,
    pub callback_data: Option<String>,
    pub url: Option<String>,
}

impl KeyboardButton {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: None,
        }
    }

    pub fn with_callback(mut self, data: impl Into<String>) -> Self {
        self.callback_data = Some(data.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Bot information
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
