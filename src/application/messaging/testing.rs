//! Recording bot used by unit tests

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::domain::entities::{ChatId, MessageId};
use crate::domain::traits::{Bot, BotInfo, InputFile, KeyboardButton, ParseMode, SendOptions};

/// One call made against the bot
#[derive(Debug, Clone, Default)]
pub struct Sent {
    pub method: &'static str,
    pub chat_id: ChatId,
    pub message_id: Option<MessageId>,
    /// Message text, caption for media, notice text for callbacks
    pub text: String,
    pub reply_to: Option<MessageId>,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<Vec<Vec<KeyboardButton>>>,
    pub file_name: Option<String>,
    pub file_len: usize,
    pub callback_id: Option<String>,
}

pub struct RecordingBot {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail: bool,
}

impl RecordingBot {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            fail: false,
        }
    }

    /// A bot whose every call errors
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_with(&self, method: &str) -> Vec<Sent> {
        self.sent().into_iter().filter(|s| s.method == method).collect()
    }

    fn record(&self, sent: Sent) -> Result<MessageId, BotError> {
        if self.fail {
            return Err(BotError::Network("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn media(&self, method: &'static str, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.record(Sent {
            method,
            chat_id,
            text: opts.caption.unwrap_or_default(),
            reply_to: opts.reply_to,
            parse_mode: opts.parse_mode,
            file_len: file.bytes.len(),
            file_name: Some(file.name),
            ..Sent::default()
        })
    }
}

#[async_trait]
impl Bot for RecordingBot {
    async fn send_message(&self, chat_id: ChatId, text: &str, opts: SendOptions) -> Result<MessageId, BotError> {
        self.record(Sent {
            method: "sendMessage",
            chat_id,
            text: text.to_string(),
            reply_to: opts.reply_to,
            parse_mode: opts.parse_mode,
            keyboard: opts.keyboard,
            ..Sent::default()
        })
    }

    async fn send_photo(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.media("sendPhoto", chat_id, file, opts)
    }

    async fn send_video(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.media("sendVideo", chat_id, file, opts)
    }

    async fn send_document(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.media("sendDocument", chat_id, file, opts)
    }

    async fn edit_message_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<(), BotError> {
        self.record(Sent {
            method: "editMessageText",
            chat_id,
            message_id: Some(message_id),
            text: text.to_string(),
            ..Sent::default()
        })
        .map(|_| ())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), BotError> {
        self.record(Sent {
            method: "deleteMessage",
            chat_id,
            message_id: Some(message_id),
            ..Sent::default()
        })
        .map(|_| ())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), BotError> {
        self.record(Sent {
            method: "answerCallbackQuery",
            callback_id: Some(callback_id.to_string()),
            text: text.unwrap_or_default().to_string(),
            ..Sent::default()
        })
        .map(|_| ())
    }

    async fn set_commands(&self, commands: &[(String, String)]) -> Result<(), BotError> {
        let listed: Vec<&str> = commands.iter().map(|(c, _)| c.as_str()).collect();
        self.record(Sent {
            method: "setMyCommands",
            text: listed.join(","),
            ..Sent::default()
        })
        .map(|_| ())
    }

    fn bot_info(&self) -> BotInfo {
        BotInfo {
            id: "1".to_string(),
            name: "Test Bot".to_string(),
            username: "test_bot".to_string(),
        }
    }
}
