//! Console adapter for development/testing
//!
//! Every stdin line is a text message in one private chat. A line starting
//! with `cb:` presses an inline button whose data is the rest of the line.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;

use crate::application::errors::BotError;
use crate::domain::entities::{CallbackQuery, Chat, ChatId, InboundMessage, MessageId, Update, User};
use crate::domain::traits::{Bot, BotInfo, InputFile, KeyboardButton, SendOptions, UpdateSource};

const CONSOLE_CHAT: ChatId = 1;
const CALLBACK_PREFIX: &str = "cb:";

type LineReader = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    lines: Mutex<LineReader>,
    next_id: AtomicI64,
    user: User,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self::from_reader(tokio::io::stdin())
    }

    pub fn from_reader(reader: impl AsyncRead + Unpin + Send + 'static) -> Self {
        let reader: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(BufReader::new(reader));
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "cocoa-bot".to_string(),
                username: "console".to_string(),
            },
            lines: Mutex::new(reader.lines()),
            next_id: AtomicI64::new(1),
            user: User::new(CONSOLE_CHAT).with_name("Console", None::<String>),
        }
    }

    fn next_id(&self) -> MessageId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn to_update(&self, line: &str) -> Option<Update> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let id = self.next_id();
        let update = match line.strip_prefix(CALLBACK_PREFIX) {
            Some(data) => Update::Callback(CallbackQuery {
                id: format!("console-{}", id),
                from: self.user.clone(),
                message: Some(InboundMessage::new(id, Chat::private(CONSOLE_CHAT), "")),
                data: Some(data.trim().to_string()),
            }),
            None => Update::Message(
                InboundMessage::new(id, Chat::private(CONSOLE_CHAT), line).with_sender(self.user.clone()),
            ),
        };
        Some(update)
    }

    fn print_keyboard(keyboard: &[Vec<KeyboardButton>]) {
        for row in keyboard {
            let row_text: Vec<String> = row
                .iter()
                .map(|b| match (&b.callback_data, &b.url) {
                    (Some(data), _) => format!("{} ({}{})", b.text, CALLBACK_PREFIX, data),
                    (None, Some(url)) => format!("{} <{}>", b.text, url),
                    (None, None) => b.text.clone(),
                })
                .collect();
            println!("  [Buttons] {}", row_text.join(" | "));
        }
    }

    fn print_file(&self, kind: &str, file: &InputFile, opts: &SendOptions) -> MessageId {
        let id = self.next_id();
        println!("[BOT #{}] <{}: {}, {} bytes>", id, kind, file.name, file.bytes.len());
        if let Some(caption) = &opts.caption {
            println!("  {}", caption);
        }
        id
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn send_message(&self, _chat_id: ChatId, text: &str, opts: SendOptions) -> Result<MessageId, BotError> {
        let id = self.next_id();
        println!("[BOT #{}] {}", id, text);
        if let Some(keyboard) = &opts.keyboard {
            Self::print_keyboard(keyboard);
        }
        Ok(id)
    }

    async fn send_photo(&self, _chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        Ok(self.print_file("photo", &file, &opts))
    }

    async fn send_video(&self, _chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        Ok(self.print_file("video", &file, &opts))
    }

    async fn send_document(&self, _chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        Ok(self.print_file("document", &file, &opts))
    }

    async fn edit_message_text(&self, _chat_id: ChatId, message_id: MessageId, text: &str) -> Result<(), BotError> {
        println!("[BOT #{} edited] {}", message_id, text);
        Ok(())
    }

    async fn delete_message(&self, _chat_id: ChatId, message_id: MessageId) -> Result<(), BotError> {
        println!("[BOT #{} deleted]", message_id);
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, text: Option<&str>) -> Result<(), BotError> {
        if let Some(text) = text {
            println!("[BOT toast] {}", text);
        }
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[async_trait]
impl UpdateSource for ConsoleAdapter {
    async fn poll_updates(&self) -> Result<Vec<Update>, BotError> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(self.to_update(&line).into_iter().collect()),
            None => Err(BotError::Closed),
        }
    }
}
