//! Telegram adapter

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::application::errors::BotError;
use crate::domain::entities::{self, ChatId, ChatKind, MessageId};
use crate::domain::traits::{Bot, BotInfo, InputFile, KeyboardButton, SendOptions, UpdateSource};

/// Telegram API base URL
const API_BASE: &str = "https://api.telegram.org";

/// Envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Telegram update type
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    /// Absent for media; captions are never read as commands
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Serialize)]
struct InlineKeyboardButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Serialize)]
struct ReplyMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl From<Vec<Vec<KeyboardButton>>> for ReplyMarkup {
    fn from(rows: Vec<Vec<KeyboardButton>>) -> Self {
        let inline_keyboard = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|btn| InlineKeyboardButton {
                        text: btn.text,
                        callback_data: btn.callback_data,
                        url: btn.url,
                    })
                    .collect()
            })
            .collect();
        Self { inline_keyboard }
    }
}

impl From<User> for entities::User {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            is_bot: u.is_bot,
        }
    }
}

impl From<Message> for entities::InboundMessage {
    fn from(m: Message) -> Self {
        Self {
            message_id: m.message_id,
            chat: entities::Chat {
                id: m.chat.id,
                kind: ChatKind::from_api(&m.chat.kind),
                title: m.chat.title,
            },
            from: m.from.map(Into::into),
            text: m.text,
        }
    }
}

impl Update {
    /// Domain event, if this update carries one we handle
    pub fn into_domain(self) -> Option<entities::Update> {
        if let Some(message) = self.message {
            return Some(entities::Update::Message(message.into()));
        }

        self.callback_query.map(|cb| {
            entities::Update::Callback(entities::CallbackQuery {
                id: cb.id,
                from: cb.from.into(),
                message: cb.message.map(Into::into),
                data: cb.data,
            })
        })
    }
}

/// Telegram bot adapter
pub struct TelegramAdapter {
    token: String,
    api_base: String,
    client: Client,
    info: BotInfo,
    /// Next getUpdates offset; only advanced once a batch is handed out
    offset: AtomicI64,
    poll_timeout_secs: u64,
}

impl TelegramAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            api_base: API_BASE.to_string(),
            client: Client::new(),
            info: BotInfo {
                id: "unknown".to_string(),
                name: "cocoa-bot".to_string(),
                username: "cocoa_bot".to_string(),
            },
            offset: AtomicI64::new(0),
            poll_timeout_secs: 30,
        }
    }

    /// Point at another Bot API server
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, body: &impl Serialize) -> Result<R, BotError> {
        let response = self.client.post(self.api_url(method)).json(body).send().await?;
        Self::decode(method, response).await
    }

    async fn decode<R: DeserializeOwned>(method: &str, response: reqwest::Response) -> Result<R, BotError> {
        let status = response.status();
        let data: ApiResponse<R> = response.json().await?;

        if !data.ok {
            return Err(BotError::Api(format!(
                "{} failed ({}): {}",
                method,
                status,
                data.description.unwrap_or_default()
            )));
        }

        data.result
            .ok_or_else(|| BotError::Parse(format!("{} returned no result", method)))
    }

    /// Fetch bot info from Telegram API
    pub async fn fetch_bot_info(&mut self) -> Result<(), BotError> {
        #[derive(Deserialize)]
        struct Me {
            id: i64,
            first_name: String,
            username: Option<String>,
        }

        let me: Me = self.call("getMe", &serde_json::json!({})).await?;
        self.info = BotInfo {
            id: me.id.to_string(),
            username: me.username.unwrap_or_else(|| me.first_name.clone()),
            name: me.first_name,
        };

        Ok(())
    }

    /// Get updates from Telegram using getUpdates API
    pub async fn get_updates(&self, offset: i64, timeout: u64) -> Result<Vec<Update>, BotError> {
        #[derive(Serialize)]
        struct GetUpdatesRequest {
            offset: i64,
            timeout: u64,
            allowed_updates: [&'static str; 2],
        }

        let request = GetUpdatesRequest {
            offset,
            timeout,
            allowed_updates: ["message", "callback_query"],
        };

        self.call("getUpdates", &request).await
    }

    /// Get the next update offset
    pub fn next_offset(current: i64, updates: &[Update]) -> i64 {
        updates
            .iter()
            .map(|u| u.update_id + 1)
            .max()
            .unwrap_or(current)
            .max(current)
    }

    /// Publish the command list shown in Telegram's command menu
    pub async fn register_commands(&self, commands: &[(String, String)]) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct Command<'a> {
            command: &'a str,
            description: &'a str,
        }

        #[derive(Serialize)]
        struct SetMyCommandsRequest<'a> {
            commands: Vec<Command<'a>>,
        }

        let request = SetMyCommandsRequest {
            commands: commands
                .iter()
                .map(|(command, description)| Command { command, description })
                .collect(),
        };

        let _: bool = self.call("setMyCommands", &request).await?;
        tracing::info!("Registered {} bot commands with Telegram", commands.len());
        Ok(())
    }

    async fn upload(
        &self,
        method: &str,
        field: &'static str,
        chat_id: ChatId,
        file: InputFile,
        opts: SendOptions,
    ) -> Result<MessageId, BotError> {
        let part = Part::bytes(file.bytes).file_name(file.name);
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field, part);

        if let Some(caption) = opts.caption {
            form = form.text("caption", caption);
        }
        if let Some(reply_to) = opts.reply_to {
            form = form.text("reply_to_message_id", reply_to.to_string());
        }
        if let Some(mode) = opts.parse_mode {
            form = form.text("parse_mode", mode.as_str());
        }
        if let Some(keyboard) = opts.keyboard {
            let markup = serde_json::to_string(&ReplyMarkup::from(keyboard))
                .map_err(|e| BotError::Parse(e.to_string()))?;
            form = form.text("reply_markup", markup);
        }

        let response = self
            .client
            .post(self.api_url(method))
            .multipart(form)
            .send()
            .await?;
        let sent: SentMessage = Self::decode(method, response).await?;
        Ok(sent.message_id)
    }
}

#[async_trait]
impl Bot for TelegramAdapter {
    async fn send_message(&self, chat_id: ChatId, text: &str, opts: SendOptions) -> Result<MessageId, BotError> {
        #[derive(Serialize)]
        struct SendMessageRequest<'a> {
            chat_id: ChatId,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            parse_mode: Option<&'static str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_to_message_id: Option<MessageId>,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_markup: Option<ReplyMarkup>,
            #[serde(skip_serializing_if = "std::ops::Not::not")]
            disable_web_page_preview: bool,
        }

        tracing::debug!(chat_id, "Sending: {}", text);
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: opts.parse_mode.map(|m| m.as_str()),
            reply_to_message_id: opts.reply_to,
            reply_markup: opts.keyboard.map(ReplyMarkup::from),
            disable_web_page_preview: opts.disable_web_page_preview,
        };

        let sent: SentMessage = self.call("sendMessage", &request).await?;
        Ok(sent.message_id)
    }

    async fn send_photo(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.upload("sendPhoto", "photo", chat_id, file, opts).await
    }

    async fn send_video(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.upload("sendVideo", "video", chat_id, file, opts).await
    }

    async fn send_document(&self, chat_id: ChatId, file: InputFile, opts: SendOptions) -> Result<MessageId, BotError> {
        self.upload("sendDocument", "document", chat_id, file, opts).await
    }

    async fn edit_message_text(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<(), BotError> {
        let request = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });

        // Answers with the edited message, or `true` for inline messages
        let _: serde_json::Value = self.call("editMessageText", &request).await?;
        Ok(())
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), BotError> {
        let request = serde_json::json!({
            "chat_id": chat_id,
            "message_id": message_id,
        });

        let _: bool = self.call("deleteMessage", &request).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<(), BotError> {
        #[derive(Serialize)]
        struct AnswerRequest<'a> {
            callback_query_id: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
        }

        let request = AnswerRequest {
            callback_query_id: callback_id,
            text,
        };

        let _: bool = self.call("answerCallbackQuery", &request).await?;
        Ok(())
    }

    async fn set_commands(&self, commands: &[(String, String)]) -> Result<(), BotError> {
        self.register_commands(commands).await
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

#[async_trait]
impl UpdateSource for TelegramAdapter {
    async fn poll_updates(&self) -> Result<Vec<entities::Update>, BotError> {
        let offset = self.offset.load(Ordering::SeqCst);
        let updates = self.get_updates(offset, self.poll_timeout_secs).await?;
        self.offset
            .store(Self::next_offset(offset, &updates), Ordering::SeqCst);

        Ok(updates.into_iter().filter_map(Update::into_domain).collect())
    }
}
