//! `get` handler: fetches a URL and sends the result back

use async_trait::async_trait;
use serde::Deserialize;

use crate::application::errors::{BotError, HandlerError, HandlerResult};
use crate::domain::entities::CommandSpec;
use crate::domain::traits::{InputFile, ParseMode, SendOptions};
use super::{truncate_chars, CommandHandler, InboundContext, PluginEnv};

/// Leaves room for the code fence under Telegram's 4096 limit
const MAX_JSON_CHARS: usize = 3500;

/// Telegram's upload limit for bots
const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GetSettings {
    /// Defaults to `<bot name>/1.0`
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Largest response body that is downloaded
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

impl Default for GetSettings {
    fn default() -> Self {
        Self {
            user_agent: None,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

pub struct GetHandler {
    spec: CommandSpec,
    http: reqwest::Client,
    user_agent: String,
    max_bytes: u64,
}

impl GetHandler {
    pub fn new(spec: CommandSpec, settings: GetSettings, env: &PluginEnv) -> Self {
        let user_agent = settings
            .user_agent
            .unwrap_or_else(|| format!("{}/1.0", env.bot_name));

        Self {
            spec,
            http: env.http.clone(),
            user_agent,
            max_bytes: settings.max_bytes,
        }
    }

    /// Read the body in chunks, giving up once it passes `max_bytes`
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, HandlerError> {
        let too_large = || HandlerError::ExecutionFailed(format!("response larger than {} bytes", self.max_bytes));

        if response.content_length().is_some_and(|len| len > self.max_bytes) {
            return Err(too_large());
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(BotError::from)? {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }

    async fn fetch_and_send(&self, ctx: &InboundContext, url: &str) -> HandlerResult {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(BotError::from)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_lowercase();

        let bytes = self.read_capped(response).await?;
        let filename = format!(
            "file_{}.{}",
            chrono::Utc::now().timestamp_millis(),
            extension_for(&content_type)
        );
        let chat_id = ctx.chat_id();
        let opts = SendOptions::reply_to(ctx.message.message_id);

        if content_type.contains("image") {
            ctx.bot
                .send_photo(
                    chat_id,
                    InputFile::new(filename, bytes),
                    opts.with_caption(format!("Fetched image from:\n{}", url)),
                )
                .await?;
        } else if content_type.contains("json") {
            let value: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|e| HandlerError::ExecutionFailed(format!("invalid JSON: {}", e)))?;
            let pretty = serde_json::to_string_pretty(&value)
                .map_err(|e| HandlerError::ExecutionFailed(e.to_string()))?;
            let text = format!("📄 JSON:\n```\n{}\n```", truncate_chars(&pretty, MAX_JSON_CHARS));
            ctx.bot
                .send_message(chat_id, &text, opts.with_parse_mode(ParseMode::Markdown))
                .await?;
        } else if content_type.contains("text/html") {
            ctx.bot
                .send_document(
                    chat_id,
                    InputFile::new(filename, bytes),
                    opts.with_caption(format!("📄 HTML from:\n{}", url)),
                )
                .await?;
        } else {
            ctx.bot
                .send_document(
                    chat_id,
                    InputFile::new(filename, bytes),
                    opts.with_caption(format!("📦 File from:\n{}", url)),
                )
                .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CommandHandler for GetHandler {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
        let url = ctx.args.trim();
        if !url.starts_with("http") {
            ctx.reply("Please provide a valid URL!").await?;
            return Ok(());
        }

        if let Err(e) = self.fetch_and_send(&ctx, url).await {
            tracing::error!(url, "GET error: {}", e);
            ctx.reply(&format!("❌ Failed to fetch data:\n{}", e)).await?;
        }
        Ok(())
    }
}

/// File extension for a Content-Type value
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        "audio/wav" | "audio/x-wav" => "wav",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "text/html" => "html",
        "text/plain" => "txt",
        "text/css" => "css",
        "text/csv" => "csv",
        "application/json" => "json",
        "application/pdf" => "pdf",
        "application/zip" => "zip",
        "application/xml" | "text/xml" => "xml",
        "application/javascript" | "text/javascript" => "js",
        _ => "bin",
    }
}
