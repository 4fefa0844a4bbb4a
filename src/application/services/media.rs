use std::path::Path;

use crate::application::errors::BotError;
use crate::domain::entities::{ChatId, MessageId};
use crate::domain::traits::{Bot, InputFile, SendOptions};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Photo,
    Video,
    Document,
}

impl MediaKind {
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Photo
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else {
            MediaKind::Document
        }
    }
}

/// Send a local file, choosing photo, video or document by extension.
///
/// A file that cannot be read is logged and replaced by `failure_notice`.
pub async fn send_media(
    bot: &dyn Bot,
    chat_id: ChatId,
    path: &Path,
    opts: SendOptions,
    failure_notice: &str,
) -> Result<MessageId, BotError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(chat_id, "sendMedia error: {}: {}", path.display(), e);
            return bot.send_message(chat_id, failure_notice, SendOptions::default()).await;
        }
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let file = InputFile::new(name, bytes);

    match MediaKind::for_path(path) {
        MediaKind::Photo => bot.send_photo(chat_id, file, opts).await,
        MediaKind::Video => bot.send_video(chat_id, file, opts).await,
        MediaKind::Document => bot.send_document(chat_id, file, opts).await,
    }
}
