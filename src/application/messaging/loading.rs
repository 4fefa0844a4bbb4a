//! Loading indicators - "working on it" messages tied to one command

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::entities::{ChatId, MessageId};
use crate::domain::traits::{Bot, SendOptions};

/// Tracks the loading message posted for a (chat, originating message) pair.
///
/// Every `start` is paired with a `finish`; the dispatcher also calls
/// `discard` once a command returns so an unfinished entry never outlives
/// the dispatch that created it.
pub struct LoadingTracker {
    pending: Mutex<HashMap<(ChatId, MessageId), MessageId>>,
    loading_text: String,
    done_text: String,
}

impl LoadingTracker {
    pub fn new(loading_text: impl Into<String>, done_text: impl Into<String>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            loading_text: loading_text.into(),
            done_text: done_text.into(),
        }
    }

    /// Post the loading message as a reply to `origin`
    pub async fn start(&self, bot: &dyn Bot, chat_id: ChatId, origin: MessageId) {
        match bot
            .send_message(chat_id, &self.loading_text, SendOptions::reply_to(origin))
            .await
        {
            Ok(loading_id) => {
                self.lock().insert((chat_id, origin), loading_id);
            }
            Err(e) => tracing::error!(chat_id, "loading() error: {}", e),
        }
    }

    /// Flip the loading message to the done text and forget it
    pub async fn finish(&self, bot: &dyn Bot, chat_id: ChatId, origin: MessageId) {
        let Some(loading_id) = self.lock().remove(&(chat_id, origin)) else {
            return;
        };

        if let Err(e) = bot.edit_message_text(chat_id, loading_id, &self.done_text).await {
            // Usually the message was deleted by a user
            tracing::error!(chat_id, "loading() error: {}", e);
        }
    }

    /// Drop a pending entry without touching the chat
    pub fn discard(&self, chat_id: ChatId, origin: MessageId) -> bool {
        self.lock().remove(&(chat_id, origin)).is_some()
    }

    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(ChatId, MessageId), MessageId>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for LoadingTracker {
    fn default() -> Self {
        Self::new("⏳ Loading...", "✅ Done.")
    }
}
