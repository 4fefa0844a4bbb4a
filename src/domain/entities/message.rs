use super::User;

pub type ChatId = i64;
pub type MessageId = i64;

/// Kind of chat a message arrived in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    Other(String),
}

impl ChatKind {
    pub fn from_api(kind: &str) -> Self {
        match kind {
            "private" => ChatKind::Private,
            "group" => ChatKind::Group,
            "supergroup" => ChatKind::Supergroup,
            "channel" => ChatKind::Channel,
            other => ChatKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ChatKind::Private => "private",
            ChatKind::Group => "group",
            ChatKind::Supergroup => "supergroup",
            ChatKind::Channel => "channel",
            ChatKind::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
}

impl Chat {
    pub fn private(id: ChatId) -> Self {
        Self {
            id,
            kind: ChatKind::Private,
            title: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.kind == ChatKind::Private
    }

    /// Name shown in operator logs
    pub fn display_name(&self) -> &str {
        if self.is_private() {
            "Direct Message"
        } else {
            self.title.as_deref().unwrap_or("Unnamed Group")
        }
    }
}

/// An inbound message as delivered by the platform
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

impl InboundMessage {
    pub fn new(message_id: MessageId, chat: Chat, text: impl Into<String>) -> Self {
        Self {
            message_id,
            chat,
            from: None,
            text: Some(text.into()),
        }
    }

    pub fn with_sender(mut self, user: User) -> Self {
        self.from = Some(user);
        self
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }
}

/// An inline-button press
#[derive(Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<InboundMessage>,
    pub data: Option<String>,
}

impl CallbackQuery {
    pub fn data(&self) -> &str {
        self.data.as_deref().unwrap_or_default()
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.message.as_ref().map(|m| m.chat.id)
    }
}

/// Inbound platform event
#[derive(Debug, Clone)]
pub enum Update {
    Message(InboundMessage),
    Callback(CallbackQuery),
}
