use crate::domain::{ChatId, UserId};

/// Messenger-agnostic incoming update.
///
/// Telegram-specific fields stay in the Telegram adapter; only what the
/// router needs crosses the port. Deciding what counts as a command is the
/// adapter's job, since platforms mark commands differently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
}

impl IncomingUpdate {
    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingUpdate::Command(c) => c.chat_id,
            IncomingUpdate::Text(t) => t.chat_id,
        }
    }

    pub fn command(
        chat_id: ChatId,
        user_id: UserId,
        name: impl Into<String>,
        args: impl Into<String>,
    ) -> Self {
        IncomingUpdate::Command(Command {
            chat_id,
            user_id,
            name: name.into().to_lowercase(),
            args: args.into(),
        })
    }

    pub fn text(chat_id: ChatId, user_id: UserId, text: impl Into<String>) -> Self {
        IncomingUpdate::Text(TextMessage {
            chat_id,
            user_id,
            text: text.into(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Lowercased, without the leading `/` or an `@botname` suffix.
    pub name: String,
    pub args: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub text: String,
}

/// Limits of a messenger implementation, in UTF-16 code units.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub max_message_len: usize,
    pub max_caption_len: usize,
}
