use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    messaging::types::MessagingCapabilities,
    Result,
};

/// Outbound messaging port.
///
/// Telegram is the only implementation; the router and generation flow only
/// ever talk to this trait so they can be driven by fakes in tests.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Upload the file at `path` as a photo with `caption`.
    async fn send_photo(&self, chat_id: ChatId, path: &Path, caption: &str)
        -> Result<MessageRef>;

    /// Point the platform's webhook at `url`.
    async fn set_webhook(&self, url: &str) -> Result<()>;
}
