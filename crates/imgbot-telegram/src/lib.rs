//! Telegram adapter (teloxide).
//!
//! Implements the `imgbot-core` MessagingPort over the Telegram Bot API and
//! converts raw webhook updates into core updates.

use std::path::Path;

use async_trait::async_trait;

use teloxide::{prelude::*, types::InputFile};

use tracing::info;

pub mod update;

use imgbot_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

pub use update::to_incoming;

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn from_token(token: impl Into<String>) -> Self {
        Self::new(Bot::new(token))
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    /// The bot's own `@username`, used to tell which commands are ours.
    pub async fn username(&self) -> Result<String> {
        let me = self.bot.get_me().await.map_err(Self::map_err)?;
        Ok(me.username().to_string())
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: 4096,
            max_caption_len: 1024,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        path: &Path,
        caption: &str,
    ) -> Result<MessageRef> {
        let msg = self
            .bot
            .send_photo(Self::tg_chat(chat_id), InputFile::file(path.to_path_buf()))
            .caption(caption.to_string())
            .await
            .map_err(Self::map_err)?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn set_webhook(&self, url: &str) -> Result<()> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid webhook url {url:?}: {e}")))?;
        self.bot
            .set_webhook(parsed)
            .await
            .map_err(Self::map_err)?;
        info!("Webhook set to {url}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    };

    use axum::{extract::State, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    /// Stand-in Bot API answering every method with `reply`.
    async fn fake_api(reply: Value) -> (TelegramMessenger, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .fallback(|State((calls, reply)): State<(Arc<AtomicUsize>, Value)>| async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Json(reply)
            })
            .with_state((calls.clone(), reply));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).unwrap();
        let bot = Bot::new("123:test").set_api_url(api_url);
        (TelegramMessenger::new(bot), calls)
    }

    #[tokio::test]
    async fn send_text_returns_message_ref() {
        let (messenger, calls) = fake_api(json!({
            "ok": true,
            "result": {
                "message_id": 42,
                "date": 1_700_000_000,
                "chat": { "id": 555, "type": "private", "first_name": "Ana" },
                "text": "hi"
            }
        }))
        .await;

        let sent = messenger.send_text(ChatId(555), "hi").await.unwrap();
        assert_eq!(sent.message_id, MessageId(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flood_control_is_reported_without_resending() {
        let (messenger, calls) = fake_api(json!({
            "ok": false,
            "error_code": 429,
            "description": "Too Many Requests: retry after 5",
            "parameters": { "retry_after": 5 }
        }))
        .await;

        let started = Instant::now();
        let err = messenger.send_text(ChatId(555), "hi").await.unwrap_err();

        assert!(matches!(err, Error::External(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
