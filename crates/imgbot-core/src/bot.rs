//! Update routing and the image generation flow.

use std::{path::PathBuf, sync::Arc};

use tracing::{debug, error, info, warn};

use crate::{
    config::Config,
    domain::{ChatId, UserId},
    inference::{GenerationOutcome, GenerationParameters, GenerationRequest, InferenceClient},
    messaging::{port::MessagingPort, types::IncomingUpdate},
    staging::StagedImage,
    Result,
};

pub const GREETING: &str = "Halo! Saya bot pembuat gambar gratis. Kirim deskripsi gambar, \
misalnya: \"A cat in a spaceship\". Catatan: Proses bisa memakan waktu 10-30 detik.";
pub const GENERIC_FAILURE: &str = "Terjadi kesalahan saat menghasilkan gambar. Coba lagi nanti.";

pub fn processing_text(prompt: &str) -> String {
    format!("Memproses: {prompt}... Harap tunggu (bisa 10-30 detik).")
}

pub fn caption_for(prompt: &str) -> String {
    format!("Gambar untuk: {prompt}")
}

pub fn failure_text(reason: &str) -> String {
    format!("Gagal menghasilkan gambar: {reason}")
}

/// Telegram measures text limits in UTF-16 code units.
fn truncate_utf16(s: &str, max: usize) -> String {
    if s.encode_utf16().count() <= max {
        return s.to_string();
    }
    let budget = max.saturating_sub(3);
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        used += c.len_utf16();
        if used > budget {
            break;
        }
        out.push(c);
    }
    out.push_str("...");
    out
}

/// Routes incoming updates to the greeting responder or the generation flow.
///
/// Holds no per-request state; one instance serves every webhook call.
pub struct ImageBot {
    messenger: Arc<dyn MessagingPort>,
    inference: Arc<dyn InferenceClient>,
    parameters: GenerationParameters,
    temp_dir: PathBuf,
}

impl ImageBot {
    pub fn new(
        cfg: &Config,
        messenger: Arc<dyn MessagingPort>,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        Self {
            messenger,
            inference,
            parameters: cfg.generation,
            temp_dir: cfg.temp_dir.clone(),
        }
    }

    /// Dispatch one update. Exactly one handler runs.
    ///
    /// Errors are only returned when the greeting or the "processing" notice
    /// cannot be delivered; generation failures are reported in the chat.
    pub async fn handle(&self, update: IncomingUpdate) -> Result<()> {
        match update {
            IncomingUpdate::Command(cmd) if cmd.name == "start" => {
                self.send_greeting(cmd.chat_id).await
            }
            IncomingUpdate::Command(cmd) => {
                debug!(chat_id = cmd.chat_id.0, command = %cmd.name, "ignoring unknown command");
                Ok(())
            }
            IncomingUpdate::Text(msg) => self.generate(msg.chat_id, msg.user_id, &msg.text).await,
        }
    }

    async fn send_greeting(&self, chat_id: ChatId) -> Result<()> {
        self.messenger.send_text(chat_id, GREETING).await?;
        Ok(())
    }

    async fn generate(&self, chat_id: ChatId, user_id: UserId, prompt: &str) -> Result<()> {
        let notice = truncate_utf16(
            &processing_text(prompt),
            self.messenger.capabilities().max_message_len,
        );
        self.messenger.send_text(chat_id, &notice).await?;

        info!(chat_id = chat_id.0, "generating image");
        debug!(chat_id = chat_id.0, prompt, "prompt");

        let req = GenerationRequest::new(prompt, self.parameters);
        let outcome = match self.inference.generate(&req).await {
            Ok(outcome) => outcome,
            Err(e) => GenerationOutcome::TransportError(e.to_string()),
        };

        match outcome {
            GenerationOutcome::Success(bytes) => {
                info!(chat_id = chat_id.0, bytes = bytes.len(), "image generated");
                if let Err(e) = self.deliver(chat_id, user_id, prompt, &bytes).await {
                    error!(chat_id = chat_id.0, "Error delivering image: {e}");
                    self.reply_best_effort(chat_id, GENERIC_FAILURE).await;
                }
            }
            GenerationOutcome::Failure(status) => {
                warn!(chat_id = chat_id.0, status = status.code, "inference returned failure");
                self.reply_best_effort(chat_id, &failure_text(&status.describe()))
                    .await;
            }
            GenerationOutcome::TransportError(cause) => {
                error!(chat_id = chat_id.0, "Error generating image: {cause}");
                self.reply_best_effort(chat_id, GENERIC_FAILURE).await;
            }
        }

        Ok(())
    }

    async fn deliver(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        prompt: &str,
        bytes: &[u8],
    ) -> Result<()> {
        // Dropped on every path out of this function, which deletes the file.
        let staged = StagedImage::write(&self.temp_dir, user_id, bytes)?;
        let caption = truncate_utf16(
            &caption_for(prompt),
            self.messenger.capabilities().max_caption_len,
        );
        self.messenger
            .send_photo(chat_id, staged.path(), &caption)
            .await?;
        if let Err(e) = staged.close() {
            warn!(chat_id = chat_id.0, "failed to remove staged image: {e}");
        }
        Ok(())
    }

    async fn reply_best_effort(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.messenger.send_text(chat_id, text).await {
            warn!(chat_id = chat_id.0, "failed to send reply: {e}");
        }
    }
}
