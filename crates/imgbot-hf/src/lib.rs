//! Hugging Face adapter (text-to-image).
//!
//! Uses the serverless Inference API: one JSON POST per prompt, the image
//! comes back as the raw response body.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use imgbot_core::{
    errors::Error,
    inference::{GenerationOutcome, GenerationRequest, InferenceClient, StatusInfo},
    Result,
};

const MAX_DETAIL_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct HfInferenceClient {
    api_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl HfInferenceClient {
    /// `timeout` bounds the whole call, connect through last body byte.
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("reqwest client build: {e}")))?;
        Ok(Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            http,
        })
    }

    pub fn from_config(cfg: &imgbot_core::config::Config) -> Result<Self> {
        Self::new(&cfg.hf_api_url, &cfg.hf_api_key, cfg.inference_timeout)
    }

    async fn post(&self, req: &GenerationRequest) -> reqwest::Result<GenerationOutcome> {
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "image/png")
            .json(req)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::OK {
            let bytes = resp.bytes().await?;
            return Ok(GenerationOutcome::Success(bytes.to_vec()));
        }

        let body = resp.text().await.unwrap_or_default();
        Ok(GenerationOutcome::Failure(StatusInfo {
            code: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            detail: error_detail(&body),
        }))
    }
}

#[async_trait]
impl InferenceClient for HfInferenceClient {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationOutcome> {
        match self.post(req).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let cause = if e.is_timeout() {
                    format!("inference request timed out: {e}")
                } else {
                    format!("inference request error: {e}")
                };
                debug!("{cause}");
                Ok(GenerationOutcome::TransportError(cause))
            }
        }
    }
}

/// Failures come back as `{"error": "..."}`; fall back to a text excerpt.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let text = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    Some(text.chars().take(MAX_DETAIL_CHARS).collect())
}
