//! Text-to-image inference port.

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;

/// Sampling parameters sent alongside every prompt.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GenerationParameters {
    pub num_inference_steps: u32,
    pub guidance_scale: f64,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            num_inference_steps: 30,
            guidance_scale: 7.5,
        }
    }
}

/// One generation call. Serializes to the inference wire body:
/// `{"inputs": "...", "parameters": {"num_inference_steps": .., "guidance_scale": ..}}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationRequest {
    #[serde(rename = "inputs")]
    pub prompt: String,
    pub parameters: GenerationParameters,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, parameters: GenerationParameters) -> Self {
        Self {
            prompt: prompt.into(),
            parameters,
        }
    }
}

/// Non-success HTTP status reported by the inference endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusInfo {
    pub code: u16,
    /// Canonical reason phrase, e.g. `Service Unavailable`.
    pub reason: Option<String>,
    /// Short error excerpt from the response body.
    pub detail: Option<String>,
}

impl StatusInfo {
    pub fn describe(&self) -> String {
        let mut out = self.code.to_string();
        if let Some(reason) = &self.reason {
            out.push(' ');
            out.push_str(reason);
        }
        if let Some(detail) = self.detail.as_deref().filter(|d| !d.trim().is_empty()) {
            out.push_str(&format!(" ({detail})"));
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GenerationOutcome {
    Success(Vec<u8>),
    Failure(StatusInfo),
    /// Network failure or timeout; no status was received.
    TransportError(String),
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationOutcome>;
}
