use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::BackendError;
use crate::kernel::event::HapticAck;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Speech synthesis result at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechAudio {
    Audio(Vec<u8>),
    NoContent,
}

/// The three request/response endpoints the action gate drives.
#[async_trait]
pub trait GuidanceBackend: Send + Sync {
    /// Returns a raw VisionPayload; normalization happens in the kernel.
    async fn analyze(&self) -> Result<Value, BackendError>;
    async fn haptic(&self, intensity: u8) -> Result<HapticAck, BackendError>;
    async fn speak(&self, text: &str) -> Result<SpeechAudio, BackendError>;
}

#[derive(Debug, Clone)]
pub struct BackendPaths {
    pub analyze: String,
    pub haptic: String,
    pub speak: String,
}

impl Default for BackendPaths {
    fn default() -> Self {
        Self {
            analyze: "/analyze".to_string(),
            haptic: "/haptic".to_string(),
            speak: "/tts".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    paths: BackendPaths,
}

#[derive(Serialize)]
struct HapticRequest {
    intensity: u8,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
}

impl BackendClient {
    /// Fails only if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(
        base_url: impl Into<String>,
        paths: BackendPaths,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            paths,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

async fn reject_status(response: reqwest::Response) -> BackendError {
    let code = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Status {
        code,
        body: body.trim().chars().take(200).collect(),
    }
}

#[async_trait]
impl GuidanceBackend for BackendClient {
    async fn analyze(&self) -> Result<Value, BackendError> {
        let response = self.client.post(self.url(&self.paths.analyze)).send().await?;
        if !response.status().is_success() {
            return Err(reject_status(response).await);
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn haptic(&self, intensity: u8) -> Result<HapticAck, BackendError> {
        let response = self
            .client
            .post(self.url(&self.paths.haptic))
            .json(&HapticRequest { intensity })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(reject_status(response).await);
        }

        // Bodyless 2xx counts as acknowledged.
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(HapticAck::default());
        }
        serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn speak(&self, text: &str) -> Result<SpeechAudio, BackendError> {
        let response = self
            .client
            .post(self.url(&self.paths.speak))
            .json(&SpeechRequest { text })
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(SpeechAudio::NoContent);
        }
        if !response.status().is_success() {
            return Err(reject_status(response).await);
        }

        let audio = response.bytes().await?;
        debug!(bytes = audio.len(), "speech audio received");
        Ok(SpeechAudio::Audio(audio.to_vec()))
    }
}
