//! ElevenLabs text-to-speech endpoint.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;

use super::{ApiKey, ProviderError, SpeechSynthesizer, check_audio, classify_status, split_script};

const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";

const MAX_INPUT_CHARS: usize = 4500;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Synthesizer backed by ElevenLabs.
pub struct ElevenLabsSynthesizer {
    client: Client,
    api_key: ApiKey,
    voice_id: String,
    model_id: String,
    base_url: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(client: Client, api_key: ApiKey, voice_id: &str, model_id: &str) -> Self {
        Self {
            client,
            api_key,
            voice_id: voice_id.to_string(),
            model_id: model_id.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.voice_id)
    }

    async fn synthesize_chunk(&self, text: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", self.api_key.expose())
            .header(ACCEPT, "audio/mpeg")
            .json(&SpeechRequest {
                text,
                model_id: &self.model_id,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        check_audio(content_type.as_deref(), bytes)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, ProviderError> {
        let mut audio = Vec::new();
        for chunk in split_script(script, MAX_INPUT_CHARS) {
            audio.extend(self.synthesize_chunk(&chunk).await?);
        }
        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse("script produced no audio".into()));
        }
        Ok(audio)
    }
}
