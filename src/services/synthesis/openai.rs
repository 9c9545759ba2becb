//! OpenAI speech endpoint.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;

use super::{ApiKey, ProviderError, SpeechSynthesizer, check_audio, classify_status, split_script};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// The endpoint rejects inputs longer than 4096 characters.
const MAX_INPUT_CHARS: usize = 4000;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Synthesizer backed by OpenAI text-to-speech.
pub struct OpenAiSynthesizer {
    client: Client,
    api_key: ApiKey,
    model: String,
    voice: String,
    endpoint: String,
}

impl OpenAiSynthesizer {
    pub fn new(client: Client, api_key: ApiKey, model: &str, voice: &str) -> Self {
        Self {
            client,
            api_key,
            model: model.to_string(),
            voice: voice.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Point at a different endpoint (proxies, compatible servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn request<'a>(&'a self, input: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.model,
            input,
            voice: &self.voice,
            response_format: "mp3",
        }
    }

    async fn synthesize_chunk(&self, input: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&self.request(input))
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
impl SpeechSynthesizer for OpenAiSynthesizer {
    fn name(&self) -> &'static str {
        "openai"
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
