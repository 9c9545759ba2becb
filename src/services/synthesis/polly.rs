//! Amazon Polly synthesizer (cargo feature `polly`).

use async_trait::async_trait;

use super::{ProviderError, SpeechSynthesizer, split_script};

/// Polly rejects text over 3000 characters per request.
const MAX_INPUT_CHARS: usize = 2800;

/// Synthesizer backed by Amazon Polly. Credentials and region come from the
/// standard AWS environment.
pub struct PollySynthesizer {
    voice_id: String,
    engine: String,
}

impl PollySynthesizer {
    pub fn new(voice_id: &str, engine: &str) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            engine: engine.to_string(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PollySynthesizer {
    fn name(&self) -> &'static str {
        "polly"
    }

    #[cfg(feature = "polly")]
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, ProviderError> {
        use aws_sdk_polly::Client;
        use aws_sdk_polly::types::{Engine, OutputFormat, VoiceId};

        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = Client::new(&config);

        let mut audio = Vec::new();
        for chunk in split_script(script, MAX_INPUT_CHARS) {
            let output = client
                .synthesize_speech()
                .text(chunk)
                .output_format(OutputFormat::Mp3)
                .voice_id(VoiceId::from(self.voice_id.as_str()))
                .engine(Engine::from(self.engine.as_str()))
                .send()
                .await
                .map_err(|e| {
                    let message = format!("{e:?}");
                    if message.contains("Throttling") || message.contains("LimitExceeded") {
                        ProviderError::QuotaExceeded(message)
                    } else {
                        ProviderError::ProviderUnavailable(message)
                    }
                })?;
            let bytes = output
                .audio_stream
                .collect()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?
                .into_bytes();
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(ProviderError::InvalidResponse("script produced no audio".into()));
        }
        Ok(audio)
    }

    #[cfg(not(feature = "polly"))]
    async fn synthesize(&self, script: &str) -> Result<Vec<u8>, ProviderError> {
        log::debug!(
            "Polly voice {} ({}) requested for {} chunks",
            self.voice_id,
            self.engine,
            split_script(script, MAX_INPUT_CHARS).len()
        );
        Err(ProviderError::ProviderUnavailable(
            "built without the `polly` feature".into(),
        ))
    }
}
