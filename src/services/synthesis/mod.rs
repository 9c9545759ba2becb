//! Text-to-speech synthesis adapters.
//!
//! The provider is chosen once at startup from `TTS_PROVIDER`:
//!
//! | value        | implementation                  | required variables                         |
//! |--------------|---------------------------------|--------------------------------------------|
//! | `none`       | no audio                        |                                            |
//! | `openai`     | [`OpenAiSynthesizer`]           | `OPENAI_API_KEY`                           |
//! | `elevenlabs` | [`ElevenLabsSynthesizer`]       | `ELEVENLABS_API_KEY`, `ELEVENLABS_VOICE_ID`|
//! | `polly`      | [`PollySynthesizer`]            | AWS credentials (feature `polly`)          |
//!
//! A provider failure is never fatal to a run; the episode is published
//! without audio.

mod elevenlabs;
mod openai;
mod polly;

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::error::{AppError, Result};

pub use elevenlabs::ElevenLabsSynthesizer;
pub use openai::OpenAiSynthesizer;
pub use polly::PollySynthesizer;

/// Typed failure from a speech provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Provider could not be reached, rejected credentials, or is down
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limit or account quota hit
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Provider answered with something that is not audio
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() || err.is_body() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::ProviderUnavailable(err.to_string())
        }
    }
}

/// Converts script text into MP3 audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Provider identifier for logs.
    fn name(&self) -> &'static str;

    /// Synthesize `script` and return MP3 bytes.
    async fn synthesize(&self, script: &str) -> std::result::Result<Vec<u8>, ProviderError>;
}

/// API credential that never shows up in debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Selected provider and its settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtsProvider {
    None,
    OpenAi {
        api_key: ApiKey,
        model: String,
        voice: String,
    },
    ElevenLabs {
        api_key: ApiKey,
        voice_id: String,
        model_id: String,
    },
    Polly {
        voice_id: String,
        engine: String,
    },
}

impl TtsProvider {
    /// Resolve the provider from environment-style variables.
    ///
    /// Unknown providers and missing credentials are configuration errors.
    pub fn from_env<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| AppError::config(format!("{key} must be set for this TTS provider")))
        };

        let provider = get("TTS_PROVIDER")
            .unwrap_or_else(|| "none".to_string())
            .to_ascii_lowercase();

        match provider.as_str() {
            "none" => Ok(Self::None),
            "openai" => Ok(Self::OpenAi {
                api_key: ApiKey::new(require("OPENAI_API_KEY")?),
                model: get("OPENAI_TTS_MODEL").unwrap_or_else(|| "tts-1".into()),
                voice: get("OPENAI_TTS_VOICE").unwrap_or_else(|| "alloy".into()),
            }),
            "elevenlabs" => Ok(Self::ElevenLabs {
                api_key: ApiKey::new(require("ELEVENLABS_API_KEY")?),
                voice_id: require("ELEVENLABS_VOICE_ID")?,
                model_id: get("ELEVENLABS_MODEL_ID")
                    .unwrap_or_else(|| "eleven_multilingual_v2".into()),
            }),
            "polly" => Ok(Self::Polly {
                voice_id: get("POLLY_VOICE_ID").unwrap_or_else(|| "Joanna".into()),
                engine: get("POLLY_ENGINE").unwrap_or_else(|| "standard".into()),
            }),
            other => Err(AppError::config(format!("unknown TTS_PROVIDER: {other}"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::OpenAi { .. } => "openai",
            Self::ElevenLabs { .. } => "elevenlabs",
            Self::Polly { .. } => "polly",
        }
    }

    /// Build the synthesizer, or `None` when audio is disabled.
    pub fn build(&self, client: reqwest::Client) -> Option<Box<dyn SpeechSynthesizer>> {
        match self {
            Self::None => None,
            Self::OpenAi {
                api_key,
                model,
                voice,
            } => Some(Box::new(OpenAiSynthesizer::new(
                client,
                api_key.clone(),
                model,
                voice,
            ))),
            Self::ElevenLabs {
                api_key,
                voice_id,
                model_id,
            } => Some(Box::new(ElevenLabsSynthesizer::new(
                client,
                api_key.clone(),
                voice_id,
                model_id,
            ))),
            Self::Polly { voice_id, engine } => {
                Some(Box::new(PollySynthesizer::new(voice_id, engine)))
            }
        }
    }
}

/// Map a non-success HTTP answer to a provider error.
pub(crate) fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body.trim());
    if status == StatusCode::TOO_MANY_REQUESTS || body.to_ascii_lowercase().contains("quota") {
        ProviderError::QuotaExceeded(detail)
    } else if status.is_server_error()
        || matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::REQUEST_TIMEOUT
        )
    {
        ProviderError::ProviderUnavailable(detail)
    } else {
        ProviderError::InvalidResponse(detail)
    }
}

/// Reject empty bodies and non-audio content types.
pub(crate) fn check_audio(
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> std::result::Result<Vec<u8>, ProviderError> {
    if let Some(ct) = content_type {
        let ct = ct.to_ascii_lowercase();
        if !(ct.starts_with("audio/") || ct.starts_with("application/octet-stream")) {
            return Err(ProviderError::InvalidResponse(format!(
                "unexpected content type {ct}"
            )));
        }
    }
    if bytes.is_empty() {
        return Err(ProviderError::InvalidResponse("empty audio body".into()));
    }
    Ok(bytes)
}

/// Split a script into chunks of at most `max_chars` characters, preferring
/// paragraph breaks, then sentence ends, then spaces.
pub fn split_script(script: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut rest = script.trim();
    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_string());
            break;
        }
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let window = &rest[..limit];
        let cut = window
            .rfind("\n\n")
            .or_else(|| window.rfind(". ").map(|i| i + 1))
            .or_else(|| window.rfind(' '))
            .filter(|&i| i > 0)
            .unwrap_or(limit);
        chunks.push(rest[..cut].trim().to_string());
        rest = rest[cut..].trim_start();
    }
    chunks
}
