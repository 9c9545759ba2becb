// src/error.rs

//! Unified error handling for the podcast pipeline.

use std::fmt;

use thiserror::Error;

use crate::services::synthesis::ProviderError;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Process exit code for configuration (and other fatal) errors.
pub const EXIT_CONFIG: i32 = 1;
/// Process exit code when the target date already has an episode.
pub const EXIT_CONFLICT: i32 = 2;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Persisted podcast feed could not be read or written
    #[error("Feed error: {0}")]
    Feed(#[from] rss::Error),

    /// Persisted podcast feed holds an entry this tool cannot account for
    #[error("Invalid feed entry: {0}")]
    FeedEntry(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single source could not be fetched or parsed
    #[error("Source fetch error for {feed}: {message}")]
    SourceFetch { feed: String, message: String },

    /// Speech synthesis failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The date already has a published episode, or would break feed ordering
    #[error("Publish conflict for {date}: {reason}")]
    PublishConflict { date: String, reason: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a source fetch error with context.
    pub fn source_fetch(feed: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SourceFetch {
            feed: feed.into(),
            message: message.to_string(),
        }
    }

    /// Create a publish conflict error.
    pub fn publish_conflict(date: impl fmt::Display, reason: impl Into<String>) -> Self {
        Self::PublishConflict {
            date: date.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PublishConflict { .. } => EXIT_CONFLICT,
            _ => EXIT_CONFIG,
        }
    }
}
