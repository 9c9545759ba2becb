// src/models/mod.rs

//! Domain models for the podcast pipeline.

mod blocklist;
mod config;
mod episode;
mod item;

// Re-export all public types
pub use blocklist::BlocklistSet;
pub use config::{
    Config, FetchConfig, FilterConfig, Limits, PathsConfig, PodcastConfig, SourceConfig, TtsConfig,
};
pub use episode::{
    AUDIO_FILE_NAME, AUDIO_MIME_TYPE, AudioRef, Episode, EpisodeMetadata, PublishedHistory,
};
pub use item::NewsItem;
