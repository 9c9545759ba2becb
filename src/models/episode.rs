//! Episode data structures and publish history.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::text::normalize_title;

/// MIME type of synthesized audio.
pub const AUDIO_MIME_TYPE: &str = "audio/mpeg";

/// File name of synthesized audio inside an episode directory.
pub const AUDIO_FILE_NAME: &str = "audio.mp3";

/// Reference to the audio file of an episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioRef {
    pub file_name: String,
    pub length_bytes: u64,
    pub mime_type: String,
}

impl AudioRef {
    pub fn mp3(length_bytes: u64) -> Self {
        Self {
            file_name: AUDIO_FILE_NAME.to_string(),
            length_bytes,
            mime_type: AUDIO_MIME_TYPE.to_string(),
        }
    }
}

/// One day's podcast unit. Never mutated once published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Unique key
    pub date: NaiveDate,
    pub script: String,
    pub notes: String,
    pub audio: Option<AudioRef>,
    pub source_links: Vec<String>,
    pub source_titles: Vec<String>,
}

impl Episode {
    /// Episode title as shown in the feed.
    pub fn title(&self, show_title: &str) -> String {
        format!("{} — {}", show_title, self.date.format("%Y-%m-%d"))
    }

    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Build the `episode.json` record.
    pub fn metadata(
        &self,
        show_title: &str,
        published_at: DateTime<Utc>,
        script_sha256: String,
    ) -> EpisodeMetadata {
        EpisodeMetadata {
            date: self.date,
            title: self.title(show_title),
            published_at,
            item_count: self.source_links.len(),
            source_links: self.source_links.clone(),
            source_titles: self.source_titles.clone(),
            audio: self.audio.clone(),
            script_sha256,
        }
    }
}

/// Persisted record of a published episode (`episode.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeMetadata {
    pub date: NaiveDate,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub item_count: usize,
    #[serde(default)]
    pub source_links: Vec<String>,
    #[serde(default)]
    pub source_titles: Vec<String>,
    #[serde(default)]
    pub audio: Option<AudioRef>,
    #[serde(default)]
    pub script_sha256: String,
}

/// Links and title keys already used by earlier episodes.
#[derive(Debug, Clone, Default)]
pub struct PublishedHistory {
    links: HashSet<String>,
    titles: HashSet<String>,
}

impl PublishedHistory {
    /// Collect history from episode records, optionally skipping one date
    /// (the episode being replaced by a forced rerun).
    pub fn from_metadata<'a, I>(records: I, exclude: Option<NaiveDate>) -> Self
    where
        I: IntoIterator<Item = &'a EpisodeMetadata>,
    {
        let mut history = Self::default();
        for record in records {
            if Some(record.date) == exclude {
                continue;
            }
            history.links.extend(record.source_links.iter().cloned());
            history.titles.extend(
                record
                    .source_titles
                    .iter()
                    .map(|t| normalize_title(t))
                    .filter(|t| !t.is_empty()),
            );
        }
        history
    }

    pub fn contains_link(&self, link: &str) -> bool {
        self.links.contains(link)
    }

    /// `title_key` must already be normalized.
    pub fn contains_title(&self, title_key: &str) -> bool {
        self.titles.contains(title_key)
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}
