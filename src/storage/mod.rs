//! Storage abstractions for episode persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! data/
//! ├── episodes/
//! │   └── YYYY-MM-DD/
//! │       ├── script.txt
//! │       ├── audio.mp3      # only when synthesis succeeded
//! │       ├── notes.md
//! │       └── episode.json   # EpisodeMetadata
//! └── feed/
//!     └── podcast.xml        # RSS 2.0
//! ```

pub mod feed;
pub mod local;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Episode, EpisodeMetadata};

pub use feed::{FeedEntry, FeedState};
pub use local::LocalStorage;

/// Trait for episode storage backends.
#[async_trait]
pub trait EpisodeStorage: Send + Sync {
    /// Load the published feed, or an empty state if none exists yet.
    async fn load_feed(&self) -> Result<FeedState>;

    /// Load the metadata of every published episode, oldest first.
    async fn load_history(&self) -> Result<Vec<EpisodeMetadata>>;

    /// Whether a script has already been written for `date`.
    async fn episode_exists(&self, date: NaiveDate) -> Result<bool>;

    /// Write every artifact of an episode.
    ///
    /// A stale audio file from an earlier run is removed when `audio` is `None`.
    async fn write_episode(
        &self,
        episode: &Episode,
        metadata: &EpisodeMetadata,
        audio: Option<&[u8]>,
    ) -> Result<()>;

    /// Replace the feed document.
    async fn write_feed(&self, xml: &[u8]) -> Result<()>;
}
