// src/pipeline/publish.rs

//! Episode publisher.
//!
//! Enforces at most one episode per day, writes the episode artifacts, and
//! only then rewrites the feed.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{AppError, Result};
use crate::models::{Episode, EpisodeMetadata, PodcastConfig};
use crate::storage::{EpisodeStorage, FeedEntry, FeedState};

/// Result of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub date: NaiveDate,
    pub feed: FeedState,
    /// An earlier episode for the same date was replaced
    pub replaced: bool,
    pub has_audio: bool,
}

/// Publishes episodes into an [`EpisodeStorage`].
pub struct EpisodePublisher<'a> {
    storage: &'a dyn EpisodeStorage,
    podcast: &'a PodcastConfig,
}

impl<'a> EpisodePublisher<'a> {
    pub fn new(storage: &'a dyn EpisodeStorage, podcast: &'a PodcastConfig) -> Self {
        Self { storage, podcast }
    }

    /// Fail with `PublishConflict` if `date` cannot be published.
    ///
    /// The date conflicts when it already has a script or a feed entry and
    /// `force` is not set, or when the feed already has a newer entry.
    pub async fn check(&self, feed: &FeedState, date: NaiveDate, force: bool) -> Result<()> {
        if !force && self.storage.episode_exists(date).await? {
            return Err(AppError::publish_conflict(
                date,
                "an episode was already written for this date (use --force to replace it)",
            ));
        }
        feed.check_append(date, force)
    }

    /// Write `episode` and append it to `feed`.
    ///
    /// The new feed is rendered before anything is written, so a rejected
    /// append leaves storage untouched.
    pub async fn publish(
        &self,
        feed: FeedState,
        episode: &Episode,
        metadata: &EpisodeMetadata,
        audio: Option<&[u8]>,
        build_time: DateTime<Utc>,
        force: bool,
    ) -> Result<PublishOutcome> {
        self.check(&feed, episode.date, force).await?;

        let replaced = feed.contains(episode.date) || self.storage.episode_exists(episode.date).await?;
        let feed = feed.append(FeedEntry::from_episode(episode, self.podcast), force)?;
        let xml = feed.render(self.podcast, build_time)?;

        self.storage.write_episode(episode, metadata, audio).await?;
        self.storage.write_feed(&xml).await?;

        if replaced {
            log::warn!("Replaced existing episode for {}", episode.date);
        }

        Ok(PublishOutcome {
            date: episode.date,
            feed,
            replaced,
            has_audio: episode.has_audio(),
        })
    }
}
