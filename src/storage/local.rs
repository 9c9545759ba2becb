//! Local filesystem storage implementation.
//!
//! Every write goes to a temporary sibling first and is then renamed into
//! place, so a crash never leaves a half-written script or feed behind.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{AUDIO_FILE_NAME, Episode, EpisodeMetadata};
use crate::storage::{EpisodeStorage, FeedState};

const EPISODES_DIR: &str = "episodes";
const FEED_KEY: &str = "feed/podcast.xml";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Key of a file inside the directory of `date`.
    pub fn episode_key(date: NaiveDate, file_name: &str) -> String {
        format!("{}/{}/{}", EPISODES_DIR, date.format("%Y-%m-%d"), file_name)
    }

    pub fn feed_path(&self) -> PathBuf {
        self.path(FEED_KEY)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete a file, ignoring a missing one.
    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Dates of every episode directory, oldest first.
    async fn episode_dates(&self) -> Result<Vec<NaiveDate>> {
        let mut dir = match tokio::fs::read_dir(self.path(EPISODES_DIR)).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut dates = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            match NaiveDate::parse_from_str(&name.to_string_lossy(), "%Y-%m-%d") {
                Ok(date) => dates.push(date),
                Err(_) => log::debug!("Ignoring {:?} in episodes directory", name),
            }
        }
        dates.sort();
        Ok(dates)
    }
}

#[async_trait]
impl EpisodeStorage for LocalStorage {
    async fn load_feed(&self) -> Result<FeedState> {
        match self.read_bytes(FEED_KEY).await? {
            Some(bytes) => FeedState::from_xml(&bytes),
            None => {
                log::info!("No feed at {}; starting a new one", self.feed_path().display());
                Ok(FeedState::new())
            }
        }
    }

    async fn load_history(&self) -> Result<Vec<EpisodeMetadata>> {
        let mut records = Vec::new();
        for date in self.episode_dates().await? {
            let key = Self::episode_key(date, "episode.json");
            match self.read_json::<EpisodeMetadata>(&key).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => log::debug!("No episode.json for {}", date),
                Err(e) => log::warn!("Ignoring unreadable {}: {}", key, e),
            }
        }
        Ok(records)
    }

    async fn episode_exists(&self, date: NaiveDate) -> Result<bool> {
        let path = self.path(&Self::episode_key(date, "script.txt"));
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn write_episode(
        &self,
        episode: &Episode,
        metadata: &EpisodeMetadata,
        audio: Option<&[u8]>,
    ) -> Result<()> {
        let date = episode.date;
        let audio_key = Self::episode_key(date, AUDIO_FILE_NAME);
        match audio {
            Some(bytes) => self.write_bytes(&audio_key, bytes).await?,
            None => self.remove(&audio_key).await?,
        }

        self.write_bytes(&Self::episode_key(date, "notes.md"), episode.notes.as_bytes())
            .await?;
        self.write_bytes(&Self::episode_key(date, "script.txt"), episode.script.as_bytes())
            .await?;
        self.write_json(&Self::episode_key(date, "episode.json"), metadata)
            .await?;

        log::info!(
            "Episode {} written to {}",
            date,
            self.path(&Self::episode_key(date, "")).display()
        );
        Ok(())
    }

    async fn write_feed(&self, xml: &[u8]) -> Result<()> {
        self.write_bytes(FEED_KEY, xml).await?;
        log::info!("Feed written to {}", self.feed_path().display());
        Ok(())
    }
}
