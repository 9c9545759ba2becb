// src/storage/feed.rs

//! Persisted podcast feed (`feed/podcast.xml`).
//!
//! [`FeedState`] is an append-only value. It is loaded once at the start of a
//! run, extended with at most one entry, and rendered once at the end. Prior
//! entries are carried as parsed `rss::Item`s and written back unchanged, so
//! their serialized form is stable across runs.

use chrono::{DateTime, NaiveDate, Utc};
use rss::extension::itunes::{ITunesChannelExtension, ITunesOwner};
use rss::{Channel, Enclosure, Guid, Image, Item};

use crate::error::{AppError, Result};
use crate::models::{Episode, PodcastConfig};
use crate::utils::join_url;
use crate::utils::text::truncate_text;

/// Maximum characters of show notes carried in an entry description.
const DESCRIPTION_CHARS: usize = 900;

/// One `<item>` of the feed, keyed by episode date.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    date: NaiveDate,
    item: Item,
}

impl FeedEntry {
    /// Build the feed entry for a freshly composed episode.
    pub fn from_episode(episode: &Episode, podcast: &PodcastConfig) -> Self {
        let date = episode.date.format("%Y-%m-%d").to_string();
        let base = podcast.base_link();

        let mut guid = Guid::default();
        guid.set_value(date.clone());
        guid.set_permalink(false);

        let mut item = Item::default();
        item.set_title(episode.title(&podcast.title));
        item.set_link(join_url(base, &format!("episodes/{date}/")));
        item.set_description(truncate_text(&episode.notes, DESCRIPTION_CHARS));
        item.set_guid(guid);
        item.set_pub_date(midnight_utc(episode.date).to_rfc2822());

        if let Some(audio) = &episode.audio {
            let mut enclosure = Enclosure::default();
            enclosure.set_url(join_url(
                base,
                &format!("episodes/{date}/{}", audio.file_name),
            ));
            enclosure.set_length(audio.length_bytes.to_string());
            enclosure.set_mime_type(audio.mime_type.clone());
            item.set_enclosure(enclosure);
        }

        Self {
            date: episode.date,
            item,
        }
    }

    /// Recover an entry from a parsed item; the date comes from its guid.
    fn from_item(item: Item) -> Result<Self> {
        let guid = item.guid().map(|g| g.value().trim()).unwrap_or_default();
        let date = NaiveDate::parse_from_str(guid, "%Y-%m-%d").map_err(|_| {
            AppError::FeedEntry(format!(
                "guid {:?} of {:?} is not a date",
                guid,
                item.title().unwrap_or_default()
            ))
        })?;
        Ok(Self { date, item })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn has_enclosure(&self) -> bool {
        self.item.enclosure().is_some()
    }
}

/// Ordered feed history, newest entry first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedState {
    entries: Vec<FeedEntry>,
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a previously rendered feed document.
    pub fn from_xml(bytes: &[u8]) -> Result<Self> {
        let channel = Channel::read_from(bytes)?;
        let mut entries = channel
            .into_items()
            .into_iter()
            .map(FeedEntry::from_item)
            .collect::<Result<Vec<_>>>()?;

        // Stable sort keeps document order if an older tool wrote duplicates.
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        let before = entries.len();
        entries.dedup_by_key(|e| e.date);
        if entries.len() != before {
            log::warn!("Dropped {} duplicate feed entries", before - entries.len());
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.entry(date).is_some()
    }

    pub fn entry(&self, date: NaiveDate) -> Option<&FeedEntry> {
        self.entries.iter().find(|e| e.date == date)
    }

    pub fn newest_date(&self) -> Option<NaiveDate> {
        self.entries.first().map(|e| e.date)
    }

    /// Check whether an entry for `date` may be appended.
    ///
    /// An existing date is a conflict unless `force` is set. A missing date
    /// older than the newest entry is always a conflict.
    pub fn check_append(&self, date: NaiveDate, force: bool) -> Result<()> {
        if self.contains(date) {
            if force {
                return Ok(());
            }
            return Err(AppError::publish_conflict(
                date,
                "feed already has an entry for this date",
            ));
        }
        match self.newest_date() {
            Some(newest) if date < newest => Err(AppError::publish_conflict(
                date,
                format!("feed already has a newer entry ({newest})"),
            )),
            _ => Ok(()),
        }
    }

    /// Return the state with `entry` added.
    ///
    /// With `force`, an entry for the same date is replaced in place.
    pub fn append(mut self, entry: FeedEntry, force: bool) -> Result<Self> {
        self.check_append(entry.date, force)?;
        match self.entries.iter().position(|e| e.date == entry.date) {
            Some(idx) => self.entries[idx] = entry,
            None => self.entries.insert(0, entry),
        }
        Ok(self)
    }

    /// Render the RSS 2.0 document for the current entries.
    pub fn render(&self, podcast: &PodcastConfig, build_time: DateTime<Utc>) -> Result<Vec<u8>> {
        let channel = self.channel(podcast, build_time);
        let mut buf = Vec::new();
        channel.pretty_write_to(&mut buf, b' ', 2)?;
        buf.push(b'\n');
        Ok(buf)
    }

    fn channel(&self, podcast: &PodcastConfig, build_time: DateTime<Utc>) -> Channel {
        let mut owner = ITunesOwner::default();
        owner.set_name(podcast.author.clone());
        owner.set_email(podcast.email.clone());

        let mut itunes = ITunesChannelExtension::default();
        itunes.set_author(podcast.author.clone());
        itunes.set_owner(owner);
        itunes.set_summary(podcast.description.clone());
        itunes.set_explicit("false".to_string());

        let mut channel = Channel::default();
        channel.set_title(podcast.title.clone());
        channel.set_link(podcast.link.clone());
        channel.set_description(podcast.description.clone());
        channel.set_language(podcast.language.clone());
        channel.set_last_build_date(build_time.to_rfc2822());

        if !podcast.art_url.trim().is_empty() {
            itunes.set_image(podcast.art_url.clone());

            let mut image = Image::default();
            image.set_url(podcast.art_url.clone());
            image.set_title(podcast.title.clone());
            image.set_link(podcast.link.clone());
            channel.set_image(image);
        }

        channel.set_itunes_ext(itunes);
        channel.set_items(
            self.entries
                .iter()
                .map(|e| e.item.clone())
                .collect::<Vec<_>>(),
        );
        channel
    }
}

/// Start of `date` in UTC.
fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
