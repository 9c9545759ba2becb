// src/pipeline/run.rs

//! One daily run: read → filter → compose → synthesize → publish.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{AppError, Result};
use crate::models::{AudioRef, Config, Episode, PublishedHistory};
use crate::pipeline::compose::ScriptComposer;
use crate::pipeline::filter::{FilterEngine, FilterReport};
use crate::pipeline::publish::EpisodePublisher;
use crate::services::{FeedFetcher, SourceReader, SpeechSynthesizer};
use crate::storage::EpisodeStorage;
use crate::utils::progress;

const TOTAL_STEPS: usize = 5;

/// Per-invocation settings.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Episode date (unique key)
    pub date: NaiveDate,
    /// Instant the recency window is measured from
    pub reference_time: DateTime<Utc>,
    /// Run timestamp, used for `published_at` and the feed build date
    pub build_time: DateTime<Utc>,
    /// Replace an existing episode for `date`
    pub force: bool,
}

impl RunOptions {
    /// Options for `date` when the current time is `now`.
    ///
    /// The recency window is measured from `now` whatever the date; the date
    /// only names the episode.
    pub fn for_date(date: NaiveDate, now: DateTime<Utc>, force: bool) -> Self {
        Self {
            date,
            reference_time: now,
            build_time: now,
            force,
        }
    }
}

/// Resolve a `--date` value: `today` in the show's zone, or `YYYY-MM-DD`.
pub fn parse_episode_date(raw: &str, now: DateTime<Utc>, tz: Tz) -> Result<NaiveDate> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("today") {
        return Ok(now.with_timezone(&tz).date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::config(format!("invalid --date {raw:?}, expected today or YYYY-MM-DD"))
    })
}

/// What a run did.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub sources_total: usize,
    pub source_failures: usize,
    pub filter: FilterReport,
    pub item_count: usize,
    /// Provider that produced the audio, if any
    pub audio_provider: Option<&'static str>,
    pub feed_entries: usize,
    pub replaced: bool,
    pub script_sha256: String,
}

impl RunSummary {
    pub fn has_audio(&self) -> bool {
        self.audio_provider.is_some()
    }
}

/// Run the whole pipeline for one date.
///
/// Source and provider failures are logged and absorbed. A publish conflict
/// is detected before any network call and before any write.
pub async fn run_pipeline<F: FeedFetcher>(
    config: &Config,
    reader: &SourceReader<F>,
    synthesizer: Option<&dyn SpeechSynthesizer>,
    storage: &dyn EpisodeStorage,
    options: &RunOptions,
) -> Result<RunSummary> {
    progress::header(&format!("{} — {}", config.podcast.title, options.date));

    let publisher = EpisodePublisher::new(storage, &config.podcast);
    let feed = storage.load_feed().await?;
    publisher.check(&feed, options.date, options.force).await?;

    let records = storage.load_history().await?;
    let history =
        PublishedHistory::from_metadata(&records, options.force.then_some(options.date));
    log::debug!(
        "Loaded {} prior episodes ({} links)",
        records.len(),
        history.link_count()
    );

    progress::step(1, TOTAL_STEPS, "Read - fetching sources");
    let sources = config.enabled_sources();
    let outcome = reader.read_all(&sources, options.reference_time).await;
    progress::sub_item(&format!(
        "{} items from {} sources ({} failed)",
        outcome.items.len(),
        outcome.sources_total,
        outcome.source_failures
    ));

    progress::step(2, TOTAL_STEPS, "Filter - dropping blocked, stale, and repeated items");
    let engine = FilterEngine::from_config(config);
    let (items, report) = engine.apply(outcome.items, options.reference_time, &history);
    progress::sub_item(&format!(
        "kept {} of {} (blocked {}, soft {}, stale {}, published {}, duplicate {}, over limit {})",
        report.kept,
        report.input,
        report.blocked,
        report.soft_filtered,
        report.stale,
        report.previously_published,
        report.duplicates,
        report.over_limit
    ));

    progress::step(3, TOTAL_STEPS, "Compose - writing script and show notes");
    let composer = ScriptComposer::new(&config.podcast.title, config.limits);
    let composed = composer.compose(options.date, &items);

    progress::step(4, TOTAL_STEPS, "Synthesize - rendering audio");
    let (audio, audio_provider) = match synthesizer {
        Some(tts) => match tts.synthesize(&composed.script).await {
            Ok(bytes) => {
                progress::sub_item(&format!("{} bytes from {}", bytes.len(), tts.name()));
                (Some(bytes), Some(tts.name()))
            }
            Err(e) => {
                log::warn!("TTS provider {} failed, publishing text only: {}", tts.name(), e);
                (None, None)
            }
        },
        None => {
            progress::sub_item("TTS disabled");
            (None, None)
        }
    };

    progress::step(5, TOTAL_STEPS, "Publish - writing episode and feed");
    let episode = Episode {
        date: options.date,
        script: composed.script,
        notes: composed.notes,
        audio: audio.as_ref().map(|b| AudioRef::mp3(b.len() as u64)),
        source_links: items.iter().map(|i| i.link.clone()).collect(),
        source_titles: items.iter().map(|i| i.title.clone()).collect(),
    };
    let metadata = episode.metadata(
        &config.podcast.title,
        options.build_time,
        composed.sha256.clone(),
    );
    let published = publisher
        .publish(
            feed,
            &episode,
            &metadata,
            audio.as_deref(),
            options.build_time,
            options.force,
        )
        .await?;

    let summary = RunSummary {
        date: options.date,
        sources_total: outcome.sources_total,
        source_failures: outcome.source_failures,
        filter: report,
        item_count: items.len(),
        audio_provider,
        feed_entries: published.feed.len(),
        replaced: published.replaced,
        script_sha256: composed.sha256,
    };

    progress::summary(
        "Episode published",
        &[
            ("Date", summary.date.to_string()),
            ("Stories", summary.item_count.to_string()),
            (
                "Audio",
                summary.audio_provider.unwrap_or("none").to_string(),
            ),
            ("Feed entries", summary.feed_entries.to_string()),
        ],
    );

    Ok(summary)
}
