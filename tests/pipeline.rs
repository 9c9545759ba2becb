//! End-to-end runs against an in-memory fetcher and stub speech providers.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use newscast::error::{AppError, EXIT_CONFLICT, Result};
use newscast::models::{Config, SourceConfig};
use newscast::pipeline::{RunOptions, RunSummary, run_pipeline};
use newscast::services::{FeedFetcher, ProviderError, SourceReader, SpeechSynthesizer};
use newscast::storage::LocalStorage;
use tempfile::TempDir;

struct MapFetcher(HashMap<String, String>);

#[async_trait]
impl FeedFetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.0
            .get(url)
            .map(|body| body.as_bytes().to_vec())
            .ok_or_else(|| AppError::source_fetch(url, "connection refused"))
    }
}

struct StubSynthesizer(std::result::Result<Vec<u8>, ProviderError>);

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn synthesize(&self, _script: &str) -> std::result::Result<Vec<u8>, ProviderError> {
        self.0.clone()
    }
}

fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn rss(items: &[(&str, &str, i64)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, link, hours_ago)| {
            let date = (reference() - Duration::hours(*hours_ago)).to_rfc2822();
            format!(
                "<item><title>{title}</title><link>{link}</link>\
                 <description>About {title}.</description><pubDate>{date}</pubDate></item>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>t</title>\
         <link>https://example.com</link><description>d</description>{body}</channel></rss>"
    )
}

fn fetcher() -> MapFetcher {
    let mut feeds = HashMap::new();
    feeds.insert(
        "https://a.example.com/rss".to_string(),
        rss(&[
            ("Board approves budget", "https://a.example.com/budget", 2),
            ("Paywalled scoop", "https://www.paywall.com/scoop", 1),
            ("Old news", "https://a.example.com/old", 48),
        ]),
    );
    feeds.insert(
        "https://b.example.com/rss".to_string(),
        rss(&[
            ("Board approves budget (update)", "https://a.example.com/budget", 3),
            ("Bond vote set", "https://b.example.com/bond", 4),
        ]),
    );
    MapFetcher(feeds)
}

fn config() -> Config {
    Config {
        sources: vec![
            SourceConfig::new("A", "https://a.example.com/rss"),
            SourceConfig::new("B", "https://b.example.com/rss"),
            SourceConfig::new("Down", "https://down.example.com/rss"),
        ],
        blocklist_domains: vec!["paywall.com".to_string()],
        ..Config::default()
    }
}

async fn run(
    dir: &Path,
    date: NaiveDate,
    reference_time: DateTime<Utc>,
    tts: Option<&dyn SpeechSynthesizer>,
    force: bool,
) -> Result<RunSummary> {
    let config = config();
    let reader = SourceReader::new(fetcher(), &config);
    let storage = LocalStorage::new(dir);
    let options = RunOptions {
        date,
        reference_time,
        build_time: reference_time,
        force,
    };
    run_pipeline(&config, &reader, tts, &storage, &options).await
}

fn read(dir: &Path, key: &str) -> String {
    std::fs::read_to_string(dir.join(key)).unwrap()
}

fn first_item(xml: &str) -> &str {
    let start = xml.find("<item>").unwrap();
    let end = xml.find("</item>").unwrap() + "</item>".len();
    &xml[start..end]
}

#[tokio::test]
async fn test_filtered_items_never_reach_script() {
    let tmp = TempDir::new().unwrap();
    let summary = run(tmp.path(), day(5), reference(), None, false).await.unwrap();

    let script = read(tmp.path(), "episodes/2025-03-05/script.txt");
    let notes = read(tmp.path(), "episodes/2025-03-05/notes.md");

    assert!(!script.contains("Paywalled"));
    assert!(!script.contains("Old news"));
    assert!(script.contains("Board approves budget (update)"));
    assert!(script.contains("Bond vote set"));
    assert_eq!(notes.matches("https://a.example.com/budget").count(), 1);

    assert_eq!(summary.sources_total, 3);
    assert_eq!(summary.source_failures, 1);
    assert_eq!(summary.item_count, 2);
    assert_eq!(summary.filter.blocked, 1);
    assert_eq!(summary.filter.stale, 1);
    assert_eq!(summary.filter.duplicates, 1);
}

#[tokio::test]
async fn test_second_run_is_conflict_and_feed_unchanged() {
    let tmp = TempDir::new().unwrap();
    run(tmp.path(), day(5), reference(), None, false).await.unwrap();
    let feed = std::fs::read(tmp.path().join("feed/podcast.xml")).unwrap();

    let later = reference() + Duration::minutes(30);
    let err = run(tmp.path(), day(5), later, None, false).await.unwrap_err();

    assert!(matches!(err, AppError::PublishConflict { .. }));
    assert_eq!(err.exit_code(), EXIT_CONFLICT);
    assert_eq!(std::fs::read(tmp.path().join("feed/podcast.xml")).unwrap(), feed);
}

#[tokio::test]
async fn test_forced_rerun_replaces_entry() {
    let tmp = TempDir::new().unwrap();
    run(tmp.path(), day(5), reference(), None, false).await.unwrap();

    let tts = StubSynthesizer(Ok(vec![0xFF, 0xFB, 0x90, 0x00]));
    let summary = run(tmp.path(), day(5), reference(), Some(&tts), true)
        .await
        .unwrap();

    assert!(summary.replaced);
    assert_eq!(summary.feed_entries, 1);
    // The replaced episode's own links are not treated as already published.
    assert_eq!(summary.item_count, 2);
    assert!(read(tmp.path(), "feed/podcast.xml").contains("length=\"4\""));
}

#[tokio::test]
async fn test_provider_failure_publishes_text_only() {
    let tmp = TempDir::new().unwrap();
    let tts = StubSynthesizer(Err(ProviderError::ProviderUnavailable("down".into())));
    let summary = run(tmp.path(), day(5), reference(), Some(&tts), false)
        .await
        .unwrap();

    assert!(!summary.has_audio());
    assert!(tmp.path().join("episodes/2025-03-05/script.txt").exists());
    assert!(!tmp.path().join("episodes/2025-03-05/audio.mp3").exists());
    let feed = read(tmp.path(), "feed/podcast.xml");
    assert!(feed.contains("<guid isPermaLink=\"false\">2025-03-05</guid>"));
    assert!(!feed.contains("<enclosure"));
}

#[tokio::test]
async fn test_audio_is_written_and_enclosed() {
    let tmp = TempDir::new().unwrap();
    let tts = StubSynthesizer(Ok(vec![1, 2, 3]));
    let summary = run(tmp.path(), day(5), reference(), Some(&tts), false)
        .await
        .unwrap();

    assert_eq!(summary.audio_provider, Some("stub"));
    assert_eq!(
        std::fs::read(tmp.path().join("episodes/2025-03-05/audio.mp3")).unwrap(),
        vec![1, 2, 3]
    );
    let feed = read(tmp.path(), "feed/podcast.xml");
    assert!(feed.contains("episodes/2025-03-05/audio.mp3"));
    assert!(feed.contains("audio/mpeg"));
}

#[tokio::test]
async fn test_identical_inputs_give_identical_scripts() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let a = run(first.path(), day(5), reference(), None, false).await.unwrap();
    let b = run(second.path(), day(5), reference(), None, false).await.unwrap();

    assert_eq!(a.script_sha256, b.script_sha256);
    assert_eq!(
        read(first.path(), "episodes/2025-03-05/script.txt"),
        read(second.path(), "episodes/2025-03-05/script.txt")
    );
}

#[tokio::test]
async fn test_next_day_keeps_prior_entry_and_skips_used_links() {
    let tmp = TempDir::new().unwrap();
    let tts = StubSynthesizer(Ok(vec![9; 16]));
    run(tmp.path(), day(5), reference(), Some(&tts), false)
        .await
        .unwrap();
    let day_one = read(tmp.path(), "feed/podcast.xml");
    let prior_item = first_item(&day_one).to_string();

    let next = reference() + Duration::hours(6);
    let summary = run(tmp.path(), day(6), next, None, false).await.unwrap();

    assert_eq!(summary.item_count, 0);
    assert_eq!(summary.filter.previously_published, 3);
    assert_eq!(summary.feed_entries, 2);

    let day_two = read(tmp.path(), "feed/podcast.xml");
    assert!(day_two.contains(&prior_item));
    assert!(first_item(&day_two).contains("2025-03-06"));
    assert!(read(tmp.path(), "episodes/2025-03-06/script.txt").contains("no new stories"));
}

#[tokio::test]
async fn test_older_date_is_rejected() {
    let tmp = TempDir::new().unwrap();
    run(tmp.path(), day(5), reference(), None, false).await.unwrap();

    let err = run(tmp.path(), day(4), reference(), None, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PublishConflict { .. }));
    assert!(!tmp.path().join("episodes/2025-03-04").exists());
}

#[tokio::test]
async fn test_past_date_measures_recency_from_run_time() {
    let tmp = TempDir::new().unwrap();
    let mut feeds = HashMap::new();
    feeds.insert(
        "https://a.example.com/rss".to_string(),
        rss(&[
            ("Thirty hours back", "https://a.example.com/thirty", 30),
            ("This morning", "https://a.example.com/morning", 3),
        ]),
    );
    let config = Config {
        sources: vec![SourceConfig::new("A", "https://a.example.com/rss")],
        ..Config::default()
    };
    let reader = SourceReader::new(MapFetcher(feeds), &config);
    let storage = LocalStorage::new(tmp.path());
    let options = RunOptions::for_date(day(4), reference(), false);

    let summary = run_pipeline(&config, &reader, None, &storage, &options)
        .await
        .unwrap();

    let script = read(tmp.path(), "episodes/2025-03-04/script.txt");
    assert!(!script.contains("Thirty hours back"));
    assert!(script.contains("This morning"));
    assert_eq!(summary.filter.stale, 1);
    assert_eq!(summary.item_count, 1);
}
