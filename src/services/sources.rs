// src/services/sources.rs

//! Source reader service.
//!
//! Fetches every enabled RSS/Atom source and normalizes entries into
//! [`NewsItem`]s. A source that cannot be fetched or parsed is logged and
//! skipped; the remaining sources still contribute items.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, FetchConfig, NewsItem, SourceConfig};
use crate::utils::http::create_async_client;
use crate::utils::link_domain;
use crate::utils::text::{clean_text, safe_truncate};

/// Retrieves raw feed documents.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the document at `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// [`FeedFetcher`] backed by a shared HTTP client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::source_fetch(url, format!("HTTP status {status}")));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Summary of a read run.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    /// Items from all readable sources, in source order
    pub items: Vec<NewsItem>,
    pub sources_total: usize,
    pub source_failures: usize,
}

/// Service for reading items from configured sources.
pub struct SourceReader<F> {
    fetcher: F,
    max_concurrent: usize,
    max_summary_chars: usize,
}

impl<F: FeedFetcher> SourceReader<F> {
    /// Create a new reader with the given fetcher and configuration.
    pub fn new(fetcher: F, config: &Config) -> Self {
        Self {
            fetcher,
            max_concurrent: config.fetch.max_concurrent.max(1),
            max_summary_chars: config.filter.max_summary_chars,
        }
    }

    /// Read all sources, bounded by `fetch.max_concurrent` in-flight requests.
    ///
    /// `sources` pairs each source with its configured position.
    pub async fn read_all(
        &self,
        sources: &[(usize, &SourceConfig)],
        fetched_at: DateTime<Utc>,
    ) -> ReadOutcome {
        let mut outcome = ReadOutcome {
            sources_total: sources.len(),
            ..ReadOutcome::default()
        };

        // `buffered` yields results in input order, so items stay grouped by source.
        let mut source_stream = stream::iter(sources.iter().copied())
            .map(|(index, source)| async move {
                let result = self.read_source(index, source, fetched_at).await;
                (source, result)
            })
            .buffered(self.max_concurrent);

        while let Some((source, result)) = source_stream.next().await {
            match result {
                Ok(items) => {
                    log::info!("Read {} items from {}", items.len(), source.label());
                    outcome.items.extend(items);
                }
                Err(error) => {
                    outcome.source_failures += 1;
                    log::warn!("Skipping source {} ({}): {}", source.label(), source.url, error);
                }
            }
        }

        outcome
    }

    /// Fetch and parse a single source.
    async fn read_source(
        &self,
        index: usize,
        source: &SourceConfig,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<NewsItem>> {
        log::debug!("Fetching {}", source.url);
        let bytes = self
            .fetcher
            .fetch(&source.url)
            .await
            .map_err(|e| {
                if matches!(e, AppError::SourceFetch { .. }) {
                    e
                } else {
                    AppError::source_fetch(source.label(), e)
                }
            })?;
        parse_feed(&bytes, index, source, fetched_at, self.max_summary_chars)
    }
}

/// Parse an RSS 2.0 or Atom document into items.
///
/// Entries without a title or link are skipped. Entries without a usable
/// date are stamped with `fetched_at`.
pub fn parse_feed(
    bytes: &[u8],
    source_index: usize,
    source: &SourceConfig,
    fetched_at: DateTime<Utc>,
    max_summary_chars: usize,
) -> Result<Vec<NewsItem>> {
    let entries = if let Ok(channel) = rss::Channel::read_from(bytes) {
        rss_entries(&channel)
    } else if let Ok(feed) = atom_syndication::Feed::read_from(bytes) {
        atom_entries(&feed)
    } else {
        return Err(AppError::source_fetch(
            source.label(),
            "not a valid RSS or Atom document",
        ));
    };

    let items = entries
        .into_iter()
        .filter_map(|entry| {
            let title = clean_text(&entry.title);
            let link = entry.link.trim().to_string();
            if title.is_empty() || link.is_empty() {
                return None;
            }
            let summary = safe_truncate(&clean_text(&entry.summary), max_summary_chars);
            let published = entry.published.unwrap_or_else(|| {
                log::debug!("No usable date for {}, using fetch time", link);
                fetched_at
            });

            Some(NewsItem {
                domain: link_domain(&link),
                title,
                summary,
                link,
                published,
                source_index,
                source_name: source.label().to_string(),
            })
        })
        .collect();

    Ok(items)
}

/// Raw entry fields common to RSS and Atom.
struct RawEntry {
    title: String,
    link: String,
    summary: String,
    published: Option<DateTime<Utc>>,
}

fn rss_entries(channel: &rss::Channel) -> Vec<RawEntry> {
    channel
        .items()
        .iter()
        .map(|item| {
            let link = item
                .link()
                .map(str::to_string)
                .or_else(|| {
                    item.guid()
                        .filter(|g| g.is_permalink() && g.value().starts_with("http"))
                        .map(|g| g.value().to_string())
                })
                .unwrap_or_default();
            let summary = item
                .description()
                .or_else(|| item.content())
                .unwrap_or_default()
                .to_string();
            let published = item
                .pub_date()
                .and_then(parse_date)
                .or_else(|| {
                    item.dublin_core_ext()
                        .and_then(|dc| dc.dates().first())
                        .and_then(|d| parse_date(d))
                });

            RawEntry {
                title: item.title().unwrap_or_default().to_string(),
                link,
                summary,
                published,
            }
        })
        .collect()
}

fn atom_entries(feed: &atom_syndication::Feed) -> Vec<RawEntry> {
    feed.entries()
        .iter()
        .map(|entry| {
            let link = entry
                .links()
                .iter()
                .find(|l| l.rel() == "alternate")
                .or_else(|| entry.links().first())
                .map(|l| l.href().to_string())
                .unwrap_or_default();
            let summary = entry
                .summary()
                .map(|t| t.value.clone())
                .or_else(|| entry.content().and_then(|c| c.value()).map(str::to_string))
                .unwrap_or_default();
            // A missing <updated> parses as the Unix epoch.
            let published = entry
                .published()
                .or_else(|| Some(entry.updated()).filter(|d| d.timestamp() > 0))
                .map(|d| d.with_timezone(&Utc));

            RawEntry {
                title: entry.title().value.clone(),
                link,
                summary,
                published,
            }
        })
        .collect()
}

/// Parse a feed timestamp (RFC 2822, RFC 3339, or `YYYY-MM-DD HH:MM:SS` UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>District News</title><link>https://news.example.com</link><description>d</description>
  <item>
    <title>Board &amp; Budget</title>
    <link>https://www.news.example.com/budget</link>
    <description>&lt;p&gt;Trustees   approved the &lt;b&gt;budget&lt;/b&gt;.&lt;/p&gt;</description>
    <pubDate>Tue, 04 Mar 2025 15:30:00 GMT</pubDate>
  </item>
  <item>
    <title>Undated story</title>
    <link>https://news.example.com/undated</link>
  </item>
  <item>
    <title></title>
    <link>https://news.example.com/no-title</link>
  </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom District</title>
  <id>urn:example</id>
  <updated>2025-03-04T10:00:00Z</updated>
  <entry>
    <title>Bond election set</title>
    <id>urn:1</id>
    <link rel="alternate" href="https://atom.example.org/bond"/>
    <updated>2025-03-04T09:00:00-06:00</updated>
    <summary>Voters will decide in May.</summary>
  </entry>
</feed>"#;

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 5, 6, 0, 0).unwrap()
    }

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

    #[test]
    fn test_parse_rss() {
        let source = SourceConfig::new("District", "https://news.example.com/rss");
        let items = parse_feed(RSS.as_bytes(), 2, &source, fetched_at(), 600).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Board & Budget");
        assert_eq!(items[0].summary, "Trustees approved the budget.");
        assert_eq!(items[0].domain, "news.example.com");
        assert_eq!(items[0].source_index, 2);
        assert_eq!(
            items[0].published,
            Utc.with_ymd_and_hms(2025, 3, 4, 15, 30, 0).unwrap()
        );
        assert_eq!(items[1].published, fetched_at());
    }

    #[test]
    fn test_parse_atom() {
        let source = SourceConfig::new("Atom", "https://atom.example.org/feed");
        let items = parse_feed(ATOM.as_bytes(), 0, &source, fetched_at(), 600).unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://atom.example.org/bond");
        assert_eq!(items[0].summary, "Voters will decide in May.");
        assert_eq!(
            items[0].published,
            Utc.with_ymd_and_hms(2025, 3, 4, 15, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let source = SourceConfig::new("Broken", "https://broken.example.com/rss");
        let err = parse_feed(b"<html>nope</html>", 0, &source, fetched_at(), 600).unwrap_err();
        assert!(matches!(err, AppError::SourceFetch { .. }));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_date("Thu, 02 Jan 2025 03:04:05 +0000"), Some(expected));
        assert_eq!(parse_date("2025-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_date("2025-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[tokio::test]
    async fn test_read_all_skips_failing_sources() {
        let mut bodies = HashMap::new();
        bodies.insert("https://news.example.com/rss".to_string(), RSS.to_string());
        bodies.insert("https://atom.example.org/feed".to_string(), ATOM.to_string());
        bodies.insert(
            "https://broken.example.com/rss".to_string(),
            "not xml".to_string(),
        );

        let config = Config {
            sources: vec![
                SourceConfig::new("District", "https://news.example.com/rss"),
                SourceConfig::new("Down", "https://down.example.com/rss"),
                SourceConfig::new("Broken", "https://broken.example.com/rss"),
                SourceConfig::new("Atom", "https://atom.example.org/feed"),
            ],
            ..Config::default()
        };
        let reader = SourceReader::new(MapFetcher(bodies), &config);
        let outcome = reader
            .read_all(&config.enabled_sources(), fetched_at())
            .await;

        assert_eq!(outcome.sources_total, 4);
        assert_eq!(outcome.source_failures, 2);
        assert_eq!(outcome.items.len(), 3);
        assert_eq!(outcome.items[0].source_index, 0);
        assert_eq!(outcome.items[2].source_index, 3);
    }
}
