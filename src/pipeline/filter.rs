// src/pipeline/filter.rs

//! Filter & dedup engine.
//!
//! Turns the raw items of every source into the ordered list an episode is
//! composed from. Rules run in a fixed order:
//!
//! 1. blocklisted domains
//! 2. soft word filters
//! 3. recency window
//! 4. links or titles used by earlier episodes
//! 5. duplicates within the run (same link, then same normalized title)
//!
//! When several copies of a story survive to step 5, the earliest published
//! copy wins, then the lowest source index, then the title.

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::models::{BlocklistSet, Config, NewsItem, PublishedHistory};

/// Upper bound on the recency window (ten years).
const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

/// Counters for each drop reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub input: usize,
    pub blocked: usize,
    pub soft_filtered: usize,
    pub stale: usize,
    pub previously_published: usize,
    pub duplicates: usize,
    pub over_limit: usize,
    pub kept: usize,
}

/// Stateless item filter built from configuration.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    blocklist: BlocklistSet,
    soft_words: Vec<String>,
    window: Duration,
    limit: Option<usize>,
}

impl FilterEngine {
    pub fn new(blocklist: BlocklistSet, window: Duration) -> Self {
        Self {
            blocklist,
            soft_words: Vec::new(),
            window,
            limit: None,
        }
    }

    /// Build the engine from the run configuration.
    pub fn from_config(config: &Config) -> Self {
        let hours = config.filter.recency_hours.min(MAX_WINDOW_HOURS) as i64;
        Self::new(config.blocklist(), Duration::hours(hours))
            .with_soft_words(&config.soft_word_filters)
            .with_limit(config.limits.total())
    }

    pub fn with_soft_words<S: AsRef<str>>(mut self, words: &[S]) -> Self {
        self.soft_words = words
            .iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Filter, dedup, and order `items` relative to `reference_time`.
    pub fn apply(
        &self,
        items: Vec<NewsItem>,
        reference_time: DateTime<Utc>,
        history: &PublishedHistory,
    ) -> (Vec<NewsItem>, FilterReport) {
        let mut report = FilterReport {
            input: items.len(),
            ..FilterReport::default()
        };
        let cutoff = reference_time - self.window;

        let mut candidates = Vec::with_capacity(items.len());
        for item in items {
            if self.blocklist.contains_domain(&item.domain) {
                log::debug!("Blocked domain {}: {}", item.domain, item.link);
                report.blocked += 1;
            } else if self.is_soft_filtered(&item) {
                log::debug!("Soft-filtered: {}", item.title);
                report.soft_filtered += 1;
            } else if item.published < cutoff {
                report.stale += 1;
            } else if history.contains_link(&item.link) || history.contains_title(&item.title_key())
            {
                log::debug!("Already published: {}", item.link);
                report.previously_published += 1;
            } else {
                candidates.push(item);
            }
        }

        // Canonical order decides which duplicate survives.
        candidates.sort_by(first_reported);
        let mut seen_links = HashSet::new();
        let mut seen_titles = HashSet::new();
        let mut kept: Vec<NewsItem> = Vec::with_capacity(candidates.len());
        for item in candidates {
            // Titles made only of symbols normalize to "" and never match.
            let title_key = item.title_key();
            let repeated_title = !title_key.is_empty() && !seen_titles.insert(title_key);
            if !seen_links.insert(item.link.clone()) || repeated_title {
                report.duplicates += 1;
                continue;
            }
            kept.push(item);
        }

        kept.sort_by(episode_order);
        if let Some(limit) = self.limit {
            if kept.len() > limit {
                report.over_limit = kept.len() - limit;
                kept.truncate(limit);
            }
        }

        report.kept = kept.len();
        (kept, report)
    }

    fn is_soft_filtered(&self, item: &NewsItem) -> bool {
        if self.soft_words.is_empty() {
            return false;
        }
        let haystack = format!("{} {}", item.title, item.summary).to_lowercase();
        self.soft_words.iter().any(|w| haystack.contains(w.as_str()))
    }
}

/// Earliest published first, then source order, then title.
fn first_reported(a: &NewsItem, b: &NewsItem) -> Ordering {
    a.published
        .cmp(&b.published)
        .then(a.source_index.cmp(&b.source_index))
        .then_with(|| a.title.cmp(&b.title))
}

/// Newest first, then source order, then title.
fn episode_order(a: &NewsItem, b: &NewsItem) -> Ordering {
    b.published
        .cmp(&a.published)
        .then(a.source_index.cmp(&b.source_index))
        .then_with(|| a.title.cmp(&b.title))
}
