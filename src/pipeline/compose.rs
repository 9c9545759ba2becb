// src/pipeline/compose.rs

//! Script composer.
//!
//! Renders the narrated script and the show notes from the ordered item
//! list. Output depends only on the inputs, so the same items and date always
//! produce byte-identical text.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

use crate::models::{Limits, NewsItem};
use crate::utils::text::safe_truncate;

const INTRO: &str = "Good morning! Here are today's top headlines from {show} for {date}. \
We'll start with the big stories, then a few quick hits.";

const NO_STORIES: &str = "There are no new stories today.";

const OUTRO: &str = "That's your daily update. Links to all stories are in the show notes. \
Have a great day.";

const TOP_STORY_BLURB_CHARS: usize = 600;
const QUICK_HIT_BLURB_CHARS: usize = 300;

/// Output of a compose step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedScript {
    pub script: String,
    pub notes: String,
    /// Lower-case hex SHA-256 of `script`
    pub sha256: String,
}

/// Deterministic script renderer.
#[derive(Debug, Clone)]
pub struct ScriptComposer {
    show_title: String,
    limits: Limits,
}

impl ScriptComposer {
    pub fn new(show_title: impl Into<String>, limits: Limits) -> Self {
        Self {
            show_title: show_title.into(),
            limits,
        }
    }

    /// Spoken form of the episode date, e.g. `Wednesday, March 05, 2025`.
    pub fn date_label(date: NaiveDate) -> String {
        date.format("%A, %B %d, %Y").to_string()
    }

    /// Render script and show notes for `items`, which must already be ordered.
    pub fn compose(&self, date: NaiveDate, items: &[NewsItem]) -> ComposedScript {
        let script = self.render_script(date, items);
        let notes = self.render_notes(date, items);
        let sha256 = hex::encode(Sha256::digest(script.as_bytes()));
        ComposedScript {
            script,
            notes,
            sha256,
        }
    }

    fn render_script(&self, date: NaiveDate, items: &[NewsItem]) -> String {
        let top_count = self.limits.top_stories.min(items.len());
        let (top, rest) = items.split_at(top_count);
        let quick = &rest[..self.limits.quick_hits.min(rest.len())];

        let mut lines = vec![
            INTRO
                .replace("{show}", &self.show_title)
                .replace("{date}", &Self::date_label(date)),
            String::new(),
        ];

        if items.is_empty() {
            lines.push(NO_STORIES.to_string());
            lines.push(String::new());
        }

        if !top.is_empty() {
            lines.push("Top stories:".to_string());
            for (i, item) in top.iter().enumerate() {
                let marker = format!("{}.", i + 1);
                lines.push(story_line(&marker, item, TOP_STORY_BLURB_CHARS));
            }
            lines.push(String::new());
        }

        if !quick.is_empty() {
            lines.push("Quick hits:".to_string());
            for item in quick {
                lines.push(story_line("-", item, QUICK_HIT_BLURB_CHARS));
            }
            lines.push(String::new());
        }

        lines.push(OUTRO.to_string());
        let mut script = lines.join("\n").trim().to_string();
        script.push('\n');
        script
    }

    fn render_notes(&self, date: NaiveDate, items: &[NewsItem]) -> String {
        let mut notes = vec![
            format!("# {} — {}", self.show_title, Self::date_label(date)),
            String::new(),
        ];
        if items.is_empty() {
            notes.push(NO_STORIES.to_string());
        }
        for item in items {
            notes.push(item.format("- [{title}]({link}) — {domain}"));
        }
        notes.join("\n") + "\n"
    }
}

/// One spoken story: `marker headline — blurb (Source: domain).`
fn story_line(marker: &str, item: &NewsItem, blurb_chars: usize) -> String {
    let blurb = safe_truncate(&item.summary, blurb_chars);
    let source = if item.domain.is_empty() {
        item.source_name.as_str()
    } else {
        item.domain.as_str()
    };
    let blurb = blurb.trim_end_matches('.');
    if blurb.is_empty() {
        format!("{} {} (Source: {}).", marker, item.title, source)
    } else {
        format!("{} {} — {} (Source: {}).", marker, item.title, blurb, source)
    }
}
