//! News item data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::text::normalize_title;

/// A news item read from a configured source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    /// Headline, HTML stripped
    pub title: String,

    /// Feed-supplied summary, HTML stripped and truncated
    pub summary: String,

    /// Article URL (unique key within a run)
    pub link: String,

    /// Publication time, or fetch time when the feed omits it
    pub published: DateTime<Utc>,

    /// Host of `link`, lower-cased without `www.`
    pub domain: String,

    /// Position of the originating source in configuration
    pub source_index: usize,

    /// Display name of the originating source
    pub source_name: String,
}

impl NewsItem {
    /// Title key used for duplicate detection.
    pub fn title_key(&self) -> String {
        normalize_title(&self.title)
    }

    /// Format item for display using a template.
    ///
    /// Supported placeholders:
    /// - `{title}`, `{summary}`, `{link}`, `{domain}`, `{source}`, `{published}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{title}", &self.title)
            .replace("{summary}", &self.summary)
            .replace("{link}", &self.link)
            .replace("{domain}", &self.domain)
            .replace("{source}", &self.source_name)
            .replace("{published}", &self.published.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_item() -> NewsItem {
        NewsItem {
            title: "Board Approves  Budget!".to_string(),
            summary: "The trustees voted 5-2.".to_string(),
            link: "https://news.example.com/budget".to_string(),
            published: Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap(),
            domain: "news.example.com".to_string(),
            source_index: 0,
            source_name: "Example".to_string(),
        }
    }

    #[test]
    fn test_title_key() {
        assert_eq!(sample_item().title_key(), "board approves budget");
    }

    #[test]
    fn test_format() {
        let item = sample_item();
        let result = item.format("- [{title}]({link}) — {domain}");
        assert_eq!(
            result,
            "- [Board Approves  Budget!](https://news.example.com/budget) — news.example.com"
        );
    }
}
