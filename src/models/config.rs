//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

use super::BlocklistSet;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RSS/Atom sources, in priority order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Domains whose items are never used (e.g. paywalled sites)
    #[serde(default)]
    pub blocklist_domains: Vec<String>,

    /// Case-insensitive words that drop an item when found in title or summary
    #[serde(default)]
    pub soft_word_filters: Vec<String>,

    /// IANA zone of the show; decides which calendar day `today` is
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    /// HTTP fetching behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Recency and text handling
    #[serde(default)]
    pub filter: FilterConfig,

    /// Episode size limits
    #[serde(default)]
    pub limits: Limits,

    /// Show metadata used in the published feed
    #[serde(default)]
    pub podcast: PodcastConfig,

    /// Speech synthesis behavior
    #[serde(default)]
    pub tts: TtsConfig,

    /// Output locations
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AppError::config(format!("invalid TOML: {e}")))
    }

    /// Override podcast metadata from `PODCAST_*` variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let podcast = &mut self.podcast;
        let fields: [(&str, &mut String); 6] = [
            ("PODCAST_TITLE", &mut podcast.title),
            ("PODCAST_AUTHOR", &mut podcast.author),
            ("PODCAST_EMAIL", &mut podcast.email),
            ("PODCAST_DESCRIPTION", &mut podcast.description),
            ("PODCAST_LINK", &mut podcast.link),
            ("PODCAST_ART_URL", &mut podcast.art_url),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value.trim().to_string();
            }
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(AppError::config("no sources defined"));
        }
        if !self.sources.iter().any(|s| s.enabled) {
            return Err(AppError::config("all sources are disabled"));
        }
        for source in &self.sources {
            let url = Url::parse(&source.url).map_err(|e| {
                AppError::config(format!("source '{}' has invalid url: {}", source.label(), e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(AppError::config(format!(
                    "source '{}' must use http or https",
                    source.label()
                )));
            }
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::config("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::config("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.max_concurrent == 0 {
            return Err(AppError::config("fetch.max_concurrent must be > 0"));
        }
        if self.filter.recency_hours == 0 {
            return Err(AppError::config("filter.recency_hours must be > 0"));
        }
        if self.limits.total() == 0 {
            return Err(AppError::config(
                "limits.top_stories + limits.quick_hits must be > 0",
            ));
        }
        if self.tts.timeout_secs == 0 {
            return Err(AppError::config("tts.timeout_secs must be > 0"));
        }
        self.tz()?;
        if self.podcast.title.trim().is_empty() {
            return Err(AppError::config("podcast.title is empty"));
        }
        Url::parse(&self.podcast.link)
            .map_err(|e| AppError::config(format!("podcast.link is invalid: {e}")))?;
        Ok(())
    }

    /// Sources that should be fetched this run, with their configured position.
    pub fn enabled_sources(&self) -> Vec<(usize, &SourceConfig)> {
        self.sources
            .iter()
            .enumerate()
            .filter(|(_, s)| s.enabled)
            .collect()
    }

    /// The show's time zone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|e| AppError::config(format!("unknown timezone {:?}: {e}", self.timezone)))
    }

    /// Build the normalized blocklist.
    pub fn blocklist(&self) -> BlocklistSet {
        BlocklistSet::from_domains(&self.blocklist_domains)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            blocklist_domains: Vec::new(),
            soft_word_filters: Vec::new(),
            timezone: defaults::timezone(),
            fetch: FetchConfig::default(),
            filter: FilterConfig::default(),
            limits: Limits::default(),
            podcast: PodcastConfig::default(),
            tts: TtsConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// A configured RSS or Atom source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceConfig {
    /// Display name used in logs (defaults to the URL)
    #[serde(default)]
    pub name: String,

    /// Feed URL
    pub url: String,

    /// Disabled sources are kept in the file but skipped
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,
}

impl SourceConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
        }
    }

    /// Name for logs and errors.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

/// HTTP client and fetching behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent feed requests
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Item eligibility settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Items published earlier than this many hours before the run are dropped
    #[serde(default = "defaults::recency_hours")]
    pub recency_hours: u64,

    /// Summaries are cut to this many characters when read
    #[serde(default = "defaults::max_summary_chars")]
    pub max_summary_chars: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            recency_hours: defaults::recency_hours(),
            max_summary_chars: defaults::max_summary_chars(),
        }
    }
}

/// How many items make it into an episode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Limits {
    #[serde(default = "defaults::top_stories")]
    pub top_stories: usize,

    #[serde(default = "defaults::quick_hits")]
    pub quick_hits: usize,
}

impl Limits {
    pub fn total(&self) -> usize {
        self.top_stories + self.quick_hits
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            top_stories: defaults::top_stories(),
            quick_hits: defaults::quick_hits(),
        }
    }
}

/// Show-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastConfig {
    #[serde(default = "defaults::podcast_title")]
    pub title: String,

    #[serde(default = "defaults::podcast_author")]
    pub author: String,

    #[serde(default = "defaults::podcast_email")]
    pub email: String,

    #[serde(default = "defaults::podcast_description")]
    pub description: String,

    /// Public base URL; episode and audio links are built under it
    #[serde(default = "defaults::podcast_link")]
    pub link: String,

    #[serde(default = "defaults::podcast_art_url")]
    pub art_url: String,

    #[serde(default = "defaults::language")]
    pub language: String,
}

impl PodcastConfig {
    /// Base link without a trailing slash.
    pub fn base_link(&self) -> &str {
        self.link.trim_end_matches('/')
    }
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            title: defaults::podcast_title(),
            author: defaults::podcast_author(),
            email: defaults::podcast_email(),
            description: defaults::podcast_description(),
            link: defaults::podcast_link(),
            art_url: defaults::podcast_art_url(),
            language: defaults::language(),
        }
    }
}

/// Speech synthesis settings (the provider itself comes from the environment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsConfig {
    /// Request timeout for provider calls
    #[serde(default = "defaults::tts_timeout")]
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::tts_timeout(),
        }
    }
}

/// Filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root for `episodes/` and `feed/`
    #[serde(default = "defaults::data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    pub fn enabled() -> bool {
        true
    }

    pub fn timezone() -> String {
        "America/Chicago".into()
    }

    // Fetch defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; newscast/0.1)".into()
    }
    pub fn timeout() -> u64 {
        12
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Filter defaults
    pub fn recency_hours() -> u64 {
        24
    }
    pub fn max_summary_chars() -> usize {
        600
    }

    // Limit defaults
    pub fn top_stories() -> usize {
        5
    }
    pub fn quick_hits() -> usize {
        5
    }

    // Podcast defaults
    pub fn podcast_title() -> String {
        "Automated ISD Daily".into()
    }
    pub fn podcast_author() -> String {
        "Automator".into()
    }
    pub fn podcast_email() -> String {
        "noreply@example.com".into()
    }
    pub fn podcast_description() -> String {
        "Daily K-12 headlines for ISDs".into()
    }
    pub fn podcast_link() -> String {
        "https://example.com/isd-podcast".into()
    }
    pub fn podcast_art_url() -> String {
        "https://example.com/art.jpg".into()
    }
    pub fn language() -> String {
        "en".into()
    }

    pub fn tts_timeout() -> u64 {
        120
    }

    pub fn data_dir() -> PathBuf {
        PathBuf::from("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            sources: vec![SourceConfig::new("Chalkbeat", "https://example.com/rss")],
            ..Config::default()
        }
    }

    #[test]
    fn validate_sample_config_ok() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_sources() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn validate_rejects_all_disabled() {
        let mut config = sample_config();
        config.sources[0].enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_source_url() {
        let mut config = sample_config();
        config.sources.push(SourceConfig::new("bad", "ftp://example.com/feed"));
        assert!(config.validate().is_err());

        config.sources[1].url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = sample_config();
        config.fetch.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_timezone() {
        let mut config = sample_config();
        config.timezone = "Mars/Olympus_Mons".into();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        config.timezone = "Europe/Berlin".into();
        assert_eq!(config.tz().unwrap(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn parse_applies_defaults() {
        let config = Config::parse(
            r#"
            blocklist_domains = ["wsj.com"]

            [[sources]]
            url = "https://example.com/rss"

            [[sources]]
            name = "Off"
            url = "https://example.org/atom"
            enabled = false

            [limits]
            top_stories = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.len(), 2);
        assert!(config.sources[0].enabled);
        assert_eq!(config.sources[0].label(), "https://example.com/rss");
        assert_eq!(config.enabled_sources().len(), 1);
        assert_eq!(config.limits.top_stories, 3);
        assert_eq!(config.limits.quick_hits, 5);
        assert_eq!(config.filter.recency_hours, 24);
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
        assert_eq!(config.tz().unwrap(), chrono_tz::America::Chicago);
        assert!(config.blocklist().contains_domain("www.wsj.com"));
    }

    #[test]
    fn parse_reports_config_error() {
        let err = Config::parse("sources = 3").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn apply_env_overrides_podcast() {
        let mut config = sample_config();
        config.apply_env(|key| match key {
            "PODCAST_TITLE" => Some("Morning Bell".to_string()),
            "PODCAST_LINK" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.podcast.title, "Morning Bell");
        assert_eq!(config.podcast.link, "https://example.com/isd-podcast");
    }
}
