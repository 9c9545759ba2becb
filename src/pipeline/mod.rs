//! Pipeline stages for a daily episode.
//!
//! - `filter`: drop blocked, stale, repeated, and duplicate items
//! - `compose`: render the script and show notes
//! - `publish`: write episode artifacts and the feed
//! - `run_pipeline`: all stages in order

pub mod compose;
pub mod filter;
pub mod publish;
pub mod run;

pub use compose::{ComposedScript, ScriptComposer};
pub use filter::{FilterEngine, FilterReport};
pub use publish::{EpisodePublisher, PublishOutcome};
pub use run::{RunOptions, RunSummary, parse_episode_date, run_pipeline};
