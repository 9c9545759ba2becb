//! Service layer for the podcast pipeline.
//!
//! This module contains the collaborators that talk to the outside world:
//! - Feed reading (`SourceReader`)
//! - Speech synthesis (`SpeechSynthesizer` implementations)

pub mod sources;
pub mod synthesis;

pub use sources::{FeedFetcher, HttpFetcher, ReadOutcome, SourceReader};
pub use synthesis::{ProviderError, SpeechSynthesizer, TtsProvider};
