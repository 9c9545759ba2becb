//! newscast CLI
//!
//! Builds one daily episode from the configured sources and publishes it to
//! the local data directory.

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use newscast::{
    error::{AppError, EXIT_CONFIG, Result},
    models::Config,
    pipeline::{RunOptions, RunSummary, parse_episode_date, run_pipeline},
    services::{HttpFetcher, SourceReader, TtsProvider},
    storage::LocalStorage,
    utils::http,
};

/// newscast - daily news-to-podcast pipeline
#[derive(Parser, Debug)]
#[command(
    name = "newscast",
    version,
    about = "Turns configured RSS sources into a daily podcast episode"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Output directory (overrides `paths.data_dir`)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Episode date: `today` (in the configured timezone) or YYYY-MM-DD
    #[arg(long, default_value = "today")]
    date: String,

    /// Skip speech synthesis and publish text only
    #[arg(long)]
    no_tts: bool,

    /// Replace an existing episode for the date
    #[arg(long)]
    force: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Exit status for a failed run.
fn exit_status(err: &AppError) -> u8 {
    u8::try_from(err.exit_code()).unwrap_or(EXIT_CONFIG as u8)
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let mut config = Config::load(&cli.config)?;
    config.apply_env(|key| std::env::var(key).ok());
    config.validate()?;
    log::info!("Loaded configuration from {}", cli.config.display());

    let now = Utc::now();
    let date = parse_episode_date(&cli.date, now, config.tz()?)?;
    let provider = if cli.no_tts {
        TtsProvider::None
    } else {
        TtsProvider::from_env(|key| std::env::var(key).ok())?
    };
    log::info!("TTS provider: {}", provider.name());

    let data_dir = cli.data_dir.unwrap_or_else(|| config.paths.data_dir.clone());
    let storage = LocalStorage::new(&data_dir);
    let reader = SourceReader::new(HttpFetcher::new(&config.fetch)?, &config);
    let synthesizer =
        provider.build(http::create_tts_client(&config.fetch, config.tts.timeout_secs)?);

    let options = RunOptions::for_date(date, now, cli.force);
    run_pipeline(
        &config,
        &reader,
        synthesizer.as_deref(),
        &storage,
        &options,
    )
    .await
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(summary) => {
            if !summary.has_audio() {
                log::info!("Episode {} published without audio", summary.date);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}
