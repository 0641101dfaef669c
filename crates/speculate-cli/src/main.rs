#![forbid(unsafe_code)]

//! Speculate CLI
//!
//! Simulates a slow router choosing among slow providers, with every
//! provider call started before the router has answered.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use speculate::{
    FallbackPolicy, Outcome, Predicate, RaceConfig, RaceError, Resolution, Speculation,
};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

/// Speculative execution demo
#[derive(Parser, Debug)]
#[command(name = "speculate", author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging for the race internals
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Race a simulated router against pre-started provider calls
    Race(RaceArgs),
    /// Dispatch a delayed message in the background and return
    Background(BackgroundArgs),
}

#[derive(Args, Debug)]
struct RaceArgs {
    /// Candidate providers, most likely first
    #[arg(long, value_delimiter = ',', required = true)]
    candidates: Vec<String>,

    /// Provider the simulated router will pick
    #[arg(long)]
    answer: String,

    /// Router latency in milliseconds
    #[arg(long, default_value_t = 150)]
    predicate_ms: u64,

    /// Provider latency in milliseconds
    #[arg(long, default_value_t = 100)]
    outcome_ms: u64,

    /// Cap on worker threads (default: candidates + 1)
    #[arg(long)]
    max_workers: Option<usize>,

    /// Fail instead of calling an unlisted provider
    #[arg(long)]
    no_fallback: bool,

    /// TOML file with race settings; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct BackgroundArgs {
    /// Message to log from the background worker
    #[arg(long)]
    message: String,

    /// Delay before the background work logs
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// How long the process stays up after dispatching
    #[arg(long, default_value_t = 300)]
    linger_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "info,speculate=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Command::Race(args) => run_race(args).await,
        Command::Background(args) => run_background(args).await,
    }
}

fn resolve_config(args: &RaceArgs) -> Result<RaceConfig> {
    let mut config = match &args.config {
        Some(path) => RaceConfig::load(path)?,
        None => RaceConfig::default(),
    };
    if let Some(max_workers) = args.max_workers {
        config.max_workers = Some(max_workers);
    }
    if args.no_fallback {
        config.on_miss = FallbackPolicy::Fail;
    }
    config.validate()?;
    Ok(config)
}

async fn run_race(args: RaceArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let predicate_delay = Duration::from_millis(args.predicate_ms);
    let outcome_delay = Duration::from_millis(args.outcome_ms);
    let answer = args.answer.clone();

    tracing::info!(
        candidates = ?args.candidates,
        answer = %answer,
        max_workers = ?config.max_workers,
        on_miss = ?config.on_miss,
        "Starting race"
    );

    let speculation = Speculation::new(
        args.candidates,
        Outcome::new(move |provider: String| {
            tracing::debug!(provider = %provider, "Calling provider");
            thread::sleep(outcome_delay);
            Ok::<_, std::io::Error>(format!("response from {provider}"))
        }),
    )
    .with_config(config);

    let predicate = Predicate::new(move || {
        thread::sleep(predicate_delay);
        Ok::<_, std::io::Error>(answer)
    });

    let started = Instant::now();
    let result = tokio::task::spawn_blocking(move || speculation.run_with_report(predicate)).await?;
    let elapsed = started.elapsed();

    match result {
        Ok(report) => {
            let source = match report.resolution {
                Resolution::Precomputed { index } => format!("pre-started candidate #{index}"),
                Resolution::Fresh => "fresh call".to_string(),
            };
            tracing::info!(
                race_id = %report.race_id,
                elapsed_ms = elapsed.as_millis() as u64,
                cancelled = report.cancellations.len(),
                "Race resolved"
            );
            println!("{} ({source}, {} ms)", report.value, elapsed.as_millis());
            Ok(())
        }
        Err(RaceError::NoMatchingOutcome { predicate_output }) => {
            tracing::error!(answer = %predicate_output, "Router picked an unlisted provider");
            Err(anyhow::anyhow!(
                "router picked '{}', which is not a candidate (fallback disabled)",
                predicate_output
            ))
        }
        Err(err) => {
            tracing::error!("Race failed: {}", err);
            Err(err.into())
        }
    }
}

async fn run_background(args: BackgroundArgs) -> Result<()> {
    let delay = Duration::from_millis(args.delay_ms);
    let message = args.message;

    speculate::spawn_async(move || async move {
        tokio::time::sleep(delay).await;
        tracing::info!(message = %message, "Background work finished");
    });
    tracing::info!("Background work dispatched");

    tokio::time::sleep(Duration::from_millis(args.linger_ms)).await;
    Ok(())
}
