//! revbot — automated change-set review.
//!
//! Entry point for the `revbot` binary. Collects a repository's change set,
//! sends a bounded diff to an inference backend, records the returned
//! findings as inline annotations in the local store, and retracts
//! annotations from earlier runs whose locations no longer have findings.

mod backend;
mod config;
mod error;
mod git;
mod prompt;
mod report;
mod run;

use std::path::PathBuf;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::git::types::DiffMode;

#[derive(Parser)]
#[command(name = "revbot", about = "Automated change-set review", version)]
struct Cli {
    /// Path to the repository to review
    #[arg(long, default_value = ".")]
    repo: String,

    /// Diff mode: unstaged, staged, range, or branch
    #[arg(long, default_value = "unstaged")]
    mode: DiffMode,

    /// Explicit commit range `FROM..TO` (implies --mode range)
    #[arg(long)]
    range: Option<String>,

    /// Print the review and planned retractions without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Override the configured diff byte budget
    #[arg(long)]
    budget_bytes: Option<usize>,

    /// Override the configured inline annotation cap
    #[arg(long)]
    max_inline: Option<usize>,

    /// Config file path (default: $XDG_CONFIG_HOME/revbot/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Splits a `FROM..TO` range argument into its two refs.
fn parse_range(range: &str) -> Result<(String, String), String> {
    match range.split_once("..") {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => {
            Ok((from.to_owned(), to.to_owned()))
        }
        _ => Err(format!("invalid range '{range}' (expected FROM..TO)")),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the flag so ad-hoc filtering stays possible.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = config::Config::load(cli.config.as_deref());
    if let Some(budget) = cli.budget_bytes {
        config.review.budget_bytes = budget;
    }
    if let Some(cap) = cli.max_inline {
        config.review.max_inline = cap;
    }

    let range = match cli.range.as_deref().map(parse_range).transpose() {
        Ok(range) => range,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    let options = run::RunOptions {
        repo_path: cli.repo,
        mode: cli.mode,
        range,
        dry_run: cli.dry_run,
    };

    if let Err(e) = run::run(&options, &config).await {
        error!("review failed: {e}");
        std::process::exit(1);
    }
}
