use clap::Parser;
use logscope_core::{Config, LogSearch, TermsOptions};
use std::path::PathBuf;

/// Build a log search request and print it without sending it.
#[derive(Parser)]
#[command(name = "logscope", about = "logscope: build log search requests")]
struct Cli {
    /// Window start (`YYYY-MM-DD`, `YYYY-MM-DD HH:MM[:SS]` or RFC 3339).
    #[arg(long)]
    start: String,
    /// Window end. A bare date means the end of that day.
    #[arg(long)]
    end: String,
    /// Free-text query.
    #[arg(long, default_value = "")]
    query: String,
    /// Geographic drill-down: `world`, `US`, `US-<STATE>` or a country code.
    #[arg(long)]
    region: Option<String>,
    /// Histogram interval (e.g. `day`, `hour`).
    #[arg(long)]
    interval: Option<String>,
    /// Add top/value-count/missing aggregations for a field (repeatable).
    #[arg(long = "term", value_name = "FIELD")]
    terms: Vec<String>,
    /// Bucket count for `--term` aggregations.
    #[arg(long, default_value_t = 10)]
    size: u32,
    /// Add the per-user last-activity aggregation.
    #[arg(long)]
    user_stats: bool,
    /// Read this config file instead of `~/.config/logscope/config.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write debug logs to stderr.
    #[arg(long)]
    debug: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("logscope debug logging enabled");
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = config.search.settings()?;

    let mut search = LogSearch::new(settings, cli.start.as_str(), cli.end.as_str())?;
    search.search(&cli.query).filter_by_date_range();
    if let Some(interval) = &cli.interval {
        search.aggregate_by_interval(interval);
    }
    if let Some(region) = &cli.region {
        search.aggregate_by_region(region);
    }
    for field in &cli.terms {
        search.aggregate_by_term(field, cli.size);
    }
    if cli.user_stats {
        search.aggregate_by_user_stats(TermsOptions::default());
    }

    println!("index: {}", search.index_pattern());
    println!("options: {}", serde_json::to_string(search.options())?);
    println!("{}", serde_json::to_string_pretty(search.request())?);
    Ok(())
}
