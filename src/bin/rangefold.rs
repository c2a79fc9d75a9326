//! Command-line entry point: download a remote CSV in parallel and average one column.

use anyhow::{Context, Result};
use clap::Parser;
use rangefold::{Session, SessionConfig, Stopwatch};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fetch a remote CSV with parallel range requests and average one of its columns.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the CSV file.
    url: String,

    /// Column to average.
    #[arg(short, long, default_value = "tip_amount")]
    column: String,

    /// Parallel range requests during the download.
    #[arg(long)]
    fetch_workers: Option<usize>,

    /// Parallel scans during the reduction.
    #[arg(long)]
    reduce_workers: Option<usize>,

    /// JSON config file (see `SessionConfig`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep the downloaded file instead of deleting it on exit.
    #[arg(long)]
    keep: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "rangefold=info",
        _ => "rangefold=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose >= 2)
        .with_thread_names(verbose >= 2)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let fetch_workers = args.fetch_workers.unwrap_or(config.fetch.workers);
    let reduce_workers = args.reduce_workers.unwrap_or(config.reduce.workers);

    let mut session = Session::http(&args.url, config).context("set up HTTP client")?;
    let mut sw = Stopwatch::new();

    sw.start();
    let size = session.probe_size().with_context(|| format!("probe {}", args.url))?;
    let local = session
        .fetch(fetch_workers)
        .with_context(|| format!("fetch {}", args.url))?
        .to_path_buf();
    sw.stop();
    println!(
        "Fetched {size} bytes into {} in {:.3} s",
        local.display(),
        sw.elapsed().as_secs_f64()
    );

    sw.start();
    let outcome = session
        .average_of_column(&args.column, reduce_workers)
        .with_context(|| format!("average of {}", args.column));
    sw.stop();
    let records = session.state().total_record_count;

    if !args.keep {
        session.remove().context("remove local file")?;
    }
    let avg = outcome?;

    println!("Avg. {} {avg}", args.column);
    println!("Num records {records}");
    println!("Elapsed time: {:.3} s", sw.elapsed().as_secs_f64());
    Ok(())
}
