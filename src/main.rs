//! rov - offline route origin validation from the command line.
//!
//! Loads a feed directory, then validates one (prefix, ASN) pair, a batch
//! file of them, or prints what was loaded.

#![allow(clippy::uninlined_format_args)]

use anyhow::{bail, Context, Result};
use clap::Parser;
use rov::{Query, Rov, RovConfig, RovError, ValidationResult};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Get the version string for rov
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the validator.
#[derive(Parser, Debug)]
#[clap(author, version = get_version(), about = "Offline route origin validation against IRR, RPKI and RIR delegations", long_about = None)]
struct Args {
    /// Announced prefix, e.g. 8.8.8.0/24
    prefix: Option<String>,

    /// Origin ASN, e.g. 15169 or AS15169
    asn: Option<String>,

    /// Directory holding the feed files
    #[clap(long, env = "ROV_FEEDS")]
    feeds: PathBuf,

    /// Validate RPKI against an archived day (YYYY/MM/DD)
    #[clap(long)]
    snapshot: Option<String>,

    /// Validate every `prefix asn [snapshot]` line of a file
    #[clap(long, conflicts_with_all = ["prefix", "asn"])]
    batch: Option<PathBuf>,

    /// Print which sources are loaded instead of validating
    #[clap(long)]
    status: bool,

    /// Fail unless every source was loaded
    #[clap(long)]
    strict: bool,

    /// Build source indices one after another
    #[clap(long)]
    sequential: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// One line of batch output
#[derive(Serialize)]
#[serde(untagged)]
enum BatchEntry {
    Result(Box<ValidationResult>),
    Error { line: usize, input: String, error: String },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    // Create single-threaded tokio runtime; the only async work is file I/O
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    if let Err(e) = runtime.block_on(async_main(args)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn async_main(args: Args) -> Result<()> {
    let config = RovConfig::builder()
        .parallel_load(!args.sequential)
        .require_complete(args.strict)
        .build()
        .map_err(anyhow::Error::msg)?;

    let feeds = rov::load_dir(&args.feeds)
        .await
        .with_context(|| format!("Failed to load feeds from {}", args.feeds.display()))?;

    let validator = Rov::with_config(config);
    let report = validator.load_databases(feeds);
    tracing::info!(elapsed = ?report.elapsed, "Feeds loaded");

    if args.status {
        return print_json(&validator.load_status());
    }

    if let Some(path) = &args.batch {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read batch file {}", path.display()))?;
        return print_json(&run_batch(&validator, &text, args.snapshot.as_deref())?);
    }

    let (Some(prefix), Some(asn)) = (&args.prefix, &args.asn) else {
        bail!("PREFIX and ASN are required unless --batch or --status is given");
    };

    let result = validator.check_str(prefix, asn, args.snapshot.as_deref())?;
    print_json(&result)
}

/// Validate each non-comment line. Malformed lines are reported in place;
/// a load error aborts the whole batch.
fn run_batch(validator: &Rov, text: &str, default_snapshot: Option<&str>) -> Result<Vec<BatchEntry>> {
    let mut entries = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed = Query::parse_line(line).and_then(|q| match (q.snapshot, default_snapshot) {
            (None, Some(s)) => Ok(q.at(s.parse()?)),
            _ => Ok(q),
        });

        let entry = match parsed.and_then(|q| validator.check_query(&q)) {
            Ok(result) => BatchEntry::Result(Box::new(result)),
            Err(e @ RovError::LoadIncomplete { .. }) => return Err(e.into()),
            Err(e) => BatchEntry::Error {
                line: n + 1,
                input: line.to_string(),
                error: e.to_string(),
            },
        };
        entries.push(entry);
    }

    Ok(entries)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
