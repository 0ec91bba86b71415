//! `rendezvous` CLI — decode free/busy strings and recommend meeting times.
//!
//! ## Usage
//!
//! ```sh
//! # Decode a status string into timestamped intervals
//! rendezvous decode --view 00220 --start 2026-03-16T09:00:00Z
//!
//! # Recommend slots from a request document (stdin → stdout)
//! rendezvous recommend < request.json
//!
//! # Same, with tunables and output file
//! rendezvous recommend -i request.json -o slots.json --config rendezvous.toml
//!
//! # Fetch per-account free/busy without scoring
//! rendezvous availability -i request.json
//! ```

mod document;
mod logging;

use std::io::{self, Read};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rendezvous_engine::{decode_status_string, RecommendConfig, RecommendRequest, Recommender};
use serde::Serialize;

use crate::document::RequestDocument;

#[derive(Parser)]
#[command(
    name = "rendezvous",
    version,
    about = "Cross-tenant meeting time recommendations"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a free/busy status string into intervals
    Decode {
        /// Status string, one character per cell (0 free, 1 tentative, 2 busy, 3 oof, 4 elsewhere)
        #[arg(long)]
        view: String,
        /// Start of the first cell (RFC 3339)
        #[arg(long)]
        start: String,
        /// Cell size in minutes
        #[arg(long, default_value_t = 30)]
        interval: u32,
    },
    /// Recommend meeting slots for a request document
    Recommend {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// TOML file with recommendation tunables
        #[arg(long)]
        config: Option<String>,
    },
    /// Collect per-account free/busy for a request document without scoring
    Availability {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// TOML file with recommendation tunables
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Decode {
            view,
            start,
            interval,
        } => {
            let start = parse_instant(&start)?;
            if interval == 0 {
                anyhow::bail!("--interval must be positive");
            }
            let intervals = decode_status_string(&view, start, interval);
            write_output(None, &to_json(&intervals)?)?;
        }
        Commands::Recommend {
            input,
            output,
            config,
        } => {
            let (recommender, request) = prepare(input.as_deref(), config.as_deref())?;
            let response = recommender
                .recommend(&request)
                .await
                .context("Failed to recommend meeting times")?;
            write_output(output.as_deref(), &to_json(&response)?)?;
        }
        Commands::Availability {
            input,
            output,
            config,
        } => {
            let (recommender, request) = prepare(input.as_deref(), config.as_deref())?;
            let collection = recommender
                .collect_schedules(
                    &request.persons,
                    request.start,
                    request.end,
                    request.time_zone.as_deref(),
                )
                .await
                .context("Failed to collect schedules")?;
            write_output(output.as_deref(), &to_json(&collection)?)?;
        }
    }

    Ok(())
}

/// Read the request document and config, and build a recommender over the
/// document's inline calendars.
fn prepare(input: Option<&str>, config: Option<&str>) -> Result<(Recommender, RecommendRequest)> {
    let config = match config {
        Some(path) => RecommendConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path))?,
        None => RecommendConfig::default(),
    };

    let raw = read_input(input)?;
    let document: RequestDocument =
        serde_json::from_str(&raw).context("Failed to parse request document")?;
    let (request, source) = document.into_parts();
    tracing::debug!(
        persons = request.persons.len(),
        duration = request.duration_minutes,
        "loaded request document"
    );

    Ok((Recommender::with_config(Arc::new(source), config), request))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid RFC 3339 timestamp: {}", raw))
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    json.push('\n');
    Ok(json)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
