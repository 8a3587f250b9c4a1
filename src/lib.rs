//! # Duplicate-finder engine
//!
//! A staged-hash duplicate file detector: recursive scan, progressive
//! grouping (size → boost key → partial content hashes → full content
//! hash), keep-one ranking, and a versioned JSON result format. See
//! `SPEC_FULL.md` for the full design.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dupe_engine::{Cli, ResolvedConfig};
//! use dupe_engine::scanner::Scanner;
//! use dupe_engine::dedup::Deduplicator;
//! use dupe_engine::progress::{NoopSink, StopToken};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::default();
//!     let config = ResolvedConfig::try_from(&cli)?;
//!     let stop = StopToken::new();
//!     let progress = Arc::new(NoopSink);
//!
//!     let scanner = Scanner::new(config.filters.clone(), stop.clone(), progress.clone());
//!     let scan = scanner.scan(&config.input).await?;
//!
//!     let dedup = Deduplicator::new(config.mode, config.boost, config.concurrency, stop, progress);
//!     let result = dedup.run(scan.files).await;
//!
//!     println!("Found {} duplicate groups", result.groups.len());
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use clap::Parser;

pub mod dedup;
pub mod error;
pub mod executor;
pub mod filters;
pub mod grouper;
pub mod hasher;
pub mod model;
pub mod output;
pub mod progress;
pub mod ranker;
pub mod scanner;
pub mod serializer;

pub use error::DuplicateFinderError;
pub use filters::Filters;
pub use model::{Boost, DedupResult, DuplicateGroup, FileRecord, Mode, ScanResult};
pub use ranker::SortKey;

/// Command-line surface: spec.md §6.
#[derive(Parser, Debug, Clone)]
#[command(name = "dupe-engine")]
#[command(about = "Find byte-identical duplicate files, fast")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "
Recursively scans a directory for byte-identical duplicate files using a
staged hashing algorithm that only reads as much of a file as necessary to
prove it is (or isn't) a duplicate. Optionally moves all but one file per
duplicate group to the OS trash.

Examples:
  dupe-engine -i /home/user/Documents
  dupe-engine -i /data --mode full --boost extension
  dupe-engine -i /data --keep-one --force
")]
pub struct Cli {
    /// Root directory to scan for duplicates
    #[arg(short = 'i', long)]
    pub input: PathBuf,

    /// Minimum file size to consider, e.g. `10KB`, `1MB` (default 1 byte)
    #[arg(short = 'm', long = "min-size", value_parser = parse_size, default_value = "1")]
    pub min_size: u64,

    /// Maximum file size to consider, e.g. `500MB` (default unbounded)
    #[arg(short = 'M', long = "max-size", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Space-separated list of extensions to include (with or without a leading dot)
    #[arg(short = 'x', long, value_delimiter = ' ', num_args = 0..)]
    pub extensions: Vec<String>,

    /// Space-separated list of directories whose files rank first within a group
    #[arg(short = 'p', long = "priority-dirs", value_delimiter = ' ', num_args = 0..)]
    pub priority_dirs: Vec<PathBuf>,

    /// Space-separated list of directories to exclude from the scan entirely
    #[arg(long = "excluded-dirs", value_delimiter = ' ', num_args = 0..)]
    pub excluded_dirs: Vec<PathBuf>,

    /// Initial grouping key applied before any content hashing
    #[arg(long, default_value = "size")]
    pub boost: String,

    /// Hashing thoroughness: fast (front only), normal (front+middle+end), full (whole file)
    #[arg(long, default_value = "normal")]
    pub mode: String,

    /// Within-group ordering used to decide which file survives `--keep-one`
    #[arg(long, default_value = "shortest-path")]
    pub sort: String,

    /// After finding duplicates, move every non-winning file per group to the trash
    #[arg(long)]
    pub keep_one: bool,

    /// With --keep-one, skip the confirmation prompt
    #[arg(long)]
    pub force: bool,

    /// Emit stage-by-stage statistics to stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Save the scan/duplicate report as JSON to this path instead of scanning stdout-only
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Load a previously saved JSON report instead of scanning
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Number of worker threads for hashing (0 = auto-detect, capped at 8)
    #[arg(short = 'j', long, default_value = "0")]
    pub threads: usize,
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            min_size: 1,
            max_size: None,
            extensions: Vec::new(),
            priority_dirs: Vec::new(),
            excluded_dirs: Vec::new(),
            boost: "size".to_string(),
            mode: "normal".to_string(),
            sort: "shortest-path".to_string(),
            keep_one: false,
            force: false,
            verbose: false,
            save: None,
            load: None,
            threads: 0,
        }
    }
}

/// Parses a size string with an optional `B|KB|MB|GB` suffix (powers of 1024).
pub fn parse_size(raw: &str) -> Result<u64, String> {
    let trimmed = raw.trim();
    let upper = trimmed.to_uppercase();
    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024u64.pow(3))
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024u64.pow(2))
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    let value: f64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("invalid size: {raw:?}"))?;
    if value < 0.0 {
        return Err(format!("size cannot be negative: {raw:?}"));
    }
    Ok((value * multiplier as f64) as u64)
}

/// The CLI, parsed and validated into engine-ready parameters.
/// Mirrors the teacher's `FileScanner::validate_config` split between raw
/// CLI args and a checked configuration.
pub struct ResolvedConfig {
    pub input: PathBuf,
    pub filters: Filters,
    pub mode: Mode,
    pub boost: Boost,
    pub sort: SortKey,
    pub concurrency: usize,
}

impl TryFrom<&Cli> for ResolvedConfig {
    type Error = DuplicateFinderError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let max_size = cli.max_size.unwrap_or(u64::MAX);
        if cli.min_size > max_size {
            return Err(DuplicateFinderError::UsageError(format!(
                "min-size ({}) is greater than max-size ({})",
                cli.min_size, max_size
            )));
        }

        let filters = Filters {
            min_size: cli.min_size,
            max_size,
            extensions: cli
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            excluded_dirs: cli.excluded_dirs.iter().cloned().collect(),
            priority_dirs: cli.priority_dirs.iter().cloned().collect(),
        };

        let mode = cli
            .mode
            .parse()
            .map_err(DuplicateFinderError::UsageError)?;
        let boost = cli
            .boost
            .parse()
            .map_err(DuplicateFinderError::UsageError)?;
        let sort = cli
            .sort
            .parse()
            .map_err(DuplicateFinderError::UsageError)?;

        let concurrency = if cli.threads == 0 {
            num_cpus::get().min(8)
        } else {
            cli.threads
        };

        Ok(ResolvedConfig {
            input: cli.input.clone(),
            filters,
            mode,
            boost,
            sort,
            concurrency,
        })
    }
}
