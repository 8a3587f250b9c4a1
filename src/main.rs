//! # Duplicate-finder CLI
//!
//! Wires the scan → dedup → rank → keep-one pipeline together and presents
//! it as a command-line tool. Mirrors the teacher's `main.rs` structure:
//! parse args, init logging, run, format, exit with a meaningful code.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use dupe_engine::dedup::Deduplicator;
use dupe_engine::executor::{self, keep_one};
use dupe_engine::output;
use dupe_engine::progress::{ProgressEvent, ProgressSink, StopToken};
use dupe_engine::ranker;
use dupe_engine::scanner::Scanner;
use dupe_engine::serializer;
use dupe_engine::{Cli, DuplicateFinderError, ResolvedConfig};

/// Prints progress/warning events to stderr via an `indicatif` bar for scan
/// progress and plain `tracing` lines for everything else.
struct CliProgress {
    bar: indicatif::ProgressBar,
}

impl ProgressSink for CliProgress {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::ScanProgress { files_seen } => {
                self.bar.set_message(format!("{files_seen} files discovered"));
                self.bar.tick();
            }
            ProgressEvent::StageProgress {
                stage_name,
                done,
                total,
            } => {
                self.bar.set_message(format!("{stage_name}: {done}/{total}"));
                self.bar.tick();
            }
            ProgressEvent::Warning { path, message } => {
                warn!(path = %path.display(), %message, "scan warning");
            }
            ProgressEvent::Done { summary } => {
                info!(%summary, "stage complete");
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            match e {
                DuplicateFinderError::UsageError(_) => ExitCode::from(1),
                DuplicateFinderError::Cancelled => ExitCode::from(130),
                _ => ExitCode::from(2),
            }
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, DuplicateFinderError> {
    let stop = StopToken::new();
    {
        let stop = stop.clone();
        let _ = ctrlc::set_handler(move || stop.stop());
    }

    let bar = indicatif::ProgressBar::new_spinner();
    bar.set_style(
        indicatif::ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
    );
    let progress: Arc<dyn ProgressSink> = Arc::new(CliProgress { bar: bar.clone() });

    let loaded_from_disk = cli.load.is_some();

    let (scan, dedup) = if let Some(load_path) = &cli.load {
        info!(path = %load_path.display(), "loading saved report");
        serializer::load(load_path)?
    } else {
        let config = ResolvedConfig::try_from(&cli)?;

        let scanner = Scanner::new(config.filters.clone(), stop.clone(), Arc::clone(&progress));
        let scan = scanner.scan(&config.input).await?;
        info!(files = scan.files.len(), "scan complete");

        if stop.is_stopped() {
            return Err(DuplicateFinderError::Cancelled);
        }

        let dedup_engine = Deduplicator::new(
            config.mode,
            config.boost,
            config.concurrency,
            stop.clone(),
            Arc::clone(&progress),
        );
        let mut dedup = dedup_engine.run(scan.files.clone()).await;

        if stop.is_stopped() {
            return Err(DuplicateFinderError::Cancelled);
        }

        let sort_key = config.sort;
        for group in &mut dedup.groups {
            ranker::rank(&mut group.members, &config.filters, sort_key);
        }

        (scan, dedup)
    };

    bar.finish_and_clear();

    let filters = scan.filters.clone();
    print!("{}", output::format_text(&dedup, &filters));
    print!("{}", output::format_summary(&scan, &dedup));

    if let Some(save_path) = &cli.save {
        output::save_json(&scan, &dedup, save_path)?;
        info!(path = %save_path.display(), "report saved");
    }

    if cli.keep_one {
        let mut dedup = dedup;

        if loaded_from_disk {
            dedup = reverify_loaded_result(dedup, &scan, &cli, &stop, &progress).await?;
        }

        if dedup.groups.is_empty() {
            return Ok(ExitCode::SUCCESS);
        }
        if !cli.force && !confirm_deletion(&dedup)? {
            info!("keep-one cancelled by user");
            return Ok(ExitCode::SUCCESS);
        }

        let outcome = keep_one(&mut dedup, &stop, &progress, executor::move_to_trash).await;
        println!(
            "moved {} files to trash ({} failed)",
            outcome.moved,
            outcome.failed.len()
        );
        for (path, message) in &outcome.failed {
            error!(path = %path.display(), %message, "failed to trash file");
        }
        if stop.is_stopped() {
            return Err(DuplicateFinderError::Cancelled);
        }
        if outcome.had_failures() {
            return Ok(ExitCode::from(2));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Before trusting a `--load`ed report enough to delete anything: re-stat
/// every member (dropping any that vanished or changed size since the
/// report was saved) and, if the loaded mode doesn't match the mode the
/// user asked this run to use, re-hash from scratch rather than act on
/// fingerprints that were only ever trusted for display. Mirrors spec.md
/// §4.9's load contract.
async fn reverify_loaded_result(
    mut dedup: dupe_engine::DedupResult,
    scan: &dupe_engine::ScanResult,
    cli: &Cli,
    stop: &StopToken,
    progress: &Arc<dyn ProgressSink>,
) -> Result<dupe_engine::DedupResult, DuplicateFinderError> {
    let requested_mode: dupe_engine::Mode =
        cli.mode.parse().map_err(DuplicateFinderError::UsageError)?;

    if requested_mode != dedup.mode {
        info!(
            loaded_mode = %dedup.mode,
            %requested_mode,
            "loaded report mode differs from requested mode, re-hashing"
        );
        let sort_key: dupe_engine::SortKey =
            cli.sort.parse().map_err(DuplicateFinderError::UsageError)?;
        let fresh_files: Vec<_> = scan
            .files
            .iter()
            .map(|f| Arc::new(dupe_engine::FileRecord::new(f.path.clone(), f.size, f.mtime)))
            .collect();
        let dedup_engine = Deduplicator::new(
            requested_mode,
            dedup.boost,
            num_cpus::get().min(8),
            stop.clone(),
            Arc::clone(progress),
        );
        let mut rehashed = dedup_engine.run(fresh_files).await;
        for group in &mut rehashed.groups {
            ranker::rank(&mut group.members, &scan.filters, sort_key);
        }
        return Ok(rehashed);
    }

    let mut surviving = Vec::with_capacity(dedup.groups.len());
    for mut group in dedup.groups.drain(..) {
        let stale = serializer::stale_members(&group).await;
        if !stale.is_empty() {
            let stale_paths: std::collections::HashSet<_> =
                stale.iter().map(|m| m.path.clone()).collect();
            group.members.retain(|m| !stale_paths.contains(&m.path));
        }
        if group.members.len() > 1 {
            surviving.push(group);
        }
    }
    dedup.groups = surviving;
    Ok(dedup)
}

fn confirm_deletion(dedup: &dupe_engine::DedupResult) -> Result<bool, DuplicateFinderError> {
    let losers: usize = dedup
        .groups
        .iter()
        .map(|g| g.members.len().saturating_sub(1))
        .sum();
    print!(
        "About to move {losers} files to the trash, keeping one winner per group. Continue? [y/N] "
    );
    use std::io::Write;
    std::io::stdout()
        .flush()
        .map_err(|e| DuplicateFinderError::UsageError(e.to_string()))?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .map_err(|e| DuplicateFinderError::UsageError(e.to_string()))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
