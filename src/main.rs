mod cli;
mod logging;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use colored::*;
use dotenv::dotenv;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use textdup::model::DuplicateGroup;
use textdup::{
    FsDocumentStore, MatchMode, ProgressReporter, ScanConfig, ScanEngine, ScanSession,
};
use tracing::{error, info};

static DEFAULT_CACHE_PATH: &str = "textdup_cache.json";

fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match textdup::app_config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Scan {
            root,
            mode,
            threshold,
        }) => {
            run_scan(config, root, mode, threshold)?;
        }
        Some(Commands::CacheStats) => {
            let session = ScanSession::load(cache_path())?;
            println!("{} cache entries in {}", session.cache.len(), cache_path().display());
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(Commands::ClearCache) => {
            match prompt_confirm(
                "Are you SURE you want to empty the metadata cache?",
                Some(false),
            ) {
                Ok(true) => {
                    let mut session = ScanSession::load(cache_path())?;
                    let before = session.cache.len();
                    session.cache.clear();
                    session.flush()?;
                    println!("Cache cleared ({} entries removed)", before);
                }
                _ => {
                    process::exit(0);
                }
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn cache_path() -> PathBuf {
    std::env::var("TEXTDUP_CACHE_PATH")
        .unwrap_or_else(|_| DEFAULT_CACHE_PATH.to_string())
        .into()
}

fn run_scan(
    mut config: ScanConfig,
    root: PathBuf,
    mode: Option<String>,
    threshold: Option<f64>,
) -> anyhow::Result<()> {
    if let Some(mode) = mode {
        config.mode = match mode.as_str() {
            "exact" => MatchMode::Exact,
            "canonical" => MatchMode::Canonical,
            "near" => MatchMode::Near,
            other => anyhow::bail!("unknown mode '{}'", other),
        };
    }
    if let Some(threshold) = threshold {
        config.similarity_threshold = threshold;
    }

    let store = FsDocumentStore::new(&root);
    let mut session =
        ScanSession::load(cache_path()).context("loading metadata cache snapshot")?;
    let engine = ScanEngine::new(&store, config);

    let reporter = CliReporter::new();
    let outcome = engine.scan(&mut session, &reporter)?;
    session.flush().context("flushing metadata cache snapshot")?;

    println!();
    if outcome.truncated {
        println!(
            "{}",
            "Corpus exceeded the document ceiling; only the largest documents were compared."
                .yellow()
        );
    }
    info!(
        "Scan: {}, {} documents considered, {} skipped, {} comparisons",
        format!("{:.2}s", outcome.stats.scan_duration.as_secs_f64()).green(),
        outcome.stats.documents_considered,
        outcome.stats.documents_skipped,
        outcome.stats.comparisons,
    );

    if outcome.groups.is_empty() {
        println!("No duplicate groups found.");
        return Ok(());
    }

    println!(
        "{} duplicate groups:",
        format!("{}", outcome.groups.len()).red()
    );
    for group in &outcome.groups {
        print_group(group);
    }
    Ok(())
}

fn print_group(group: &DuplicateGroup) {
    match group.similarity_score {
        Some(score) => println!(
            "\n[{}] {} ({} members, mean score {:.1})",
            group.match_type.as_str(),
            group.group_key.cyan(),
            group.members.len(),
            score,
        ),
        None => println!(
            "\n[{}] {} ({} members)",
            group.match_type.as_str(),
            group.group_key.cyan(),
            group.members.len(),
        ),
    }
    for member in &group.members {
        println!("  {} ({} bytes)", member.path, member.size);
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}

/// CLI progress reporter using indicatif.
///
/// - Hash/read phases: progress bar over known document totals
/// - Compare phase: progress bar over candidate pair count
struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn update_bar(&self, template: &str, position: usize, total: usize) {
        let mut guard = self.bar.lock().unwrap();
        let needs_new = match guard.as_ref() {
            Some(pb) => pb.length() != Some(total as u64),
            None => true,
        };
        if needs_new {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            let pb = ProgressBar::new(total as u64);
            if let Ok(style) = ProgressStyle::with_template(template) {
                pb.set_style(style.progress_chars("━╸─"));
            }
            *guard = Some(pb);
        }
        if let Some(pb) = guard.as_ref() {
            pb.set_position(position as u64);
        }
    }

    fn finish_bar(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_hash_progress(&self, processed: usize, total: usize) {
        self.update_bar(
            "  Hashing [{bar:30.cyan/dim}] {pos}/{len} documents",
            processed,
            total,
        );
    }

    fn on_read_progress(&self, processed: usize, total: usize) {
        self.update_bar(
            "  Reading [{bar:30.cyan/dim}] {pos}/{len} documents",
            processed,
            total,
        );
    }

    fn on_compare_progress(&self, compared: usize, total: usize) {
        self.update_bar(
            "  Comparing [{bar:30.cyan/dim}] {pos}/{len} pairs",
            compared,
            total,
        );
    }

    fn on_truncated(&self, kept: usize, total: usize) {
        eprintln!(
            "  \x1b[33m!\x1b[0m Corpus truncated: comparing the largest {} of {} documents",
            kept, total
        );
    }

    fn on_scan_complete(&self, groups: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} duplicate groups in {:.2}s",
            groups, duration_secs
        );
    }
}
