use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use crossbeam_channel::bounded;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use nodesweep::archiver::{compress_targets, ArchiveOptions, ArchiveProgress};
use nodesweep::cancel::CancelToken;
use nodesweep::deleter::{delete_targets, Progress};
use nodesweep::scanner::{scan_stream, ResultItem, ScanOptions, DEFAULT_TARGET_NAME};
use nodesweep::targets::{parse_targets_str, Target};
use nodesweep::tui;
use nodesweep::util::human_bytes;

#[derive(Parser)]
#[command(
    name = "nodesweep",
    about = "Find, measure, delete and archive node_modules directories",
    version
)]
struct Cli {
    /// Root path to scan
    #[arg(short = 'p', long = "path", default_value = ".")]
    path: PathBuf,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Do not prompt for confirmation in non-interactive delete/compress mode
    #[arg(long)]
    yes: bool,

    /// Delete targets from a JSON file (array of paths or {path,size} objects)
    #[arg(long, value_name = "FILE")]
    delete_json: Option<PathBuf>,

    /// Read delete targets JSON from stdin
    #[arg(long)]
    delete_stdin: bool,

    /// Compress targets from a JSON file (same shapes as --delete-json)
    #[arg(long, value_name = "FILE")]
    compress_json: Option<PathBuf>,

    /// Read compress targets JSON from stdin
    #[arg(long)]
    compress_stdin: bool,

    /// Output directory for archives (default: alongside each source)
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Delete the original directory after a verified archive
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    delete_after: bool,

    /// Worker threads for measurement/deletion/archival (0 = all cores)
    #[arg(short = 'c', long, default_value_t = 0)]
    concurrency: usize,

    /// Max depth for the directory walk (-1 for unlimited)
    #[arg(short = 'm', long, default_value_t = -1, allow_negative_numbers = true)]
    max_depth: i64,

    /// Run the batch scan instead of the interactive TUI
    #[arg(long)]
    no_tui: bool,

    /// Do not delete anything; simulate deletion
    #[arg(short = 'd', long)]
    dry_run: bool,

    /// Glob pattern to exclude (repeatable). Matches full path or basename.
    #[arg(short = 'x', long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Follow symlinked directories when computing sizes (pnpm-style)
    #[arg(short = 'L', long)]
    follow_symlinks: bool,

    /// Directory basename to search for
    #[arg(long, default_value = DEFAULT_TARGET_NAME)]
    name: String,
}

impl Cli {
    fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            workers: self.concurrency,
            max_depth: usize::try_from(self.max_depth).ok(),
            follow_symlinks: self.follow_symlinks,
            excludes: self.exclude.clone(),
            target_name: self.name.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.delete_json.is_some() || cli.delete_stdin {
        exit(run_delete(&cli));
    }
    if cli.compress_json.is_some() || cli.compress_stdin {
        exit(run_compress(&cli));
    }

    let root = match fs::canonicalize(&cli.path) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("failed to resolve path {}: {}", cli.path.display(), e);
            exit(2);
        }
    };

    if !cli.no_tui {
        if let Err(e) = tui::run(&root, cli.scan_options(), cli.dry_run) {
            eprintln!("tui error: {:#}", e);
            exit(1);
        }
        return;
    }

    exit(run_scan(&cli, &root));
}

/// Load the target list for a non-interactive destructive run. `--yes` is
/// the safety latch for both.
fn load_targets(cli: &Cli, file: Option<&Path>, kind: &str) -> Result<Vec<Target>> {
    if !cli.yes {
        anyhow::bail!("--yes is required for non-interactive {}. Aborting.", kind);
    }
    let input = match file {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to open {} file {}", kind, path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    parse_targets_str(&input).with_context(|| format!("invalid {} targets JSON", kind))
}

fn run_delete(cli: &Cli) -> i32 {
    let targets = match load_targets(cli, cli.delete_json.as_deref(), "deletion") {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("{:#}", e);
            return 2;
        }
    };

    let cancel = CancelToken::new();
    let workers = cli.scan_options().effective_workers();
    let summary = if cli.json {
        delete_targets(&targets, workers, None, cli.dry_run, &cancel)
    } else {
        let bar = operation_bar(targets.len(), "deleting");
        let (tx, rx) = bounded::<Progress>(64);
        let reporter = {
            let bar = bar.clone();
            thread::spawn(move || {
                for p in rx.iter() {
                    bar.set_position(p.completed as u64);
                    bar.set_message(p.path.display().to_string());
                }
            })
        };
        let summary = delete_targets(&targets, workers, Some(tx), cli.dry_run, &cancel);
        let _ = reporter.join();
        bar.finish_and_clear();
        summary
    };

    if cli.json {
        print_json(&summary);
    } else {
        println!(
            "Deleted: {}  Failed: {}  Freed: {}",
            summary.successes.len().to_string().green(),
            summary.failures.len().to_string().red(),
            human_bytes(summary.freed).cyan()
        );
        print_failures(&summary.failures);
    }
    i32::from(!summary.failures.is_empty())
}

fn run_compress(cli: &Cli) -> i32 {
    let targets = match load_targets(cli, cli.compress_json.as_deref(), "compression") {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("{:#}", e);
            return 2;
        }
    };

    let cancel = CancelToken::new();
    let opts = ArchiveOptions {
        out_dir: cli.out_dir.clone(),
        workers: cli.scan_options().effective_workers(),
        delete_after: cli.delete_after,
    };
    let summary = if cli.json {
        compress_targets(&targets, &opts, None, &cancel)
    } else {
        let bar = operation_bar(targets.len(), "compressing");
        let (tx, rx) = bounded::<ArchiveProgress>(64);
        let reporter = {
            let bar = bar.clone();
            thread::spawn(move || {
                for p in rx.iter() {
                    bar.set_position(p.completed as u64);
                    bar.set_message(format!(
                        "{} ({})",
                        p.path.display(),
                        human_bytes(p.bytes_written)
                    ));
                }
            })
        };
        let summary = compress_targets(&targets, &opts, Some(tx), &cancel);
        let _ = reporter.join();
        bar.finish_and_clear();
        summary
    };

    if cli.json {
        print_json(&summary);
    } else {
        println!(
            "Compressed: {}  Failed: {}  Written: {}",
            summary.successes.len().to_string().green(),
            summary.failures.len().to_string().red(),
            human_bytes(summary.written).cyan()
        );
        print_failures(&summary.failures);
    }
    i32::from(!summary.failures.is_empty())
}

/// Batch scan output, stable field names for scripted consumption.
#[derive(Serialize)]
struct ScanReport<'a> {
    root: &'a Path,
    #[serde(rename = "totalSize")]
    total_size: u64,
    results: Vec<ResultItem>,
    duration: String,
}

fn run_scan(cli: &Cli, root: &Path) -> i32 {
    let opts = cli.scan_options();
    let cancel = CancelToken::new();
    let start = Instant::now();

    // Stream so the spinner can show live discovery; the table still waits
    // for the full set.
    let (items_rx, err_rx) = scan_stream(root, &opts, &cancel);
    let spinner = if cli.json { None } else { Some(scan_spinner()) };
    let mut results: Vec<ResultItem> = Vec::new();
    let mut total_size = 0u64;
    for item in items_rx.iter() {
        if item.error.is_none() {
            total_size += item.size;
        }
        results.push(item);
        if let Some(bar) = &spinner {
            bar.set_message(format!(
                "found {}  total {}",
                results.len(),
                human_bytes(total_size)
            ));
            bar.tick();
        }
    }
    let scan_err = err_rx.recv().unwrap_or(None);
    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }
    if let Some(err) = &scan_err {
        eprintln!("scan completed with errors: {}", err);
    }

    // Completion order is arbitrary; present biggest first.
    results.sort_by(|a, b| b.size.cmp(&a.size));

    if cli.json {
        print_json(&ScanReport {
            root,
            total_size,
            results,
            duration: format!("{:.3?}", start.elapsed()),
        });
    } else {
        println!(
            "{} scan\nroot: {}\nfound: {}",
            "nodesweep".bold(),
            root.display(),
            results.len()
        );
        println!("----------------------------------------------");
        for item in &results {
            match &item.error {
                Some(err) => println!(
                    "{}\t{}\t({} {})",
                    item.path.display(),
                    human_bytes(item.size),
                    "ERROR:".red(),
                    err
                ),
                None => println!("{}\t{}", item.path.display(), human_bytes(item.size)),
            }
        }
        println!("----------------------------------------------");
        println!("Total size: {}", human_bytes(total_size).cyan().bold());
        println!("Duration: {:.3?}", start.elapsed());
    }

    i32::from(scan_err.is_some())
}

fn scan_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} scanning... {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar
}

fn operation_bar(total: usize, verb: &str) -> ProgressBar {
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "[{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} {{msg}}",
                verb
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("failed to write json: {}", e);
            exit(1);
        }
    }
}

fn print_failures(failures: &[nodesweep::deleter::Failure]) {
    if failures.is_empty() {
        return;
    }
    println!("Failures:");
    for f in failures {
        println!(" - {}: {}", f.path.display(), f.error.red());
    }
}
