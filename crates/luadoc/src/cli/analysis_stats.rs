// cli/analysis_stats.rs - `luadoc analysis-stats` subcommand
//
// Loads a project and reports timing metrics for each analysis phase.
//
// Phases measured:
//   1. scan: discovering Lua files
//   2. parse: parsing all files (in parallel)
//   3. index: building the type declaration index
//   4. resolve: resolving every type name reference

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use crate::config::{load_config_file, AnalysisConfig};
use crate::perf::{peak_rss_bytes, TimingGuard};
use crate::reference::{ClassNameReference, Reference};
use crate::state::{parse_files, scan_directory, ProjectState};
use crate::syntax::NodeKind;

/// Parsed arguments for the `analysis-stats` subcommand.
#[derive(Debug)]
pub struct AnalysisStatsArgs {
    pub path: PathBuf,
    pub csv: bool,
    pub only: Option<String>,
    pub config: Option<PathBuf>,
}

/// Result of running a single analysis phase.
pub struct PhaseResult {
    pub name: String,
    pub duration: Duration,
    pub peak_rss_bytes: Option<u64>,
    pub detail: String,
}

const VALID_PHASES: &[&str] = &["scan", "parse", "index", "resolve"];

/// Parse `analysis-stats` arguments from the remaining CLI args.
///
/// Expected usage: `luadoc analysis-stats <path> [--csv] [--only <phase>] [--config <file>]`
pub fn parse_args(args: &mut impl Iterator<Item = String>) -> Result<AnalysisStatsArgs, String> {
    let mut path: Option<PathBuf> = None;
    let mut csv = false;
    let mut only: Option<String> = None;
    let mut config: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--csv" => csv = true,
            "--only" => {
                let phase = args
                    .next()
                    .ok_or_else(|| "--only requires a phase name".to_string())?;
                if !VALID_PHASES.contains(&phase.as_str()) {
                    return Err(format!(
                        "Unknown phase '{}'. Valid phases: {}",
                        phase,
                        VALID_PHASES.join(", ")
                    ));
                }
                only = Some(phase);
            }
            "--config" => {
                let file = args
                    .next()
                    .ok_or_else(|| "--config requires a file path".to_string())?;
                config = Some(PathBuf::from(file));
            }
            other if other.starts_with('-') => {
                return Err(format!("Unknown flag: '{}'", other));
            }
            _ => {
                if path.is_some() {
                    return Err("Multiple paths provided; expected exactly one".to_string());
                }
                path = Some(PathBuf::from(arg));
            }
        }
    }

    let path = path.ok_or_else(|| "Missing required <path> argument".to_string())?;
    if !path.exists() {
        return Err(format!("Path does not exist: {}", path.display()));
    }

    Ok(AnalysisStatsArgs {
        path,
        csv,
        only,
        config,
    })
}

pub fn load_config(config: Option<&Path>) -> Result<AnalysisConfig> {
    match config {
        Some(path) => load_config_file(path),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Phases slower than this are reported when `LUADOC_PERF=verbose`.
const SLOW_PHASE_MS: u64 = 1000;

/// Run the analysis-stats command and return phase results.
pub fn run_analysis_stats(args: &AnalysisStatsArgs) -> Result<Vec<PhaseResult>> {
    let config = load_config(args.config.as_deref())?;
    let mut results = Vec::new();

    let should_run = |phase: &str| -> bool { args.only.as_ref().map_or(true, |only| only == phase) };

    // Phase 1: Scan
    let guard = TimingGuard::with_threshold("analysis-stats:scan", SLOW_PHASE_MS);
    let files = scan_directory(&args.path, &config)?;
    let duration = guard.elapsed();
    drop(guard);
    if should_run("scan") {
        results.push(PhaseResult {
            name: "scan".to_string(),
            duration,
            peak_rss_bytes: peak_rss_bytes(),
            detail: format!("{} files", files.len()),
        });
    }

    // Phase 2: Parse
    let file_count = files.len();
    let guard = TimingGuard::with_threshold("analysis-stats:parse", SLOW_PHASE_MS);
    let parsed = parse_files(files);
    let duration = guard.elapsed();
    drop(guard);
    if should_run("parse") {
        let nodes: usize = parsed.iter().map(|(_, tree)| tree.node_count()).sum();
        results.push(PhaseResult {
            name: "parse".to_string(),
            duration,
            peak_rss_bytes: peak_rss_bytes(),
            detail: format!("{} files parsed, {} nodes", file_count, nodes),
        });
    }

    // Phase 3: Index
    let guard = TimingGuard::with_threshold("analysis-stats:index", SLOW_PHASE_MS);
    let mut state = ProjectState::new(config);
    for (url, tree) in parsed {
        state.insert_tree(url, tree);
    }
    let duration = guard.elapsed();
    drop(guard);
    if should_run("index") {
        results.push(PhaseResult {
            name: "index".to_string(),
            duration,
            peak_rss_bytes: peak_rss_bytes(),
            detail: format!(
                "{} files indexed, {} type names",
                state.index.indexed_files(),
                state.index.len()
            ),
        });
    }

    // Phase 4: Resolve
    if should_run("resolve") {
        let guard = TimingGuard::with_threshold("analysis-stats:resolve", SLOW_PHASE_MS);
        let (total, unresolved) = resolve_all(&state);
        results.push(PhaseResult {
            name: "resolve".to_string(),
            duration: guard.elapsed(),
            peak_rss_bytes: peak_rss_bytes(),
            detail: format!("{} references, {} unresolved", total, unresolved),
        });
    }

    Ok(results)
}

/// Resolve every type name reference; returns (total, unresolved).
fn resolve_all(state: &ProjectState) -> (usize, usize) {
    let cx = state.cx();
    let mut total = 0;
    let mut unresolved = 0;
    for file in state.workspace.files() {
        let Some(tree) = state.workspace.tree(file) else {
            continue;
        };
        for node in tree.descendants_of_kind(tree.root(), NodeKind::ClassNameRef) {
            let Some(reference) = state
                .workspace
                .node_ref(file, node)
                .and_then(|r| ClassNameReference::new(&state.workspace, r))
            else {
                continue;
            };
            total += 1;
            if reference.resolve(cx).is_none() {
                unresolved += 1;
            }
        }
    }
    (total, unresolved)
}

/// Print phase results in human-readable format.
pub fn print_results(results: &[PhaseResult]) {
    println!("=== luadoc Analysis Stats ===\n");
    for result in results {
        let rss_str = match result.peak_rss_bytes {
            Some(bytes) => format_bytes(bytes),
            None => "N/A".to_string(),
        };
        println!(
            "  {:<12} {:>10.2?}   RSS: {:<10}  ({})",
            result.name, result.duration, rss_str, result.detail
        );
    }

    if results.len() > 1 {
        let total: Duration = results.iter().map(|r| r.duration).sum();
        println!("\n  {:<12} {:>10.2?}", "TOTAL", total);
    }
    println!();
}

/// Print phase results in CSV format.
pub fn print_results_csv(results: &[PhaseResult]) {
    println!("phase,duration_ms,peak_rss_bytes,detail");
    for result in results {
        println!("{}", csv_row(result));
    }
}

fn csv_row(result: &PhaseResult) -> String {
    let rss = result.peak_rss_bytes.map_or(String::new(), |b| b.to_string());
    format!(
        "{},{:.3},{},\"{}\"",
        result.name,
        result.duration.as_secs_f64() * 1000.0,
        rss,
        result.detail.replace('"', "\"\"")
    )
}

/// Format a byte count as a human-readable string (e.g., "12.3 MB").
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
