//! riftlog-parse-worker - Batch ingestion of uploaded combat logs.
//!
//! Runs each file through the ingestion pipeline in parallel and prints one
//! JSON upload report per line on stdout. Logs go to stderr; set
//! `DEBUG_LOGGING=1` (or `RUST_LOG`) for more detail.
//!
//! Usage: riftlog-parse-worker --guild-id <ID> --uploader-id <ID> <FILES>...

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use memmap2::Mmap;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use riftlog_core::context::{AppConfig, AppConfigExt};
use riftlog_core::ingest::{Ingestor, UploadMetadata, UploadReport};
use riftlog_core::registry::Registry;

// ─────────────────────────────────────────────────────────────────────────────
// CLI Arguments
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// One JSON report per line
    #[default]
    Json,
    /// Human-readable run table
    Text,
}

#[derive(Parser, Debug)]
#[command(name = "riftlog-parse-worker")]
#[command(about = "Ingest Rift combat logs into per-run reports")]
#[command(version)]
struct Args {
    /// Combat log files to ingest
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Guild the upload belongs to
    #[arg(long, default_value_t = 0)]
    guild_id: u64,

    /// Account that uploaded the logs
    #[arg(long, default_value_t = 0)]
    uploader_id: u64,

    /// Config file (defaults to the user's riftlog config)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Boss registry TOML (overrides the config)
    #[arg(short, long)]
    registry: Option<PathBuf>,

    /// Refuse files larger than this many bytes
    #[arg(long)]
    max_file_size: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// One line of worker output.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum FileOutput {
    Ok {
        #[serde(flatten)]
        report: UploadReport,
        elapsed_ms: u64,
    },
    Error {
        file_name: String,
        error: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match AppConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load config");
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::load(),
    };
    if let Some(path) = &args.registry {
        config.registry_path = Some(path.clone());
    }
    if let Some(limit) = args.max_file_size {
        config.pipeline.max_file_size_bytes = limit;
    }

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(e) => {
            error!(error = %e, "failed to load boss registry");
            return ExitCode::FAILURE;
        }
    };
    info!(
        bosses = registry.bosses().len(),
        files = args.files.len(),
        "riftlog worker started"
    );

    let outputs: Vec<FileOutput> = args
        .files
        .par_iter()
        .map(|path| ingest_file(path, &args, &registry, &config))
        .collect();

    let mut failed = 0;
    for output in &outputs {
        if matches!(output, FileOutput::Error { .. }) {
            failed += 1;
        }
        match args.format {
            OutputFormat::Json => match serde_json::to_string(output) {
                Ok(json) => println!("{json}"),
                Err(e) => error!(error = %e, "failed to serialize report"),
            },
            OutputFormat::Text => print_text(output),
        }
    }

    if failed > 0 {
        warn!(failed, total = outputs.len(), "some files were not ingested");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging() {
    let directive = if std::env::var("DEBUG_LOGGING").is_ok() {
        "info,riftlog_core=debug,riftlog_parse_worker=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingestion
// ─────────────────────────────────────────────────────────────────────────────

fn ingest_file(path: &Path, args: &Args, registry: &Registry, config: &AppConfig) -> FileOutput {
    let file_name = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let timer = Instant::now();
    match read_and_ingest(path, &file_name, args, registry, config) {
        Ok(report) => FileOutput::Ok {
            report,
            elapsed_ms: timer.elapsed().as_millis() as u64,
        },
        Err(error) => {
            error!(file = %file_name, %error, "ingestion failed");
            FileOutput::Error { file_name, error }
        }
    }
}

fn read_and_ingest(
    path: &Path,
    file_name: &str,
    args: &Args,
    registry: &Registry,
    config: &AppConfig,
) -> Result<UploadReport, String> {
    let file = File::open(path).map_err(|e| format!("failed to open file: {e}"))?;
    let size = file
        .metadata()
        .map_err(|e| format!("failed to stat file: {e}"))?
        .len();

    // Zero-length files cannot be mapped.
    let mmap;
    let bytes: &[u8] = if size == 0 {
        &[]
    } else {
        // Refuse before mapping so a huge file never touches memory.
        let limit = config.pipeline.max_file_size_bytes;
        if size > limit {
            return Err(format!("file is {size} bytes, limit is {limit}"));
        }
        mmap = unsafe { Mmap::map(&file).map_err(|e| format!("failed to mmap: {e}"))? };
        &mmap[..]
    };

    let meta = UploadMetadata {
        max_file_size_bytes: config.pipeline.max_file_size_bytes,
        ..UploadMetadata::new(args.guild_id, args.uploader_id, file_name, bytes)
    };
    Ingestor::new(registry, &config.pipeline)
        .ingest(&meta)
        .map_err(|e| e.to_string())
}

fn print_text(output: &FileOutput) {
    let report = match output {
        FileOutput::Ok { report, elapsed_ms } => {
            println!(
                "{} ({} ms): {} accepted, {} rejected, {} dropped, {}/{} lines skipped",
                report.file_name,
                elapsed_ms,
                report.accepted.len(),
                report.rejected.len(),
                report.dropped.len(),
                report.stats.skipped_lines,
                report.stats.total_lines
            );
            report
        }
        FileOutput::Error { file_name, error } => {
            println!("{file_name}: error: {error}");
            return;
        }
    };

    for run in &report.accepted {
        let summary = &run.summary;
        println!(
            "  {:<24} {:?} {}-{} {:>8.1}s group dps {:>8.0}{}",
            summary.boss,
            summary.resolution,
            summary.start_time,
            summary.end_time,
            run.metrics.rate_duration_s(),
            run.metrics.group_dps,
            if run.verdict.is_flagged() { " [flagged]" } else { "" }
        );
        for (name, player) in &run.metrics.per_player {
            println!(
                "      {:<20} {:<8} {:<12} dps {:>8} hps {:>8}",
                name,
                player.class.as_str(),
                player.role.as_deref().unwrap_or("-"),
                player.dps_display(),
                player.hps_display()
            );
        }
    }
    for run in &report.rejected {
        println!(
            "  {:<24} rejected {}: {}",
            run.summary.boss,
            run.verdict
                .reason_code
                .map(|r| r.as_str())
                .unwrap_or_default(),
            run.verdict.evidence
        );
    }
    for run in &report.dropped {
        println!("  {:<24} dropped: {}", run.summary.boss, run.reason);
    }
}
