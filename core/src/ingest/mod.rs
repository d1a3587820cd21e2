//! Upload ingestion
//!
//! Drives one uploaded log through the pipeline: tokenize, segment into boss
//! attempts, judge each attempt, and compute metrics for the ones that pass.
//! A single run's rejection never affects its siblings.

mod error;


use std::sync::atomic::{AtomicBool, Ordering};

use riftlog_types::{DEFAULT_MAX_FILE_SIZE_BYTES, PipelineConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::anticheat::{AntiCheatConfig, AntiCheatEvaluator, AntiCheatVerdict};
use crate::combat_log::{Tokenizer, TokenizerStats, format_clock};
use crate::encounter::{EncounterCandidate, Resolution, SegmentConfig, Segmenter, TimeWindow};
use crate::metrics::{CallingObserver, RunMetrics, aggregate};
use crate::registry::Registry;

pub use error::IngestError;

/// Share of unparseable lines above which an upload is worth a warning.
const SKIPPED_WARN_RATIO: f64 = 0.01;

/// One upload as received from the dashboard.
#[derive(Debug, Clone, Copy)]
pub struct UploadMetadata<'a> {
    pub guild_id: u64,
    pub uploader_account_id: u64,
    pub file_name: &'a str,
    pub bytes: &'a [u8],
    pub max_file_size_bytes: u64,
}

impl<'a> UploadMetadata<'a> {
    pub fn new(guild_id: u64, uploader_account_id: u64, file_name: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            guild_id,
            uploader_account_id,
            file_name,
            bytes,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// Where an attempt sits in the log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub boss: String,
    pub resolution: Resolution,
    pub start_index: usize,
    pub end_index: usize,
    pub event_count: usize,
    pub pull_timestamp: i64,
    pub end_timestamp: i64,
    pub boss_death_timestamp: Option<i64>,
    /// Wall clock of the pull, "HH:MM:SS".
    pub start_time: String,
    pub end_time: String,
    pub boss_only_windows: Vec<TimeWindow>,
}

impl From<&EncounterCandidate> for CandidateSummary {
    fn from(candidate: &EncounterCandidate) -> Self {
        Self {
            boss: candidate.boss.to_string(),
            resolution: candidate.resolution(),
            start_index: candidate.start_index,
            end_index: candidate.end_index,
            event_count: candidate.events.len(),
            pull_timestamp: candidate.pull_timestamp,
            end_timestamp: candidate.end_timestamp,
            boss_death_timestamp: candidate.boss_death_timestamp,
            start_time: format_clock(candidate.pull_timestamp),
            end_time: format_clock(candidate.end_timestamp),
            boss_only_windows: candidate.boss_only_windows.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcceptedRun {
    pub summary: CandidateSummary,
    pub metrics: RunMetrics,
    pub verdict: AntiCheatVerdict,
    /// Kills only; wipes are kept for the guild's history.
    pub leaderboard_eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRun {
    pub summary: CandidateSummary,
    pub verdict: AntiCheatVerdict,
}

/// A run that passed anti-cheat but has no metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DroppedRun {
    pub summary: CandidateSummary,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UploadStats {
    pub total_lines: u64,
    pub skipped_lines: u64,
    pub event_count: u64,
    pub candidate_count: usize,
}

impl UploadStats {
    fn new(tokenizer: TokenizerStats, candidate_count: usize) -> Self {
        Self {
            total_lines: tokenizer.total_lines,
            skipped_lines: tokenizer.skipped_lines,
            event_count: tokenizer.event_count,
            candidate_count,
        }
    }

    pub fn skipped_ratio(&self) -> f64 {
        if self.total_lines == 0 {
            0.0
        } else {
            self.skipped_lines as f64 / self.total_lines as f64
        }
    }
}

/// Outcome of one upload. Identical input gives an identical report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub guild_id: u64,
    pub uploader_account_id: u64,
    pub file_name: String,
    pub accepted: Vec<AcceptedRun>,
    pub rejected: Vec<RejectedRun>,
    pub dropped: Vec<DroppedRun>,
    pub stats: UploadStats,
}

impl UploadReport {
    fn new(meta: &UploadMetadata<'_>) -> Self {
        Self {
            guild_id: meta.guild_id,
            uploader_account_id: meta.uploader_account_id,
            file_name: meta.file_name.to_string(),
            accepted: Vec::new(),
            rejected: Vec::new(),
            dropped: Vec::new(),
            stats: UploadStats::default(),
        }
    }

    pub fn run_count(&self) -> usize {
        self.accepted.len() + self.rejected.len() + self.dropped.len()
    }

    pub fn leaderboard_runs(&self) -> impl Iterator<Item = &AcceptedRun> {
        self.accepted.iter().filter(|run| run.leaderboard_eligible)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingestor
// ─────────────────────────────────────────────────────────────────────────────

/// Processes uploads against one registry and configuration.
pub struct Ingestor<'r> {
    registry: &'r Registry,
    config: &'r PipelineConfig,
}

impl<'r> Ingestor<'r> {
    pub fn new(registry: &'r Registry, config: &'r PipelineConfig) -> Self {
        Self { registry, config }
    }

    pub fn ingest(&self, meta: &UploadMetadata<'_>) -> Result<UploadReport, IngestError> {
        self.run(meta, None)
    }

    /// Like `ingest`, but gives up with `Cancelled` once `cancel` is set.
    pub fn ingest_with_cancel(
        &self,
        meta: &UploadMetadata<'_>,
        cancel: &AtomicBool,
    ) -> Result<UploadReport, IngestError> {
        self.run(meta, Some(cancel))
    }

    fn run(
        &self,
        meta: &UploadMetadata<'_>,
        cancel: Option<&AtomicBool>,
    ) -> Result<UploadReport, IngestError> {
        let is_cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));
        if is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        let limit = meta.max_file_size_bytes.min(self.config.max_file_size_bytes);
        let mut tokenizer = Tokenizer::new(meta.bytes, self.registry, limit).inspect_err(|e| {
            warn!(file = meta.file_name, error = %e, "upload refused");
        })?;
        if let Some(flag) = cancel {
            tokenizer = tokenizer.with_cancel(flag);
        }

        let observer = CallingObserver::new(tokenizer, self.registry);
        let mut segmenter = Segmenter::new(observer, SegmentConfig::new(self.registry, self.config));
        let evaluator = AntiCheatEvaluator::new(self.registry, AntiCheatConfig::from(self.config));

        let mut report = UploadReport::new(meta);
        let mut candidate_count = 0;
        for candidate in segmenter.by_ref() {
            if is_cancelled() {
                break;
            }
            candidate_count += 1;
            self.judge(&candidate, &evaluator, &mut report);
        }
        if is_cancelled() {
            warn!(file = meta.file_name, "upload cancelled");
            return Err(IngestError::Cancelled);
        }

        let votes = segmenter.source().votes();
        for run in &mut report.accepted {
            run.metrics.assign_callings(votes);
        }

        report.stats = UploadStats::new(segmenter.source().inner().stats(), candidate_count);
        if report.stats.skipped_ratio() > SKIPPED_WARN_RATIO {
            warn!(
                file = meta.file_name,
                skipped = report.stats.skipped_lines,
                total = report.stats.total_lines,
                "many unparseable lines"
            );
        }
        info!(
            file = meta.file_name,
            guild_id = meta.guild_id,
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            dropped = report.dropped.len(),
            "upload processed"
        );
        Ok(report)
    }

    fn judge(
        &self,
        candidate: &EncounterCandidate,
        evaluator: &AntiCheatEvaluator<'_>,
        report: &mut UploadReport,
    ) {
        let summary = CandidateSummary::from(candidate);
        let verdict = evaluator.evaluate(candidate);

        if verdict.is_rejected() {
            warn!(
                boss = %candidate.boss,
                start = %summary.start_time,
                reason = ?verdict.reason_code,
                evidence = %verdict.evidence,
                "run rejected"
            );
            report.rejected.push(RejectedRun { summary, verdict });
            return;
        }

        match aggregate(candidate, self.registry) {
            Ok(metrics) => {
                info!(
                    boss = %candidate.boss,
                    start = %summary.start_time,
                    kill = candidate.is_kill(),
                    players = metrics.per_player.len(),
                    group_dps = metrics.group_dps,
                    "run accepted"
                );
                report.accepted.push(AcceptedRun {
                    leaderboard_eligible: candidate.is_kill(),
                    summary,
                    metrics,
                    verdict,
                });
            }
            Err(e) => {
                warn!(boss = %candidate.boss, start = %summary.start_time, error = %e, "run dropped");
                report.dropped.push(DroppedRun {
                    summary,
                    reason: e.to_string(),
                });
            }
        }
    }
}
