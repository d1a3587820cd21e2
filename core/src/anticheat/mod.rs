//! Anti-cheat heuristics
//!
//! Each heuristic looks at one finished boss attempt and may produce a
//! finding. Findings of a rejecting kind reject the run; the others only
//! flag it for moderator review. Verdicts are data, never errors.

mod evaluator;


use riftlog_types::PipelineConfig;
use serde::Serialize;

use crate::encounter::secs_to_ms;

pub use evaluator::AntiCheatEvaluator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    TimestampAnomaly,
    NinjaPull,
    BuffStackAbuse,
    MechanicSkip,
}

impl ReasonCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::TimestampAnomaly => "TIMESTAMP_ANOMALY",
            ReasonCode::NinjaPull => "NINJA_PULL",
            ReasonCode::BuffStackAbuse => "BUFF_STACK_ABUSE",
            ReasonCode::MechanicSkip => "MECHANIC_SKIP",
        }
    }

    /// What a hit of this kind does to the run.
    pub const fn severity(&self) -> VerdictStatus {
        match self {
            ReasonCode::MechanicSkip => VerdictStatus::Flag,
            _ => VerdictStatus::Reject,
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Accept,
    Flag,
    Reject,
}

/// One heuristic hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub reason: ReasonCode,
    pub evidence: String,
    /// Log line the evidence points at, when there is one.
    pub line_number: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AntiCheatVerdict {
    pub status: VerdictStatus,
    /// Primary reason; `None` when accepted.
    pub reason_code: Option<ReasonCode>,
    pub evidence: String,
    /// Every hit, in evaluation order.
    pub findings: Vec<Finding>,
}

impl AntiCheatVerdict {
    pub fn accept() -> Self {
        Self {
            status: VerdictStatus::Accept,
            reason_code: None,
            evidence: String::new(),
            findings: Vec::new(),
        }
    }

    /// Findings must be in evaluation order: the first rejecting one is the
    /// primary reason, else the first flag.
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let primary = findings
            .iter()
            .find(|f| f.reason.severity() == VerdictStatus::Reject)
            .or_else(|| findings.first());

        match primary {
            None => Self::accept(),
            Some(primary) => Self {
                status: primary.reason.severity(),
                reason_code: Some(primary.reason),
                evidence: primary.evidence.clone(),
                findings,
            },
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.status == VerdictStatus::Reject
    }

    pub fn is_flagged(&self) -> bool {
        self.status == VerdictStatus::Flag
    }
}

/// Heuristic thresholds in log milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiCheatConfig {
    pub combat_timeout_ms: i64,
    pub ninja_pull_threshold_ms: i64,
    pub ninja_pull_min_events: u32,
}

impl Default for AntiCheatConfig {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

impl From<&PipelineConfig> for AntiCheatConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            combat_timeout_ms: secs_to_ms(config.combat_timeout_s),
            ninja_pull_threshold_ms: secs_to_ms(config.ninja_pull_threshold_s),
            ninja_pull_min_events: config.ninja_pull_min_events.max(1),
        }
    }
}
