use hashbrown::HashMap;
use tracing::debug;

use crate::combat_log::{CombatEvent, EventKind, Name, format_clock};
use crate::encounter::EncounterCandidate;
use crate::registry::{Registry, normalize_key};

use super::{AntiCheatConfig, AntiCheatVerdict, Finding, ReasonCode};

/// Runs every heuristic against a finished attempt.
///
/// Stateless between calls; one evaluator can judge every run of an upload.
pub struct AntiCheatEvaluator<'r> {
    registry: &'r Registry,
    config: AntiCheatConfig,
}

impl<'r> AntiCheatEvaluator<'r> {
    pub fn new(registry: &'r Registry, config: AntiCheatConfig) -> Self {
        Self { registry, config }
    }

    pub fn evaluate(&self, candidate: &EncounterCandidate) -> AntiCheatVerdict {
        let findings: Vec<Finding> = [
            self.timestamp_anomaly(candidate),
            self.ninja_pull(candidate),
            self.buff_stack_abuse(candidate),
            self.mechanic_skip(candidate),
        ]
        .into_iter()
        .flatten()
        .collect();

        for finding in &findings {
            debug!(
                boss = %candidate.boss,
                reason = %finding.reason,
                line = ?finding.line_number,
                "anti-cheat finding"
            );
        }
        AntiCheatVerdict::from_findings(findings)
    }

    /// Time running backwards, or a hole longer than a combat timeout.
    fn timestamp_anomaly(&self, candidate: &EncounterCandidate) -> Option<Finding> {
        candidate.events.windows(2).find_map(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            let delta = next.timestamp - prev.timestamp;
            let evidence = if delta < 0 {
                format!(
                    "time goes back {} ms from {} to {}",
                    -delta,
                    format_clock(prev.timestamp),
                    format_clock(next.timestamp)
                )
            } else if delta > self.config.combat_timeout_ms {
                format!(
                    "{} ms without events between {} and {}",
                    delta,
                    format_clock(prev.timestamp),
                    format_clock(next.timestamp)
                )
            } else {
                return None;
            };
            Some(Finding {
                reason: ReasonCode::TimestampAnomaly,
                evidence,
                line_number: Some(next.line_number),
            })
        })
    }

    /// Players hitting the boss well before the raid-wide pull.
    fn ninja_pull(&self, candidate: &EncounterCandidate) -> Option<Finding> {
        let cutoff = candidate.pull_timestamp - self.config.ninja_pull_threshold_ms;
        let early: Vec<&CombatEvent> = candidate
            .events
            .iter()
            .filter(|e| {
                e.actor_is_player
                    && matches!(e.kind, EventKind::Damage | EventKind::Heal)
                    && e.targets_boss(&candidate.boss)
                    && e.timestamp < cutoff
            })
            .collect();

        if early.len() < self.config.ninja_pull_min_events as usize {
            return None;
        }
        let first = early.iter().min_by_key(|e| e.timestamp)?;
        Some(Finding {
            reason: ReasonCode::NinjaPull,
            evidence: format!(
                "{} hit {} {:.1} s before the pull at {} ({} early hits)",
                first.actor_name,
                candidate.boss,
                (candidate.pull_timestamp - first.timestamp) as f64 / 1000.0,
                format_clock(candidate.pull_timestamp),
                early.len()
            ),
            line_number: Some(first.line_number),
        })
    }

    /// A non-stacking buff active more times on one target than allowed.
    fn buff_stack_abuse(&self, candidate: &EncounterCandidate) -> Option<Finding> {
        if !self.registry.has_buff_limits() {
            return None;
        }

        let mut active: HashMap<(Name, Name), u32> = HashMap::new();
        for event in &candidate.events {
            let applied = match event.kind {
                EventKind::BuffApplied => true,
                EventKind::BuffRemoved => false,
                _ => continue,
            };
            let Some(limit) = self.registry.buff_limit(&event.ability_name) else {
                continue;
            };
            let key = (event.target_name.clone(), event.ability_name.clone());
            let count = active.entry(key).or_insert(0);
            if !applied {
                *count = count.saturating_sub(1);
                continue;
            }
            *count += 1;
            if *count > limit {
                return Some(Finding {
                    reason: ReasonCode::BuffStackAbuse,
                    evidence: format!(
                        "{} has {} stacks of {} at {} (limit {})",
                        event.target_name,
                        count,
                        event.ability_name,
                        format_clock(event.timestamp),
                        limit
                    ),
                    line_number: Some(event.line_number),
                });
            }
        }
        None
    }

    /// Boss health crossing a mechanic threshold without the invulnerability
    /// that should come with it.
    fn mechanic_skip(&self, candidate: &EncounterCandidate) -> Option<Finding> {
        let rule = self.registry.boss(&candidate.boss)?.mechanic.as_ref()?;
        let invulnerability = normalize_key(&rule.invulnerability_ability);
        let period_ms = (rule.period_s * 1000.0).round() as i64;

        let samples: Vec<(i64, f64)> = candidate
            .events
            .iter()
            .filter(|e| e.targets_boss(&candidate.boss))
            .filter_map(|e| e.health_pct.map(|pct| (e.timestamp, pct)))
            .collect();

        for pair in samples.windows(2) {
            let ((before_ts, before_pct), (after_ts, after_pct)) = (pair[0], pair[1]);
            if !(before_pct > rule.trigger_percent && after_pct <= rule.trigger_percent) {
                continue;
            }
            let deadline = after_ts + period_ms;
            let seen = candidate.events.iter().any(|e| {
                e.targets_boss(&candidate.boss)
                    && e.timestamp >= before_ts
                    && e.timestamp <= deadline
                    && normalize_key(&e.ability_name) == invulnerability
            });
            if !seen {
                return Some(Finding {
                    reason: ReasonCode::MechanicSkip,
                    evidence: format!(
                        "{} fell from {:.1}% to {:.1}% at {} without {}",
                        candidate.boss,
                        before_pct,
                        after_pct,
                        format_clock(after_ts),
                        rule.invulnerability_ability
                    ),
                    line_number: None,
                });
            }
        }
        None
    }
}
