//! Per-run performance metrics
//!
//! Damage and healing are summed per player over the fight (`pull..=end`)
//! and divided by the boss-only time when adds took part of the fight,
//! otherwise by the whole fight. In that case only damage dealt to the boss
//! counts toward a player's row. Group totals are never filtered and are
//! divided by the whole fight.

use std::collections::{BTreeMap, BTreeSet};

use hashbrown::HashMap;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::combat_log::{CombatEvent, EventKind, Name};
use crate::encounter::EncounterCandidate;
use crate::game_data::Calling;
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("encounter lasts {duration_ms} ms, nothing to divide by")]
    ZeroDuration { duration_ms: i64 },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerMetrics {
    pub damage: f64,
    pub healing: f64,
    pub dps: f64,
    pub hps: f64,
    pub class: Calling,
    /// Soul build from the registry's role combos.
    pub role: Option<String>,
}

impl PlayerMetrics {
    pub fn dps_display(&self) -> i64 {
        self.dps.round() as i64
    }

    pub fn hps_display(&self) -> i64 {
        self.hps.round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetrics {
    pub duration_total_s: f64,
    pub duration_boss_only_s: Option<f64>,
    pub per_player: BTreeMap<String, PlayerMetrics>,
    pub group_dps: f64,
    pub group_hps: f64,
    pub total_damage: f64,
    pub total_healing: f64,
}

impl RunMetrics {
    /// Seconds the per-player rates are divided by.
    pub fn rate_duration_s(&self) -> f64 {
        self.duration_boss_only_s.unwrap_or(self.duration_total_s)
    }

    /// Fill in callings that the run itself gave no evidence for.
    pub fn assign_callings(&mut self, votes: &CallingVotes) {
        for (name, player) in self.per_player.iter_mut() {
            if player.class == Calling::Unknown {
                player.class = votes.calling_of(name);
            }
        }
    }
}

/// Compute metrics for one boss attempt.
pub fn aggregate(
    candidate: &EncounterCandidate,
    registry: &Registry,
) -> Result<RunMetrics, AggregationError> {
    let duration_ms = candidate.end_timestamp - candidate.pull_timestamp;
    if duration_ms <= 0 {
        return Err(AggregationError::ZeroDuration { duration_ms });
    }

    let duration_total_s = candidate.duration_total_s();
    let duration_boss_only_s = candidate.duration_boss_only_s();
    let rate_duration = duration_boss_only_s.unwrap_or(duration_total_s);

    // Roster: every player acting anywhere in the attempt
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    let mut votes = CallingVotes::default();
    for event in &candidate.events {
        if event.actor_is_player && !event.actor_name.is_empty() {
            totals.entry(event.actor_name.as_ref()).or_default();
            votes.record(event, registry);
        }
    }

    let boss_only = duration_boss_only_s.is_some();
    let mut total_damage = 0.0;
    let mut total_healing = 0.0;
    let mut spells: HashMap<&str, BTreeSet<Name>> = HashMap::new();
    for event in candidate.fight_events() {
        if !event.actor_is_player {
            continue;
        }
        let Some((damage, healing)) = totals.get_mut(event.actor_name.as_ref()) else {
            continue;
        };
        let amount = event.amount.max(0) as f64;
        match event.kind {
            EventKind::Damage if !event.target_is_player => {
                total_damage += amount;
                if !boss_only || event.targets_boss(&candidate.boss) {
                    *damage += amount;
                }
            }
            EventKind::Heal => {
                total_healing += amount;
                *healing += amount;
            }
            _ => {}
        }
        if registry.has_roles()
            && counts_for_role(event.kind)
            && let Some(key) = registry.spell_key(&event.ability_name)
        {
            spells
                .entry(event.actor_name.as_ref())
                .or_default()
                .insert(key.clone());
        }
    }

    let per_player: BTreeMap<String, PlayerMetrics> = totals
        .into_iter()
        .map(|(name, (damage, healing))| {
            let role = spells
                .get(name)
                .and_then(|seen| registry.role_for(seen))
                .map(|role| role.to_string());
            let metrics = PlayerMetrics {
                damage,
                healing,
                dps: damage / rate_duration,
                hps: healing / rate_duration,
                class: votes.calling_of(name),
                role,
            };
            (name.to_string(), metrics)
        })
        .collect();

    debug!(
        boss = %candidate.boss,
        players = per_player.len(),
        duration_total_s,
        ?duration_boss_only_s,
        "aggregated run"
    );

    Ok(RunMetrics {
        duration_total_s,
        duration_boss_only_s,
        per_player,
        group_dps: total_damage / duration_total_s,
        group_hps: total_healing / duration_total_s,
        total_damage,
        total_healing,
    })
}

/// Events whose ability reveals what the player is specced into.
fn counts_for_role(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Damage | EventKind::Heal | EventKind::BuffApplied | EventKind::BuffRemoved
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Calling Inference
// ─────────────────────────────────────────────────────────────────────────────

/// Per-player tally of calling-specific abilities seen in the log.
#[derive(Debug, Clone, Default)]
pub struct CallingVotes {
    votes: HashMap<Name, [u32; Calling::ALL.len()]>,
}

impl CallingVotes {
    pub fn record(&mut self, event: &CombatEvent, registry: &Registry) {
        if !event.actor_is_player
            || !matches!(
                event.kind,
                EventKind::BuffApplied | EventKind::Damage | EventKind::Heal
            )
        {
            return;
        }
        let Some(calling) = registry.calling_for_ability(&event.ability_name) else {
            return;
        };
        let Some(slot) = Calling::ALL.iter().position(|c| *c == calling) else {
            return;
        };
        let tally = self
            .votes
            .entry(event.actor_name.clone())
            .or_insert([0; Calling::ALL.len()]);
        tally[slot] += 1;
    }

    /// Most evidenced calling; ties and players without evidence are `Unknown`.
    pub fn calling_of(&self, player: &str) -> Calling {
        let Some(tally) = self.votes.get(player) else {
            return Calling::Unknown;
        };
        let best = tally.iter().copied().max().unwrap_or(0);
        if best == 0 || tally.iter().filter(|&&n| n == best).count() > 1 {
            return Calling::Unknown;
        }
        tally
            .iter()
            .position(|&n| n == best)
            .map_or(Calling::Unknown, |i| Calling::ALL[i])
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

/// Pass-through event adapter that tallies calling evidence for the whole log.
pub struct CallingObserver<'r, I> {
    inner: I,
    registry: &'r Registry,
    votes: CallingVotes,
}

impl<'r, I> CallingObserver<'r, I> {
    pub fn new(inner: I, registry: &'r Registry) -> Self {
        Self {
            inner,
            registry,
            votes: CallingVotes::default(),
        }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn votes(&self) -> &CallingVotes {
        &self.votes
    }
}

impl<I> Iterator for CallingObserver<'_, I>
where
    I: Iterator<Item = CombatEvent>,
{
    type Item = CombatEvent;

    fn next(&mut self) -> Option<CombatEvent> {
        let event = self.inner.next()?;
        self.votes.record(&event, self.registry);
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat_log::Tokenizer;
    use crate::encounter::{SegmentConfig, Segmenter};
    use crate::test_support::*;
    use riftlog_types::PipelineConfig;

    fn runs(log: &str) -> (Registry, Vec<EncounterCandidate>) {
        let registry = test_registry();
        let config = PipelineConfig::default();
        let candidates = {
            let tokenizer = Tokenizer::new(log.as_bytes(), &registry, u64::MAX).unwrap();
            Segmenter::new(tokenizer, SegmentConfig::new(&registry, &config)).collect()
        };
        (registry, candidates)
    }

    #[test]
    fn test_dps_over_whole_fight() {
        let mut log = LogBuilder::new();
        for t in 0..=100 {
            log.damage(t as f64, player("Ghreanay"), npc(TITAN), 1000);
            log.damage(t as f64, player("Tissaia"), npc(TITAN), 500);
            log.heal(t as f64, player("Orgrim"), player("Ghreanay"), 200);
        }
        log.slain(100.0, player("Ghreanay"), npc(TITAN));
        let (registry, candidates) = runs(&log.build());

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        assert_eq!(metrics.duration_total_s, 100.0);
        assert_eq!(metrics.duration_boss_only_s, None);
        assert_eq!(metrics.per_player["Ghreanay"].damage, 101_000.0);
        assert_eq!(metrics.per_player["Ghreanay"].dps, 1010.0);
        assert_eq!(metrics.per_player["Tissaia"].dps_display(), 505);
        assert_eq!(metrics.per_player["Orgrim"].hps, 202.0);
        assert_eq!(metrics.per_player["Orgrim"].dps, 0.0);
        assert_eq!(metrics.total_damage, 151_500.0);
        assert_eq!(metrics.group_dps, 1515.0);
        assert_eq!(metrics.group_hps, 202.0);
    }

    #[test]
    fn test_boss_only_duration_is_the_denominator() {
        let mut log = LogBuilder::new();
        for t in 0..=200 {
            for name in &RAID[..3] {
                log.damage(t as f64, player(name), npc(TITAN), 850);
            }
            if (50..=80).contains(&t) {
                log.damage(t as f64, player("Kaelis"), npc("Gobelin"), 400);
            }
        }
        log.slain(200.0, player("Ghreanay"), npc(TITAN));
        let (registry, candidates) = runs(&log.build());

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        assert_eq!(metrics.duration_total_s, 200.0);
        assert_eq!(metrics.duration_boss_only_s, Some(170.0));
        assert_eq!(metrics.rate_duration_s(), 170.0);
        assert_eq!(metrics.per_player["Ghreanay"].dps, 201.0 * 850.0 / 170.0);
        // add damage is left out of the boss-only rows but not the group totals
        assert_eq!(metrics.per_player["Kaelis"].damage, 0.0);
        assert_eq!(metrics.per_player["Kaelis"].dps, 0.0);
        assert_eq!(metrics.total_damage, 3.0 * 201.0 * 850.0 + 31.0 * 400.0);
        assert_eq!(metrics.group_dps, metrics.total_damage / 200.0);
    }

    #[test]
    fn test_split_damage_counts_only_the_boss_share() {
        let mut log = LogBuilder::new();
        for t in 0..=100 {
            log.damage(t as f64, player("Ghreanay"), npc(TITAN), 1000);
            if (20..=40).contains(&t) {
                log.damage(t as f64, player("Tissaia"), npc("Gobelin"), 700);
            } else {
                log.damage(t as f64, player("Tissaia"), npc(TITAN), 300);
            }
        }
        log.slain(100.0, player("Ghreanay"), npc(TITAN));
        let (registry, candidates) = runs(&log.build());

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        let boss_only = metrics.duration_boss_only_s.unwrap();
        assert!(boss_only < metrics.duration_total_s);

        let tissaia = &metrics.per_player["Tissaia"];
        assert_eq!(tissaia.damage, 80.0 * 300.0);
        assert_eq!(tissaia.dps, 80.0 * 300.0 / boss_only);

        let sum: f64 = metrics.per_player.values().map(|p| p.damage).sum();
        assert_eq!(metrics.total_damage, sum + 21.0 * 700.0);
        assert_eq!(metrics.group_dps, metrics.total_damage / 100.0);
    }

    #[test]
    fn test_role_from_exact_combo() {
        let log = LogBuilder::new()
            .damage(0.0, player("Ghreanay"), npc(TITAN), 1000)
            .event(0.0, 3, player("Kaelis"), npc(TITAN), 500, "Tir instantané")
            .event(1.0, 3, player("Kaelis"), npc(TITAN), 500, "Tir calculé")
            .event(2.0, 3, player("Kaelis"), npc(TITAN), 500, "Frappe crépusculaire")
            .damage(10.0, player("Ghreanay"), npc(TITAN), 1000)
            .slain(10.0, player("Ghreanay"), npc(TITAN))
            .build();
        let (registry, candidates) = runs(&log);

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        assert_eq!(metrics.per_player["Kaelis"].role.as_deref(), Some("SpitFire"));
        // "Frappe" maps to no spell key
        assert_eq!(metrics.per_player["Ghreanay"].role, None);
    }

    #[test]
    fn test_role_from_most_specific_combo() {
        let log = LogBuilder::new()
            .damage(0.0, player("Ghreanay"), npc(TITAN), 1000)
            .event(0.0, 3, player("Kaelis"), npc(TITAN), 500, "Tir instantané")
            .event(1.0, 3, player("Kaelis"), npc(TITAN), 500, "Tir calculé")
            .buff(2.0, player("Kaelis"), player("Kaelis"), "Tir de barrage")
            .event(3.0, 3, player("Kaelis"), npc(TITAN), 500, "Frappe crépusculaire")
            .damage(10.0, player("Ghreanay"), npc(TITAN), 1000)
            .slain(10.0, player("Ghreanay"), npc(TITAN))
            .build();
        let (registry, candidates) = runs(&log);

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        // covers Marksman (2) and SpitFire (3), no combo matches exactly
        assert_eq!(metrics.per_player["Kaelis"].role.as_deref(), Some("SpitFire"));
    }

    #[test]
    fn test_role_ignores_spells_before_the_pull() {
        let log = LogBuilder::new()
            .event(0.0, 3, player("Kaelis"), npc(TITAN), 500, "Frappe crépusculaire")
            .damage(20.0, player("Ghreanay"), npc(TITAN), 1000)
            .damage(20.0, player("Tissaia"), npc(TITAN), 1000)
            .event(20.0, 3, player("Kaelis"), npc(TITAN), 500, "Tir instantané")
            .event(21.0, 3, player("Kaelis"), npc(TITAN), 500, "Tir calculé")
            .damage(40.0, player("Ghreanay"), npc(TITAN), 1000)
            .slain(40.0, player("Ghreanay"), npc(TITAN))
            .build();
        let (registry, candidates) = runs(&log);

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        assert_eq!(candidates[0].pull_timestamp, at(20.0));
        assert_eq!(metrics.per_player["Kaelis"].role.as_deref(), Some("Marksman"));
    }

    #[test]
    fn test_negative_amounts_and_friendly_fire_do_not_count() {
        let log = LogBuilder::new()
            .damage(0.0, player("Ghreanay"), npc(TITAN), 1000)
            .damage(5.0, player("Ghreanay"), npc(TITAN), -400)
            .damage(6.0, player("Ghreanay"), player("Tissaia"), 9999)
            .damage(10.0, player("Ghreanay"), npc(TITAN), 1000)
            .slain(10.0, player("Ghreanay"), npc(TITAN))
            .build();
        let (registry, candidates) = runs(&log);

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        assert_eq!(metrics.per_player["Ghreanay"].damage, 2000.0);
        assert_eq!(metrics.per_player["Ghreanay"].dps, 200.0);
    }

    #[test]
    fn test_idle_roster_member_has_zero_rates() {
        let log = LogBuilder::new()
            .damage(0.0, player("Ghreanay"), npc(TITAN), 1000)
            .buff(1.0, player("Tissaia"), player("Tissaia"), "Armure de dévotion")
            .damage(10.0, player("Ghreanay"), npc(TITAN), 1000)
            .slain(10.0, player("Ghreanay"), npc(TITAN))
            .build();
        let (registry, candidates) = runs(&log);

        let metrics = aggregate(&candidates[0], &registry).unwrap();
        let tissaia = &metrics.per_player["Tissaia"];
        assert_eq!(tissaia.dps, 0.0);
        assert_eq!(tissaia.hps, 0.0);
        assert_eq!(tissaia.class, Calling::Cleric);
        assert_eq!(metrics.per_player["Ghreanay"].class, Calling::Unknown);
    }

    #[test]
    fn test_zero_roster_is_empty_not_an_error() {
        let registry = test_registry();
        let mut log = LogBuilder::new();
        log.damage(0.0, player("Ghreanay"), npc(TITAN), 10)
            .damage(20.0, player("Ghreanay"), npc(TITAN), 10)
            .slain(20.0, player("Ghreanay"), npc(TITAN));
        let text = log.build();
        let tokenizer = Tokenizer::new(text.as_bytes(), &registry, u64::MAX).unwrap();
        // strip the player flag so nobody qualifies for the roster
        let events: Vec<CombatEvent> = tokenizer
            .map(|mut e| {
                e.actor_is_player = false;
                e
            })
            .collect();
        let candidate =
            EncounterCandidate::build(TITAN.into(), 0, events, Some(at(20.0)), 5_000);

        let metrics = aggregate(&candidate, &registry).unwrap();
        assert!(metrics.per_player.is_empty());
        assert_eq!(metrics.group_dps, 0.0);
        assert_eq!(metrics.group_hps, 0.0);
    }

    #[test]
    fn test_zero_duration_is_an_error() {
        let log = LogBuilder::new()
            .damage(0.0, player("Ghreanay"), npc(TITAN), 10)
            .slain(0.0, player("Ghreanay"), npc(TITAN))
            .build();
        let (registry, candidates) = runs(&log);

        assert_eq!(
            aggregate(&candidates[0], &registry),
            Err(AggregationError::ZeroDuration { duration_ms: 0 })
        );
    }

    #[test]
    fn test_calling_votes_break_ties_to_unknown() {
        let registry = test_registry();
        let log = LogBuilder::new()
            .buff(0.0, player("Kaelis"), player("Kaelis"), "Posture prête")
            .buff(1.0, player("Kaelis"), player("Kaelis"), "Armure eldritch")
            .buff(2.0, player("Orgrim"), player("Orgrim"), "Armure eldritch")
            .buff(3.0, player("Orgrim"), player("Orgrim"), "Armure eldritch")
            .buff(4.0, player("Orgrim"), player("Orgrim"), "Posture prête")
            .build();
        let mut observer = CallingObserver::new(
            Tokenizer::new(log.as_bytes(), &registry, u64::MAX).unwrap(),
            &registry,
        );
        assert_eq!(observer.by_ref().count(), 5);

        let votes = observer.votes();
        assert_eq!(votes.calling_of("Kaelis"), Calling::Unknown);
        assert_eq!(votes.calling_of("Orgrim"), Calling::Mage);
        assert_eq!(votes.calling_of("Nobody"), Calling::Unknown);
        assert_eq!(observer.inner().stats().event_count, 5);
    }
}
