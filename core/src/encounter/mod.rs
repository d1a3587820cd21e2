//! Encounter segmentation
//!
//! Groups the event stream of one log into boss attempts. The grouping is an
//! explicit state machine (`combat_state`) driven by the `Segmenter`
//! iterator adapter; boss-only windows are derived once an attempt resolves.

mod boss_windows;
mod combat_state;
mod segmenter;


use hashbrown::HashMap;
use serde::Serialize;

use crate::combat_log::{CombatEvent, EventKind, Name};

pub use boss_windows::{TimeWindow, add_active_ranges, boss_only_windows};
pub use combat_state::{CombatState, Engagement, SegmentConfig, finish, transition};
pub(crate) use combat_state::secs_to_ms;
pub use segmenter::Segmenter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Kill,
    Wipe,
}

/// One boss attempt, pull to kill or wipe.
#[derive(Debug, Clone)]
pub struct EncounterCandidate {
    /// Registry key of the engaged boss.
    pub boss: Name,
    /// Ordinal of the first event in the log's event stream.
    pub start_index: usize,
    /// One past the ordinal of the last event.
    pub end_index: usize,
    pub pull_timestamp: i64,
    /// `None` for wipes.
    pub boss_death_timestamp: Option<i64>,
    pub end_timestamp: i64,
    /// Ordered, disjoint and inside `[pull_timestamp, end_timestamp]`.
    pub boss_only_windows: Vec<TimeWindow>,
    pub events: Vec<CombatEvent>,
}

impl EncounterCandidate {
    /// Finalize an attempt from its retained events.
    ///
    /// `events` must be non-empty. For kills `boss_death` is the death
    /// timestamp and also the end of the attempt.
    pub(crate) fn build(
        boss: Name,
        start_index: usize,
        events: Vec<CombatEvent>,
        boss_death: Option<i64>,
        add_window_ms: i64,
    ) -> Self {
        let first_ts = events.first().map_or(0, |e| e.timestamp);
        let last_ts = events.last().map_or(first_ts, |e| e.timestamp);
        let end_timestamp = boss_death.unwrap_or(last_ts);
        let pull_timestamp = pull_baseline(&events, &boss).unwrap_or(first_ts);

        let adds = add_active_ranges(&events, &boss, add_window_ms);
        let boss_only_windows = boss_only_windows(pull_timestamp, end_timestamp, &adds);

        Self {
            end_index: start_index + events.len(),
            boss,
            start_index,
            pull_timestamp,
            boss_death_timestamp: boss_death,
            end_timestamp,
            boss_only_windows,
            events,
        }
    }

    pub fn resolution(&self) -> Resolution {
        if self.boss_death_timestamp.is_some() {
            Resolution::Kill
        } else {
            Resolution::Wipe
        }
    }

    pub fn is_kill(&self) -> bool {
        self.boss_death_timestamp.is_some()
    }

    pub fn duration_total_s(&self) -> f64 {
        (self.end_timestamp - self.pull_timestamp) as f64 / 1000.0
    }

    /// Time with only the boss to hit, when adds took some of the fight
    /// and something is left.
    pub fn duration_boss_only_s(&self) -> Option<f64> {
        let total = self.end_timestamp - self.pull_timestamp;
        let boss_only: i64 = self.boss_only_windows.iter().map(TimeWindow::len_ms).sum();
        (boss_only > 0 && boss_only < total).then(|| boss_only as f64 / 1000.0)
    }

    /// Events counted for metrics: `pull <= timestamp <= end`.
    pub fn fight_events(&self) -> impl Iterator<Item = &CombatEvent> {
        let (pull, end) = (self.pull_timestamp, self.end_timestamp);
        self.events
            .iter()
            .filter(move |e| e.timestamp >= pull && e.timestamp <= end)
    }
}

/// Upper median of each player's first damage/heal on the boss.
///
/// With two players the later opener sets the pull, so a lone early hit
/// can never become the raid-wide baseline.
fn pull_baseline(events: &[CombatEvent], boss: &str) -> Option<i64> {
    let mut first_hits: HashMap<&str, i64> = HashMap::new();
    for event in events {
        if event.actor_is_player
            && matches!(event.kind, EventKind::Damage | EventKind::Heal)
            && event.targets_boss(boss)
        {
            first_hits
                .entry(event.actor_name.as_ref())
                .or_insert(event.timestamp);
        }
    }
    if first_hits.is_empty() {
        return None;
    }
    let mut hits: Vec<i64> = first_hits.into_values().collect();
    hits.sort_unstable();
    Some(hits[hits.len() / 2])
}
