use serde::Serialize;

use crate::combat_log::{CombatEvent, EventKind};

/// Half-open `[start, end)` range of log time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn len_ms(&self) -> i64 {
        (self.end - self.start).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Ranges where the raid was hitting something other than `boss`.
///
/// Player damage on a non-player, non-boss target is an add hit. Hits no
/// further apart than `window_ms` merge into `[first_hit, last_hit)`.
pub fn add_active_ranges(events: &[CombatEvent], boss: &str, window_ms: i64) -> Vec<TimeWindow> {
    let mut hits: Vec<i64> = events
        .iter()
        .filter(|e| {
            e.kind == EventKind::Damage
                && e.actor_is_player
                && !e.target_is_player
                && !e.target_name.is_empty()
                && !e.targets_boss(boss)
        })
        .map(|e| e.timestamp)
        .collect();
    hits.sort_unstable();

    let mut ranges = Vec::new();
    let mut current: Option<TimeWindow> = None;
    for ts in hits {
        match current.as_mut() {
            Some(range) if ts - range.end <= window_ms => range.end = ts,
            _ => {
                if let Some(done) = current.take() {
                    ranges.push(done);
                }
                current = Some(TimeWindow::new(ts, ts));
            }
        }
    }
    ranges.extend(current);
    ranges
}

/// `[pull, end)` minus the add ranges, clipped, with empty pieces removed.
pub fn boss_only_windows(pull: i64, end: i64, adds: &[TimeWindow]) -> Vec<TimeWindow> {
    if end <= pull {
        return Vec::new();
    }

    let mut adds: Vec<TimeWindow> = adds.iter().copied().filter(|r| !r.is_empty()).collect();
    adds.sort_unstable_by_key(|r| r.start);

    let mut windows = Vec::new();
    let mut cursor = pull;
    for range in adds {
        let start = range.start.max(pull);
        let stop = range.end.min(end);
        if stop <= start {
            continue;
        }
        if start > cursor {
            windows.push(TimeWindow::new(cursor, start));
        }
        cursor = cursor.max(stop);
    }
    if end > cursor {
        windows.push(TimeWindow::new(cursor, end));
    }
    windows
}
