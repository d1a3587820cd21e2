//! Combat state machine for boss attempt segmentation.
//!
//! - Idle: waiting for a player to start fighting
//! - InCombat: trash combat, waiting for a raid boss to be targeted
//! - BossEngaged: buffering the attempt until a kill or a timeout
//! - Resolved: an attempt was just emitted; behaves like Idle
//!
//! `transition` is pure: the state, the next event and the configuration in,
//! the next state and possibly a finished candidate out.

use riftlog_types::PipelineConfig;
use tracing::debug;

use crate::combat_log::{CombatEvent, EventKind, Name};
use crate::game_data::event_code;
use crate::registry::Registry;

use super::EncounterCandidate;

/// Segmentation thresholds in log milliseconds, plus the boss registry.
#[derive(Debug, Clone, Copy)]
pub struct SegmentConfig<'r> {
    pub registry: &'r Registry,
    pub combat_timeout_ms: i64,
    pub add_window_ms: i64,
    pub confirm_death_after_ms: i64,
}

impl<'r> SegmentConfig<'r> {
    pub fn new(registry: &'r Registry, config: &PipelineConfig) -> Self {
        Self {
            registry,
            combat_timeout_ms: secs_to_ms(config.combat_timeout_s),
            add_window_ms: secs_to_ms(config.add_window_s),
            confirm_death_after_ms: secs_to_ms(config.confirm_death_after_s),
        }
    }
}

pub(crate) fn secs_to_ms(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}

#[derive(Debug, Default)]
pub enum CombatState {
    #[default]
    Idle,
    InCombat {
        last_activity: i64,
    },
    BossEngaged(Box<Engagement>),
    Resolved,
}

/// An attempt in progress.
#[derive(Debug)]
pub struct Engagement {
    boss: Name,
    start_index: usize,
    events: Vec<CombatEvent>,
    last_activity: i64,
    /// Number of buffered events up to the last qualifying one.
    active_len: usize,
    /// Council bosses: which members are down.
    members_dead: Vec<bool>,
    pending_death: Option<PendingDeath>,
}

/// A "died" line on the boss that still has to stick.
#[derive(Debug, Clone, Copy)]
struct PendingDeath {
    timestamp: i64,
    kept_len: usize,
    member: Option<usize>,
}

impl Engagement {
    fn new(boss: Name, start_index: usize, last_activity: i64, config: &SegmentConfig<'_>) -> Self {
        let members = config
            .registry
            .boss(&boss)
            .map_or(0, |def| def.member_count());
        Self {
            boss,
            start_index,
            events: Vec::new(),
            last_activity,
            active_len: 0,
            members_dead: vec![false; members],
            pending_death: None,
        }
    }

    fn mentions_boss(&self, event: &CombatEvent, config: &SegmentConfig<'_>) -> bool {
        if event.targets_boss(&self.boss) {
            return true;
        }
        !event.actor_is_player
            && config
                .registry
                .boss(&self.boss)
                .is_some_and(|def| def.matches(&event.actor_name))
    }

    /// Record a boss death: whether every member is now down, and which member died.
    fn mark_dead(&mut self, event: &CombatEvent, config: &SegmentConfig<'_>) -> (bool, Option<usize>) {
        if self.members_dead.is_empty() {
            return (true, None);
        }
        let member = config
            .registry
            .boss(&self.boss)
            .and_then(|def| def.member_index(&event.target_name));
        match member {
            Some(idx) => {
                self.members_dead[idx] = true;
                (self.members_dead.iter().all(|dead| *dead), Some(idx))
            }
            None => (true, None),
        }
    }

    fn into_kill(mut self, death_ts: i64, keep: usize, config: &SegmentConfig<'_>) -> EncounterCandidate {
        self.events.truncate(keep);
        debug!(
            boss = %self.boss,
            start_index = self.start_index,
            events = self.events.len(),
            "boss killed"
        );
        EncounterCandidate::build(
            self.boss,
            self.start_index,
            self.events,
            Some(death_ts),
            config.add_window_ms,
        )
    }

    /// End the attempt: a kill if a boss death is still pending, else a wipe.
    fn close(self, config: &SegmentConfig<'_>) -> EncounterCandidate {
        match self.pending_death {
            Some(pending) => self.into_kill(pending.timestamp, pending.kept_len, config),
            None => self.into_wipe(config),
        }
    }

    fn into_wipe(mut self, config: &SegmentConfig<'_>) -> EncounterCandidate {
        self.events.truncate(self.active_len.max(1));
        debug!(
            boss = %self.boss,
            start_index = self.start_index,
            events = self.events.len(),
            "boss attempt ended without a kill"
        );
        EncounterCandidate::build(
            self.boss,
            self.start_index,
            self.events,
            None,
            config.add_window_ms,
        )
    }
}

/// Advance the state machine by one event.
///
/// `ordinal` is the event's position in the log's event stream.
pub fn transition(
    state: CombatState,
    ordinal: usize,
    event: CombatEvent,
    config: &SegmentConfig<'_>,
) -> (CombatState, Option<EncounterCandidate>) {
    match state {
        CombatState::Idle | CombatState::Resolved => from_idle(ordinal, event, config),
        CombatState::InCombat { last_activity } => in_combat(last_activity, ordinal, event, config),
        CombatState::BossEngaged(engagement) => boss_engaged(*engagement, ordinal, event, config),
    }
}

/// Close whatever is open at end of stream.
pub fn finish(state: CombatState, config: &SegmentConfig<'_>) -> Option<EncounterCandidate> {
    match state {
        CombatState::BossEngaged(engagement) => Some(engagement.close(config)),
        _ => None,
    }
}

fn from_idle(
    ordinal: usize,
    event: CombatEvent,
    config: &SegmentConfig<'_>,
) -> (CombatState, Option<EncounterCandidate>) {
    if event.kind.is_combat_activity() && event.actor_is_player {
        debug!(line = event.line_number, "combat started");
        return in_combat(event.timestamp, ordinal, event, config);
    }
    (CombatState::Idle, None)
}

fn in_combat(
    last_activity: i64,
    ordinal: usize,
    event: CombatEvent,
    config: &SegmentConfig<'_>,
) -> (CombatState, Option<EncounterCandidate>) {
    if event.timestamp - last_activity > config.combat_timeout_ms {
        debug!(line = event.line_number, "trash combat timed out");
        return from_idle(ordinal, event, config);
    }

    if event.target_is_boss
        && let Some(boss) = event.target_boss.clone()
    {
        debug!(boss = %boss, line = event.line_number, "boss engaged");
        let engagement = Engagement::new(boss, ordinal, last_activity, config);
        return boss_engaged(engagement, ordinal, event, config);
    }

    let last_activity = if event.is_player_activity() {
        last_activity.max(event.timestamp)
    } else {
        last_activity
    };
    (CombatState::InCombat { last_activity }, None)
}

fn boss_engaged(
    mut engagement: Engagement,
    ordinal: usize,
    event: CombatEvent,
    config: &SegmentConfig<'_>,
) -> (CombatState, Option<EncounterCandidate>) {
    let ts = event.timestamp;
    let timed_out = ts - engagement.last_activity > config.combat_timeout_ms;
    let death_confirmed = engagement
        .pending_death
        .is_some_and(|pending| ts - pending.timestamp >= config.confirm_death_after_ms);

    // on timeout a pending death still resolves as a kill
    if timed_out || death_confirmed {
        let candidate = engagement.close(config);
        // an event that starts combat is a damage/heal and cannot resolve a boss
        let (next, _) = from_idle(ordinal, event, config);
        return (next, Some(candidate));
    }

    if let Some(pending) = engagement.pending_death
        && engagement.mentions_boss(&event, config)
    {
        debug!(boss = %engagement.boss, line = event.line_number, "boss death was not final");
        if let Some(idx) = pending.member {
            engagement.members_dead[idx] = false;
        }
        engagement.pending_death = None;
    }

    let is_activity = event.is_player_activity();
    let death = (event.kind == EventKind::Death && event.targets_boss(&engagement.boss))
        .then(|| engagement.mark_dead(&event, config));
    let code = event.code;

    engagement.events.push(event);
    if is_activity || engagement.active_len == 0 {
        engagement.active_len = engagement.events.len();
    }
    if is_activity {
        // spliced lines from the past must not rewind the timeout clock
        engagement.last_activity = engagement.last_activity.max(ts);
    }

    if let Some((true, member)) = death {
        let keep = engagement.events.len();
        if code == event_code::DIED {
            debug!(boss = %engagement.boss, "boss died, waiting for confirmation");
            engagement.pending_death = Some(PendingDeath {
                timestamp: ts,
                kept_len: keep,
                member,
            });
        } else {
            return (
                CombatState::Resolved,
                Some(engagement.into_kill(ts, keep, config)),
            );
        }
    }

    (CombatState::BossEngaged(Box::new(engagement)), None)
}
