use serde::Serialize;
use std::sync::Arc;

/// Shared, immutable name (actor, target, ability).
pub type Name = Arc<str>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum EventKind {
    Damage,
    Heal,
    BuffApplied,
    BuffRemoved,
    Death,
    ZoneChange,
    #[default]
    Other,
}

impl EventKind {
    /// Damage and heal events keep a fight alive.
    pub const fn is_combat_activity(&self) -> bool {
        matches!(self, EventKind::Damage | EventKind::Heal)
    }
}

#[derive(Debug, Clone)]
pub struct CombatEvent {
    pub line_number: u64,
    /// Milliseconds since the midnight preceding the first line of the log.
    pub timestamp: i64,
    pub code: u16,
    pub kind: EventKind,
    pub actor_name: Name,
    pub actor_is_player: bool,
    pub target_name: Name,
    pub target_is_player: bool,
    pub target_is_boss: bool,
    /// Registry key of the raid boss the target belongs to.
    pub target_boss: Option<Name>,
    pub ability_name: Name,
    pub amount: i64,
    /// Only set on boss health annotation lines.
    pub health_pct: Option<f64>,
}

impl CombatEvent {
    pub fn is_player_activity(&self) -> bool {
        self.kind.is_combat_activity() && (self.actor_is_player || self.target_is_player)
    }

    /// True if the event's target is the given raid boss.
    pub fn targets_boss(&self, boss: &str) -> bool {
        self.target_boss.as_deref() == Some(boss)
    }
}
