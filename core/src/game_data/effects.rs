use phf::phf_map;

use crate::combat_log::EventKind;

// this is exhaustive for the codes the uploader cares about
pub mod event_code {
    pub const MARKER: u16 = 0;
    pub const DIRECT_DAMAGE: u16 = 3;
    pub const DAMAGE_OVER_TIME: u16 = 4;
    pub const HEAL: u16 = 5;
    pub const BUFF_GAIN: u16 = 6;
    pub const BUFF_FADE: u16 = 7;
    pub const DEBUFF_GAIN: u16 = 8;
    pub const DEBUFF_FADE: u16 = 9;
    pub const SLAIN: u16 = 11;
    pub const DIED: u16 = 12;
    pub const FALL_DAMAGE: u16 = 14;
    pub const CRIT_DAMAGE: u16 = 23;
    pub const CRIT_HEAL: u16 = 28;
    pub const SPLIT_DAMAGE: u16 = 29;
}

/// Event kind lookup indexed by Rift log code.
static EVENT_KINDS: phf::Map<u16, EventKind> = phf_map! {
    3u16 => EventKind::Damage,      // direct damage
    4u16 => EventKind::Damage,      // damage over time
    14u16 => EventKind::Damage,     // fall damage
    23u16 => EventKind::Damage,     // critical damage
    29u16 => EventKind::Damage,     // split / reflected damage
    5u16 => EventKind::Heal,
    28u16 => EventKind::Heal,       // critical heal
    6u16 => EventKind::BuffApplied,
    8u16 => EventKind::BuffApplied, // debuff gain
    7u16 => EventKind::BuffRemoved,
    9u16 => EventKind::BuffRemoved, // debuff fade
    11u16 => EventKind::Death,      // "A a tué B": target died
    12u16 => EventKind::Death,      // "X est mort": source died
};

/// Map a raw log code to its event kind. Unknown codes are `Other`.
pub fn kind_for_code(code: u16) -> EventKind {
    EVENT_KINDS.get(&code).copied().unwrap_or(EventKind::Other)
}

/// Marker ability names written on code-less lines.
pub mod marker {
    pub const COMBAT_BEGIN: &str = "Combat Begin";
    pub const COMBAT_END: &str = "Combat End";
    pub const ZONE_CHANGE: &str = "Zone Change:";
    pub const BOSS_HEALTH: &str = "Boss Health:";
}
