use super::*;
use crate::context::NameCache;
use crate::game_data::{event_code, kind_for_code, marker};
use crate::registry::Registry;
use chrono::{NaiveTime, Timelike};
use memchr::{memchr, memchr_iter};

#[cfg(test)]
mod tests;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A backward step larger than this is a midnight rollover, not an edit.
const ROLLOVER_THRESHOLD_MS: i64 = MS_PER_DAY / 2;

/// Minimum comma-separated fields in an event tuple.
const TUPLE_FIELDS: usize = 10;

macro_rules! parse_i64 {
    ($s:expr) => {
        $s.parse::<i64>().unwrap_or_default()
    };
}

/// What one line of the log turned out to be.
#[derive(Debug)]
pub enum LineOutcome {
    Event(CombatEvent),
    /// Whitespace only. Neither an event nor corruption.
    Blank,
    Malformed,
}

/// Line parser for Rift combat logs.
///
/// Stateful per log: it tracks midnight rollovers and caches names, so one
/// parser must see the lines of exactly one file, in order.
pub struct LogParser<'r> {
    registry: &'r Registry,
    names: NameCache,
    last_time_of_day: Option<i64>,
    day_offset: i64,
}

impl<'r> LogParser<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            names: NameCache::default(),
            last_time_of_day: None,
            day_offset: 0,
        }
    }

    pub fn parse_line(&mut self, line_number: u64, line: &str) -> LineOutcome {
        let line = line.trim();
        if line.is_empty() {
            return LineOutcome::Blank;
        }

        let Some((time_of_day, rest)) = split_timestamp(line) else {
            return LineOutcome::Malformed;
        };

        let parsed = if rest.starts_with('(') {
            self.parse_tuple(line_number, rest)
        } else {
            self.parse_marker(line_number, rest)
        };

        match parsed {
            Some(mut event) => {
                event.timestamp = self.resolve_timestamp(time_of_day);
                LineOutcome::Event(event)
            }
            None => LineOutcome::Malformed,
        }
    }

    /// Place a time of day on the log's timeline, adding a day per rollover.
    fn resolve_timestamp(&mut self, time_of_day: i64) -> i64 {
        if let Some(last) = self.last_time_of_day
            && last - time_of_day > ROLLOVER_THRESHOLD_MS
        {
            self.day_offset += MS_PER_DAY;
        }
        self.last_time_of_day = Some(time_of_day);
        self.day_offset + time_of_day
    }

    // ( code , T=P#.. , T=N#.. , owner , owner , Source , Target , amount , spellId , Ability ) text
    fn parse_tuple(&mut self, line_number: u64, rest: &str) -> Option<CombatEvent> {
        let bytes = rest.as_bytes();
        let close = memchr(b')', bytes)?;
        let inside = &rest[1..close];

        let mut fields: Vec<&str> = Vec::with_capacity(TUPLE_FIELDS);
        let mut start = 0;
        for comma in memchr_iter(b',', inside.as_bytes()) {
            fields.push(inside[start..comma].trim());
            start = comma + 1;
        }
        fields.push(inside[start..].trim());

        if fields.len() < TUPLE_FIELDS {
            return None;
        }

        let code = fields[0].parse::<u16>().ok()?;
        let kind = kind_for_code(code);

        let source_is_player = is_player_token(fields[1]);
        let target_is_player = is_player_token(fields[2]);
        let source = normalize_name(fields[5]);
        let target = normalize_name(fields[6]);
        let amount = parse_i64!(fields[7]);
        let ability = fields[9];

        // "X est mort": the dead entity is the source of the line
        let (target, target_is_player) = if code == event_code::DIED {
            (source, source_is_player)
        } else {
            (target, target_is_player)
        };

        Some(self.build_event(EventParts {
            line_number,
            code,
            kind,
            actor: source,
            actor_is_player: source_is_player,
            target,
            target_is_player,
            ability,
            amount,
            health_pct: None,
        }))
    }

    fn parse_marker(&mut self, line_number: u64, rest: &str) -> Option<CombatEvent> {
        if rest == marker::COMBAT_BEGIN || rest == marker::COMBAT_END {
            return Some(self.build_event(EventParts {
                ability: rest,
                ..EventParts::marker(line_number)
            }));
        }

        if let Some(zone) = rest.strip_prefix(marker::ZONE_CHANGE) {
            let zone = zone.trim();
            if zone.is_empty() {
                return None;
            }
            return Some(self.build_event(EventParts {
                kind: EventKind::ZoneChange,
                target: zone,
                ability: marker::ZONE_CHANGE.trim_end_matches(':'),
                ..EventParts::marker(line_number)
            }));
        }

        // Boss Health: <name> = <pct>%
        if let Some(sample) = rest.strip_prefix(marker::BOSS_HEALTH) {
            let eq = memchr(b'=', sample.as_bytes())?;
            let name = normalize_name(&sample[..eq]);
            let pct = sample[eq + 1..]
                .trim()
                .trim_end_matches('%')
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|p| (0.0..=100.0).contains(p))?;
            if name.is_empty() {
                return None;
            }
            return Some(self.build_event(EventParts {
                target: name,
                ability: marker::BOSS_HEALTH.trim_end_matches(':'),
                health_pct: Some(pct),
                ..EventParts::marker(line_number)
            }));
        }

        None
    }

    fn build_event(&mut self, parts: EventParts<'_>) -> CombatEvent {
        let registry = self.registry;
        let target_boss = if parts.target_is_player || parts.target.is_empty() {
            None
        } else {
            self.names.boss_key(parts.target, |name| {
                registry
                    .match_boss(name)
                    .filter(|boss| boss.is_raid_boss)
                    .map(|boss| boss.key.clone())
            })
        };

        CombatEvent {
            line_number: parts.line_number,
            timestamp: 0,
            code: parts.code,
            kind: parts.kind,
            actor_name: self.names.get(parts.actor),
            actor_is_player: parts.actor_is_player,
            target_name: self.names.get(parts.target),
            target_is_player: parts.target_is_player,
            target_is_boss: target_boss.is_some(),
            target_boss,
            ability_name: self.names.get(parts.ability),
            amount: parts.amount,
            health_pct: parts.health_pct,
        }
    }
}

struct EventParts<'a> {
    line_number: u64,
    code: u16,
    kind: EventKind,
    actor: &'a str,
    actor_is_player: bool,
    target: &'a str,
    target_is_player: bool,
    ability: &'a str,
    amount: i64,
    health_pct: Option<f64>,
}

impl<'a> EventParts<'a> {
    fn marker(line_number: u64) -> Self {
        Self {
            line_number,
            code: event_code::MARKER,
            kind: EventKind::Other,
            actor: "",
            actor_is_player: false,
            target: "",
            target_is_player: false,
            ability: "",
            amount: 0,
            health_pct: None,
        }
    }
}

// parse HH:MM:SS[.mmm] followed by an optional ':'
fn split_timestamp(line: &str) -> Option<(i64, &str)> {
    let b = line.as_bytes();
    if b.len() < 8 || b[2] != b':' || b[5] != b':' {
        return None;
    }
    let digits = [b[0], b[1], b[3], b[4], b[6], b[7]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let hour = ((b[0] - b'0') * 10 + (b[1] - b'0')) as u32;
    let minute = ((b[3] - b'0') * 10 + (b[4] - b'0')) as u32;
    let second = ((b[6] - b'0') * 10 + (b[7] - b'0')) as u32;

    let mut pos = 8;
    let mut millis = 0u32;
    if b.len() >= 12 && b[8] == b'.' && b[9..12].iter().all(u8::is_ascii_digit) {
        millis = (b[9] - b'0') as u32 * 100 + (b[10] - b'0') as u32 * 10 + (b[11] - b'0') as u32;
        pos = 12;
    }

    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis)?;
    let time_of_day = time.num_seconds_from_midnight() as i64 * 1000 + millis as i64;

    let mut rest = &line[pos..];
    if let Some(stripped) = rest.strip_prefix(':') {
        rest = stripped;
    }
    Some((time_of_day, rest.trim()))
}

fn is_player_token(token: &str) -> bool {
    token.starts_with("T=P")
}

/// Rift names can carry the shard: "Ghreanay@Brutwacht" -> "Ghreanay".
fn normalize_name(name: &str) -> &str {
    let name = name.trim();
    match memchr(b'@', name.as_bytes()) {
        Some(at) => name[..at].trim(),
        None => name,
    }
}

/// Format a log timestamp as a wall clock ("HH:MM:SS", with millis if present).
pub fn format_clock(timestamp_ms: i64) -> String {
    let in_day = timestamp_ms.rem_euclid(MS_PER_DAY);
    let secs = (in_day / 1000) as u32;
    let millis = (in_day % 1000) as u32;
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, millis * 1_000_000) {
        Some(time) if millis == 0 => time.format("%H:%M:%S").to_string(),
        Some(time) => time.format("%H:%M:%S%.3f").to_string(),
        None => String::new(),
    }
}
