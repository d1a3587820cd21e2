use super::*;
use crate::registry::parse_registry;
use std::path::Path;

fn test_registry() -> Registry {
    parse_registry(
        r#"
[[boss]]
name = "Titan X"
aliases = ["TitanX"]

[[boss]]
name = "Vengeur"
is_raid_boss = false
"#,
        Path::new("test.toml"),
    )
    .unwrap()
}

fn event(parser: &mut LogParser<'_>, line: &str) -> CombatEvent {
    match parser.parse_line(1, line) {
        LineOutcome::Event(event) => event,
        other => panic!("expected an event from {line:?}, got {other:?}"),
    }
}

// tuple lines
#[test]
fn test_parse_damage_on_boss() {
    let registry = test_registry();
    let mut parser = LogParser::new(&registry);
    let e = event(
        &mut parser,
        "20:41:32: ( 3 , T=P#R=G#227009542451445265 , T=N#R=O#9223372041145384975 , T=X#R=X#0 , T=X#R=X#0 , Ghreanay@Brutwacht , Titan X , 1719 , 1226843520 , Tir de précision ) Ghreanay's Tir de précision hits Titan X for 1719 Physical damage.",
    );

    assert_eq!(e.code, 3);
    assert_eq!(e.kind, EventKind::Damage);
    assert_eq!(e.timestamp, (20 * 3600 + 41 * 60 + 32) * 1000);
    assert_eq!(e.actor_name.as_ref(), "Ghreanay");
    assert!(e.actor_is_player);
    assert_eq!(e.target_name.as_ref(), "Titan X");
    assert!(!e.target_is_player);
    assert!(e.target_is_boss);
    assert_eq!(e.target_boss.as_deref(), Some("Titan X"));
    assert_eq!(e.ability_name.as_ref(), "Tir de précision");
    assert_eq!(e.amount, 1719);
    assert_eq!(e.health_pct, None);
}

#[test]
fn test_alias_resolves_to_canonical_key() {
    let registry = test_registry();
    let mut parser = LogParser::new(&registry);
    let e = event(
        &mut parser,
        "20:41:32: ( 4 , T=P#1 , T=N#2 , T=X#0 , T=X#0 , Ghreanay , TitanX , 200 , 1 , Poison ) text",
    );
    assert_eq!(e.target_boss.as_deref(), Some("Titan X"));
}

#[test]
fn test_named_mob_is_not_a_boss_target() {
    let registry = test_registry();
    let mut parser = LogParser::new(&registry);
    let e = event(
        &mut parser,
        "20:41:32: ( 3 , T=P#1 , T=N#2 , T=X#0 , T=X#0 , Ghreanay , Vengeur , 200 , 1 , Frappe ) text",
    );
    assert!(!e.target_is_boss);
    assert_eq!(e.target_boss, None);
}

#[test]
fn test_heal_and_buff_codes() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    let heal = event(
        &mut parser,
        "20:41:33: ( 28 , T=P#3 , T=P#1 , T=X#0 , T=X#0 , Tissaia , Ghreanay , 900 , 12 , Soin ) crit",
    );
    assert_eq!(heal.kind, EventKind::Heal);
    assert!(heal.target_is_player);

    let gain = event(
        &mut parser,
        "20:41:34: ( 6 , T=P#3 , T=P#3 , T=X#0 , T=X#0 , Tissaia , Tissaia , 0 , 13 , Armure de dévotion ) gain",
    );
    assert_eq!(gain.kind, EventKind::BuffApplied);

    let fade = event(
        &mut parser,
        "20:41:35: ( 9 , T=P#3 , T=N#2 , T=X#0 , T=X#0 , Tissaia , Mob , 0 , 14 , Malédiction ) fade",
    );
    assert_eq!(fade.kind, EventKind::BuffRemoved);

    let other = event(
        &mut parser,
        "20:41:36: ( 27 , T=P#3 , T=P#3 , T=X#0 , T=X#0 , Tissaia , Tissaia , 0 , 15 , Interrupt ) text",
    );
    assert_eq!(other.kind, EventKind::Other);
}

#[test]
fn test_died_moves_source_into_target() {
    let registry = test_registry();
    let mut parser = LogParser::new(&registry);
    let died = event(
        &mut parser,
        "20:45:00: ( 12 , T=N#2 , T=X#0 , T=X#0 , T=X#0 , Titan X , , 0 , 0 , ) Titan X died.",
    );
    assert_eq!(died.kind, EventKind::Death);
    assert_eq!(died.target_name.as_ref(), "Titan X");
    assert_eq!(died.target_boss.as_deref(), Some("Titan X"));

    let slain = event(
        &mut parser,
        "20:45:01: ( 11 , T=P#1 , T=N#2 , T=X#0 , T=X#0 , Ghreanay , Titan X , 0 , 0 , ) Titan X is slain by Ghreanay.",
    );
    assert_eq!(slain.kind, EventKind::Death);
    assert_eq!(slain.target_boss.as_deref(), Some("Titan X"));
}

#[test]
fn test_non_numeric_amount_is_zero() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    let e = event(
        &mut parser,
        "20:41:32: ( 3 , T=P#1 , T=N#2 , T=X#0 , T=X#0 , A , B , lots , 1 , Hit ) text",
    );
    assert_eq!(e.amount, 0);
}

// markers and annotations
#[test]
fn test_combat_markers() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    let begin = event(&mut parser, "20:41:31 Combat Begin");
    assert_eq!(begin.kind, EventKind::Other);
    assert_eq!(begin.ability_name.as_ref(), "Combat Begin");
    let end = event(&mut parser, "20:42:31 Combat End");
    assert_eq!(end.ability_name.as_ref(), "Combat End");
}

#[test]
fn test_zone_change() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    let e = event(&mut parser, "20:00:00 Zone Change: Infinity Gate");
    assert_eq!(e.kind, EventKind::ZoneChange);
    assert_eq!(e.target_name.as_ref(), "Infinity Gate");
}

#[test]
fn test_boss_health_sample() {
    let registry = test_registry();
    let mut parser = LogParser::new(&registry);
    let e = event(&mut parser, "20:43:10.250 Boss Health: Titan X = 61.5%");
    assert_eq!(e.timestamp % 1000, 250);
    assert_eq!(e.health_pct, Some(61.5));
    assert_eq!(e.target_boss.as_deref(), Some("Titan X"));
}

// malformed and blank
#[test]
fn test_malformed_lines() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    for line in [
        "not a log line",
        "25:00:00 Combat Begin",
        "20:41:32: ( 3 , T=P#1 , T=N#2 , A , B , 100 ) too short",
        "20:41:32: ( x , T=P#1 , T=N#2 , T=X#0 , T=X#0 , A , B , 1 , 1 , Hit ) bad code",
        "20:41:32: ( 3 , T=P#1 , T=N#2 , T=X#0 , T=X#0 , A , B , 1 , 1 , Hit unterminated",
        "20:41:32 Something Else",
        "20:41:32 Boss Health: Titan X = lots",
    ] {
        assert!(
            matches!(parser.parse_line(1, line), LineOutcome::Malformed),
            "{line:?} should be malformed"
        );
    }
    assert!(matches!(parser.parse_line(1, "   \t"), LineOutcome::Blank));
}

// timeline
#[test]
fn test_midnight_rollover_adds_a_day() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    let before = event(&mut parser, "23:59:58 Combat Begin");
    let after = event(&mut parser, "00:00:03 Combat End");
    assert_eq!(after.timestamp - before.timestamp, 5_000);
}

#[test]
fn test_small_backward_jump_is_preserved() {
    let registry = Registry::empty();
    let mut parser = LogParser::new(&registry);
    let first = event(&mut parser, "20:00:10 Combat Begin");
    let second = event(&mut parser, "20:00:05 Combat End");
    assert_eq!(second.timestamp - first.timestamp, -5_000);
}

#[test]
fn test_format_clock() {
    assert_eq!(format_clock(0), "00:00:00");
    assert_eq!(format_clock((20 * 3600 + 41 * 60 + 32) * 1000), "20:41:32");
    assert_eq!(format_clock(1_500), "00:00:01.500");
    // next day wraps
    assert_eq!(format_clock(MS_PER_DAY + 61_000), "00:01:01");
}
