//! Synthetic combat logs for unit tests.

use std::fmt::Write as _;
use std::path::Path;

use crate::combat_log::format_clock;
use crate::registry::{Registry, parse_registry};

/// Log time of `t = 0` in builder-relative seconds (20:00:00).
pub const BASE_MS: i64 = 20 * 3600 * 1000;

/// Absolute log timestamp for a builder-relative time in seconds.
pub fn at(t_s: f64) -> i64 {
    BASE_MS + (t_s * 1000.0).round() as i64
}

pub const TITAN: &str = "Titan X";
pub const AZRANEL: &str = "Azranel";
pub const COUNCIL: &str = "Le Concile du Destin";
pub const INVULNERABLE: &str = "Bouclier de titane";

pub fn test_registry() -> Registry {
    parse_registry(
        r#"
[[boss]]
name = "Titan X"
aliases = ["TitanX"]

[boss.mechanic]
trigger_percent = 60.0
period_s = 10.0
invulnerability_ability = "Bouclier de titane"

[[boss]]
name = "Azranel"

[[boss]]
name = "Le Concile du Destin"
exact_match = true
members = ["Countessa Danazhal", "Marquise Boldoch"]

[[boss]]
name = "Vengeur"
is_raid_boss = false

[[buff]]
name = "Inspiration"
max_stacks = 1

[classes]
"Posture prête" = "War"
"Armure de dévotion" = "Cleric"
"Armure eldritch" = "Mage"

[spells]
"Tir instantané" = "RFS"
"Tir calculé" = "CS"
"Frappe crépusculaire" = "DS"
"Tir de barrage" = "BAR"

[[role]]
name = "SpitFire"
combos = [["RFS", "CS", "DS"]]

[[role]]
name = "Marksman"
combos = [["RFS", "CS"]]
"#,
        Path::new("test-registry.toml"),
    )
    .unwrap()
}

#[derive(Debug, Clone, Copy)]
pub struct Entity<'a> {
    name: &'a str,
    player: bool,
}

pub fn player(name: &str) -> Entity<'_> {
    Entity { name, player: true }
}

pub fn npc(name: &str) -> Entity<'_> {
    Entity {
        name,
        player: false,
    }
}

const NOBODY: Entity<'static> = Entity {
    name: "",
    player: false,
};

/// Builds Rift combat log text line by line.
#[derive(Debug, Default)]
pub struct LogBuilder {
    text: String,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&mut self, line: &str) -> &mut Self {
        self.text.push_str(line);
        self.text.push('\n');
        self
    }

    pub fn event(
        &mut self,
        t_s: f64,
        code: u16,
        source: Entity<'_>,
        target: Entity<'_>,
        amount: i64,
        ability: &str,
    ) -> &mut Self {
        let token = |e: Entity<'_>| match (e.player, e.name.is_empty()) {
            (true, _) => "T=P#R=G#227009542451445265",
            (false, false) => "T=N#R=O#9223372041145384975",
            (false, true) => "T=X#R=X#0",
        };
        let _ = writeln!(
            self.text,
            "{}: ( {} , {} , {} , T=X#R=X#0 , T=X#R=X#0 , {} , {} , {} , 1226843520 , {} ) {} uses {} on {}.",
            format_clock(at(t_s)),
            code,
            token(source),
            token(target),
            source.name,
            target.name,
            amount,
            ability,
            source.name,
            ability,
            target.name,
        );
        self
    }

    pub fn damage(&mut self, t_s: f64, source: Entity<'_>, target: Entity<'_>, amount: i64) -> &mut Self {
        self.event(t_s, 3, source, target, amount, "Frappe")
    }

    pub fn heal(&mut self, t_s: f64, source: Entity<'_>, target: Entity<'_>, amount: i64) -> &mut Self {
        self.event(t_s, 5, source, target, amount, "Soin")
    }

    pub fn buff(&mut self, t_s: f64, source: Entity<'_>, target: Entity<'_>, ability: &str) -> &mut Self {
        self.event(t_s, 6, source, target, 0, ability)
    }

    pub fn fade(&mut self, t_s: f64, source: Entity<'_>, target: Entity<'_>, ability: &str) -> &mut Self {
        self.event(t_s, 7, source, target, 0, ability)
    }

    /// "B is slain by A" (code 11).
    pub fn slain(&mut self, t_s: f64, killer: Entity<'_>, victim: Entity<'_>) -> &mut Self {
        self.event(t_s, 11, killer, victim, 0, "")
    }

    /// "X died" (code 12).
    pub fn died(&mut self, t_s: f64, who: Entity<'_>) -> &mut Self {
        self.event(t_s, 12, who, NOBODY, 0, "")
    }

    pub fn health(&mut self, t_s: f64, boss: &str, pct: f64) -> &mut Self {
        let _ = writeln!(self.text, "{} Boss Health: {} = {}%", format_clock(at(t_s)), boss, pct);
        self
    }

    pub fn combat_begin(&mut self, t_s: f64) -> &mut Self {
        let _ = writeln!(self.text, "{} Combat Begin", format_clock(at(t_s)));
        self
    }

    /// Every player in `raid` hits `target` once per second over `[from, to]`.
    pub fn raid_damage(
        &mut self,
        raid: &[&str],
        target: Entity<'_>,
        from_s: u32,
        to_s: u32,
        amount: i64,
    ) -> &mut Self {
        for t in from_s..=to_s {
            for name in raid {
                self.damage(t as f64, player(name), target, amount);
            }
        }
        self
    }

    pub fn build(&self) -> String {
        self.text.clone()
    }
}

pub const RAID: [&str; 4] = ["Ghreanay", "Tissaia", "Orgrim", "Kaelis"];
