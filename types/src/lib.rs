//! Shared configuration types for riftlog
//!
//! This crate contains the serializable configuration types shared between the
//! ingestion core (riftlog-core) and the binaries that drive it. It has no
//! behaviour beyond defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Upload size limit used by the dashboard (200 MB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 200 * 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Pipeline Tuning
// ─────────────────────────────────────────────────────────────────────────────

/// Tuning knobs for one upload's processing.
///
/// Every threshold here is a heuristic tuned against real raid logs. They are
/// configuration so moderators can adjust them without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Uploads larger than this are refused before tokenization.
    pub max_file_size_bytes: u64,

    /// Seconds without player damage/heal activity before an encounter
    /// is considered over (wipe or reset).
    pub combat_timeout_s: f64,

    /// Add hits closer together than this merge into one add-active range.
    pub add_window_s: f64,

    /// Delay before a "X died" line (code 12) on the boss is accepted as a kill.
    pub confirm_death_after_s: f64,

    /// How far before the raid's pull a player may touch the boss.
    pub ninja_pull_threshold_s: f64,

    /// Number of early boss hits needed before a run counts as ninja-pulled.
    pub ninja_pull_min_events: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            combat_timeout_s: 30.0,
            add_window_s: 5.0,
            confirm_death_after_s: 6.0,
            ninja_pull_threshold_s: 3.0,
            ninja_pull_min_events: 1,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Config
// ─────────────────────────────────────────────────────────────────────────────

/// Persisted configuration for the parse worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the boss/ability registry TOML file.
    pub registry_path: Option<PathBuf>,

    pub pipeline: PipelineConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry File Schema
// ─────────────────────────────────────────────────────────────────────────────

/// Root structure of a registry file.
///
/// ```toml
/// [[boss]]
/// name = "Titan X"
/// aliases = ["TitanX"]
///
/// [boss.mechanic]
/// trigger_percent = 60.0
/// period_s = 10.0
/// invulnerability_ability = "Invulnerable"
///
/// [[buff]]
/// name = "Inspiration"
/// max_stacks = 1
///
/// [classes]
/// "Posture prête" = "War"
///
/// [spells]
/// "Tir instantané" = "RFS"
/// "Tir calculé" = "CS"
///
/// [[role]]
/// name = "Marksman"
/// combos = [["RFS", "CS"]]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default, rename = "boss")]
    pub bosses: Vec<BossEntry>,

    #[serde(default, rename = "buff")]
    pub buffs: Vec<BuffLimit>,

    /// Ability name -> calling name.
    #[serde(default)]
    pub classes: BTreeMap<String, String>,

    /// Ability name -> spell key used by `[[role]]` combos.
    #[serde(default)]
    pub spells: BTreeMap<String, String>,

    /// Soul builds, highest priority first.
    #[serde(default, rename = "role")]
    pub roles: Vec<RoleEntry>,
}

/// A named boss the segmenter and evaluator know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossEntry {
    /// Display name, also the canonical key runs are reported under.
    pub name: String,

    /// Alternate spellings (other client languages, missing accents).
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Only raid bosses open an encounter. Other entries are named mobs.
    #[serde(default = "default_true")]
    pub is_raid_boss: bool,

    /// Require the full name instead of a substring match.
    #[serde(default)]
    pub exact_match: bool,

    /// Council-style bosses: the kill is the death of the last member.
    #[serde(default)]
    pub members: Vec<String>,

    #[serde(default)]
    pub mechanic: Option<MechanicRule>,
}

/// A hard-timed invulnerability the raid cannot legitimately skip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanicRule {
    /// Health percentage at which the boss must turn invulnerable.
    pub trigger_percent: f64,

    /// Seconds after the threshold is crossed within which the
    /// invulnerability must show up.
    pub period_s: f64,

    /// Ability (buff) name announcing the invulnerability.
    pub invulnerability_ability: String,
}

/// A soul build recognised by the spells a player cast.
///
/// A player matches a combo when they used at least its spells. Ties between
/// equally specific combos go to the role listed first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub name: String,

    /// Alternative spell-key sets, any of which identifies the role.
    pub combos: Vec<Vec<String>>,
}

/// A buff that may not be applied more than `max_stacks` times to one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffLimit {
    pub name: String,
    #[serde(default = "default_one")]
    pub max_stacks: u32,
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}
