//! Error types for registry loading

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading the boss/ability registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML in {path}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid definition in {path}: {reason}")]
    InvalidDefinition {
        path: PathBuf,
        #[source]
        reason: DefinitionError,
    },
}

/// A registry file that parsed but does not make sense.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("boss with an empty name")]
    EmptyBossName,

    #[error("boss '{0}' is defined twice")]
    DuplicateBoss(String),

    #[error("boss '{boss}': trigger_percent {trigger_percent} is outside (0, 100)")]
    TriggerOutOfRange { boss: String, trigger_percent: f64 },

    #[error("boss '{boss}': mechanic needs a non-negative period_s and an invulnerability_ability")]
    IncompleteMechanic { boss: String },

    #[error("buff '{0}' has max_stacks = 0")]
    ZeroMaxStacks(String),

    #[error("ability '{ability}' maps to unknown calling '{calling}'")]
    UnknownCalling { ability: String, calling: String },

    #[error("role with an empty name")]
    EmptyRoleName,

    #[error("role '{0}' is defined twice")]
    DuplicateRole(String),

    #[error("role '{0}' has an empty combo")]
    EmptyCombo(String),
}
