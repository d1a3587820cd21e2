//! Boss and ability registry
//!
//! Maps boss display names to their definitions, non-stackable buffs to their
//! legal stack counts, and calling-specific abilities to callings. A registry
//! is built once per process and passed by reference into the tokenizer,
//! the aggregator and the anti-cheat evaluator.

mod error;
mod loader;
mod roles;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use riftlog_types::{BossEntry, MechanicRule, RegistryFile};

use crate::combat_log::Name;
use crate::game_data::Calling;

pub use error::{DefinitionError, RegistryError};
pub use loader::{builtin_registry, load_registry, parse_registry};
pub use roles::{RoleDefinition, choose_role};

/// Case- and whitespace-insensitive form of a name ("  Titan  X" -> "titan x").
pub fn normalize_key(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone)]
pub struct BossDefinition {
    /// Canonical key; runs are reported under this name.
    pub key: Name,
    pub is_raid_boss: bool,
    pub exact_match: bool,
    pub mechanic: Option<MechanicRule>,
    /// Normalized name, aliases and member names.
    patterns: Vec<String>,
    /// Normalized member names, empty for single-entity bosses.
    members: Vec<String>,
}

impl BossDefinition {
    fn from_entry(entry: BossEntry) -> Self {
        let members: Vec<String> = entry.members.iter().map(|m| normalize_key(m)).collect();
        let mut patterns = vec![normalize_key(&entry.name)];
        patterns.extend(entry.aliases.iter().map(|a| normalize_key(a)));
        patterns.extend(members.iter().cloned());
        patterns.retain(|p| !p.is_empty());

        Self {
            key: Arc::from(entry.name.trim()),
            is_raid_boss: entry.is_raid_boss,
            exact_match: entry.exact_match,
            mechanic: entry.mechanic,
            patterns,
            members,
        }
    }

    /// Does an entity name from the log refer to this boss?
    pub fn matches(&self, name: &str) -> bool {
        let name = normalize_key(name);
        if name.is_empty() {
            return false;
        }
        if self.exact_match {
            self.patterns.iter().any(|p| *p == name)
        } else {
            self.patterns.iter().any(|p| name.contains(p.as_str()))
        }
    }

    /// Index of the council member an entity name refers to.
    pub fn member_index(&self, name: &str) -> Option<usize> {
        let name = normalize_key(name);
        self.members
            .iter()
            .position(|m| *m == name || (!self.exact_match && name.contains(m.as_str())))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    bosses: Vec<BossDefinition>,
    buff_limits: HashMap<String, u32>,
    classes: HashMap<String, Calling>,
    /// Normalized ability name -> spell key.
    spells: HashMap<String, Name>,
    /// Declaration order is tie-break priority.
    roles: Vec<RoleDefinition>,
}

impl Registry {
    /// A registry that knows no bosses. Nothing will segment against it.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        load_registry(path)
    }

    pub fn builtin() -> Result<Self, RegistryError> {
        builtin_registry()
    }

    /// Validate and index a deserialized registry file.
    pub fn from_file(file: RegistryFile) -> Result<Self, DefinitionError> {
        let mut seen = HashSet::new();
        let mut bosses = Vec::with_capacity(file.bosses.len());
        for entry in file.bosses {
            let key = normalize_key(&entry.name);
            if key.is_empty() {
                return Err(DefinitionError::EmptyBossName);
            }
            if !seen.insert(key) {
                return Err(DefinitionError::DuplicateBoss(entry.name.trim().to_string()));
            }
            if let Some(rule) = &entry.mechanic {
                if !(rule.trigger_percent > 0.0 && rule.trigger_percent < 100.0) {
                    return Err(DefinitionError::TriggerOutOfRange {
                        boss: entry.name.trim().to_string(),
                        trigger_percent: rule.trigger_percent,
                    });
                }
                if rule.period_s < 0.0 || rule.invulnerability_ability.trim().is_empty() {
                    return Err(DefinitionError::IncompleteMechanic {
                        boss: entry.name.trim().to_string(),
                    });
                }
            }
            bosses.push(BossDefinition::from_entry(entry));
        }

        let mut buff_limits = HashMap::with_capacity(file.buffs.len());
        for buff in file.buffs {
            if buff.max_stacks == 0 {
                return Err(DefinitionError::ZeroMaxStacks(buff.name));
            }
            buff_limits.insert(normalize_key(&buff.name), buff.max_stacks);
        }

        let mut classes = HashMap::with_capacity(file.classes.len());
        for (ability, calling) in file.classes {
            let Some(known) = Calling::from_name(&calling) else {
                return Err(DefinitionError::UnknownCalling { ability, calling });
            };
            classes.insert(normalize_key(&ability), known);
        }

        let spells = file
            .spells
            .iter()
            .map(|(ability, key)| (normalize_key(ability), Arc::from(key.trim())))
            .collect();

        let mut role_names = HashSet::new();
        let mut roles = Vec::with_capacity(file.roles.len());
        for entry in &file.roles {
            let role = RoleDefinition::new(&entry.name, &entry.combos);
            if role.name.is_empty() {
                return Err(DefinitionError::EmptyRoleName);
            }
            if !role_names.insert(role.name.clone()) {
                return Err(DefinitionError::DuplicateRole(role.name.to_string()));
            }
            if role.has_empty_combo() {
                return Err(DefinitionError::EmptyCombo(role.name.to_string()));
            }
            roles.push(role);
        }

        Ok(Self {
            bosses,
            buff_limits,
            classes,
            spells,
            roles,
        })
    }

    /// First boss (in file order) whose name, aliases or members match.
    pub fn match_boss(&self, name: &str) -> Option<&BossDefinition> {
        self.bosses.iter().find(|b| b.matches(name))
    }

    /// Look up a boss by canonical key.
    pub fn boss(&self, key: &str) -> Option<&BossDefinition> {
        self.bosses.iter().find(|b| &*b.key == key)
    }

    pub fn bosses(&self) -> &[BossDefinition] {
        &self.bosses
    }

    /// Legal stack count for a non-stackable buff, `None` if unrestricted.
    pub fn buff_limit(&self, ability: &str) -> Option<u32> {
        if self.buff_limits.is_empty() {
            return None;
        }
        self.buff_limits.get(&normalize_key(ability)).copied()
    }

    pub fn has_buff_limits(&self) -> bool {
        !self.buff_limits.is_empty()
    }

    pub fn calling_for_ability(&self, ability: &str) -> Option<Calling> {
        if self.classes.is_empty() {
            return None;
        }
        self.classes.get(&normalize_key(ability)).copied()
    }

    /// Spell key an ability counts as for role detection.
    pub fn spell_key(&self, ability: &str) -> Option<&Name> {
        if self.spells.is_empty() {
            return None;
        }
        self.spells.get(&normalize_key(ability))
    }

    pub fn has_roles(&self) -> bool {
        !self.roles.is_empty()
    }

    pub fn role_for(&self, spells: &BTreeSet<Name>) -> Option<&Name> {
        choose_role(&self.roles, spells).map(|role| &role.name)
    }
}
