//! Soul build detection
//!
//! A role is recognised from the set of spell keys a player used during a
//! fight. A combo equal to that set wins outright; otherwise the longest combo
//! the player covers wins, and equally long matches go to the role declared
//! first in the registry.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::combat_log::Name;

#[derive(Debug, Clone)]
pub struct RoleDefinition {
    pub name: Name,
    combos: Vec<BTreeSet<Name>>,
}

impl RoleDefinition {
    pub fn new<S: AsRef<str>>(name: &str, combos: &[Vec<S>]) -> Self {
        Self {
            name: Arc::from(name.trim()),
            combos: combos
                .iter()
                .map(|combo| combo.iter().map(|key| Arc::from(key.as_ref().trim())).collect())
                .collect(),
        }
    }

    pub(super) fn has_empty_combo(&self) -> bool {
        self.combos.is_empty() || self.combos.iter().any(BTreeSet::is_empty)
    }

    fn matches_exactly(&self, spells: &BTreeSet<Name>) -> bool {
        self.combos.iter().any(|combo| combo == spells)
    }

    /// Size of the largest combo fully covered by `spells`.
    fn covered_len(&self, spells: &BTreeSet<Name>) -> Option<usize> {
        self.combos
            .iter()
            .filter(|combo| combo.is_subset(spells))
            .map(BTreeSet::len)
            .max()
    }
}

/// Role for a player's spell set, `None` when nothing matches.
pub fn choose_role<'a>(
    roles: &'a [RoleDefinition],
    spells: &BTreeSet<Name>,
) -> Option<&'a RoleDefinition> {
    if spells.is_empty() {
        return None;
    }
    if let Some(exact) = roles.iter().find(|role| role.matches_exactly(spells)) {
        return Some(exact);
    }

    let mut best: Option<(usize, &RoleDefinition)> = None;
    for role in roles {
        let Some(len) = role.covered_len(spells) else {
            continue;
        };
        if best.is_none_or(|(best_len, _)| len > best_len) {
            best = Some((len, role));
        }
    }
    best.map(|(_, role)| role)
}
