use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

use crate::combat_log::Name;

/// Per-log name cache.
///
/// A raid log repeats a few dozen names millions of times. Each distinct name
/// is allocated once and shared by every event that mentions it. The cache is
/// owned by one tokenizer; nothing is shared across uploads.
#[derive(Debug, Default)]
pub struct NameCache {
    names: HashSet<Name>,
    bosses: HashMap<Name, Option<Name>>,
}

impl NameCache {
    pub fn get(&mut self, s: &str) -> Name {
        if let Some(name) = self.names.get(s) {
            return name.clone();
        }
        let name: Name = Arc::from(s);
        self.names.insert(name.clone());
        name
    }

    /// Registry lookup for a target name, memoized per distinct name.
    pub fn boss_key(
        &mut self,
        target: &str,
        lookup: impl FnOnce(&str) -> Option<Name>,
    ) -> Option<Name> {
        if let Some(cached) = self.bosses.get(target) {
            return cached.clone();
        }
        let key = lookup(target);
        let name = self.get(target);
        self.bosses.insert(name, key.clone());
        key
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
