//! Rift callings (character classes)
//!
//! Callings are not written to the combat log. They are inferred from
//! calling-specific abilities listed in the registry's `[classes]` table.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Calling {
    War,
    Rogue,
    Primalist,
    Cleric,
    Mage,
    #[default]
    Unknown,
}

impl Calling {
    pub const ALL: [Calling; 5] = [
        Calling::War,
        Calling::Rogue,
        Calling::Primalist,
        Calling::Cleric,
        Calling::Mage,
    ];

    /// Parse a calling name as written in registry files (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(name))
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Calling::War => "War",
            Calling::Rogue => "Rogue",
            Calling::Primalist => "Primalist",
            Calling::Cleric => "Cleric",
            Calling::Mage => "Mage",
            Calling::Unknown => "Unknown",
        }
    }
}
