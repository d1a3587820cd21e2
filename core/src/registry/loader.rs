//! Registry loading
//!
//! Registries are plain TOML files (see `riftlog_types::RegistryFile`). The
//! built-in registry ships the bosses and calling abilities the leaderboards
//! currently track.

use std::fs;
use std::path::Path;

use riftlog_types::RegistryFile;

use super::{Registry, RegistryError};

const BUILTIN_REGISTRY: &str = include_str!("../../data/registry.toml");
const BUILTIN_ORIGIN: &str = "<builtin>";

/// Load a registry from a TOML file on disk.
pub fn load_registry(path: &Path) -> Result<Registry, RegistryError> {
    let content = fs::read_to_string(path).map_err(|source| RegistryError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    parse_registry(&content, path)
}

/// Parse registry TOML. `origin` is only used in error messages.
pub fn parse_registry(content: &str, origin: &Path) -> Result<Registry, RegistryError> {
    let file: RegistryFile = toml::from_str(content).map_err(|source| RegistryError::ParseToml {
        path: origin.to_path_buf(),
        source,
    })?;
    Registry::from_file(file).map_err(|reason| RegistryError::InvalidDefinition {
        path: origin.to_path_buf(),
        reason,
    })
}

/// The registry bundled with the binary.
pub fn builtin_registry() -> Result<Registry, RegistryError> {
    parse_registry(BUILTIN_REGISTRY, Path::new(BUILTIN_ORIGIN))
}
