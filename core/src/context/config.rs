//! Application configuration
//!
//! This module re-exports the shared types from riftlog-types and provides
//! persistence for AppConfig.

use std::path::Path;

pub use riftlog_types::{AppConfig, PipelineConfig};

use super::ConfigError;
use crate::registry::{Registry, RegistryError};

const APP_NAME: &str = "riftlog";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence
pub trait AppConfigExt: Sized {
    /// Load from the user's config directory, falling back to defaults.
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn save_to(&self, path: &Path) -> Result<(), ConfigError>;
    /// The configured registry, or the built-in one when none is set.
    fn registry(&self) -> Result<Registry, RegistryError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        Ok(confy::load(APP_NAME, CONFIG_NAME)?)
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Ok(confy::load_path(path)?)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        confy::store_path(path, self).map_err(ConfigError::Save)
    }

    fn registry(&self) -> Result<Registry, RegistryError> {
        match &self.registry_path {
            Some(path) => Registry::load(path),
            None => Registry::builtin(),
        }
    }
}
