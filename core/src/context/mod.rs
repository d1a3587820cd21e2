mod config;
mod error;
mod interner;

pub use config::{AppConfig, AppConfigExt, PipelineConfig};
pub use error::ConfigError;
pub use interner::NameCache;
