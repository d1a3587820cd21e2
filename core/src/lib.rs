pub mod anticheat;
pub mod combat_log;
pub mod context;
pub mod encounter;
pub mod game_data;
pub mod ingest;
pub mod metrics;
pub mod registry;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use anticheat::{AntiCheatEvaluator, AntiCheatVerdict, ReasonCode, VerdictStatus};
pub use combat_log::*;
pub use context::{AppConfig, AppConfigExt, PipelineConfig};
pub use encounter::{EncounterCandidate, Resolution, Segmenter};
pub use game_data::Calling;
pub use ingest::{IngestError, Ingestor, UploadMetadata, UploadReport};
pub use metrics::{PlayerMetrics, RunMetrics};
pub use registry::{Registry, RegistryError};
