//! Error types for combat log tokenizing

use thiserror::Error;

/// Structural problems with an upload. Per-line malformation is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("combat log is empty")]
    EmptyInput,

    #[error("combat log is {size} bytes, limit is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
}
