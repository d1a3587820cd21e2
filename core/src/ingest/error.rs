//! Error types for upload ingestion

use thiserror::Error;

use crate::combat_log::TokenizeError;

/// Upload-level failures. Rejected or dropped runs are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("upload refused")]
    Tokenize(#[from] TokenizeError),

    #[error("upload processing was cancelled")]
    Cancelled,
}
