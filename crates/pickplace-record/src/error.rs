use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while recording or exporting a run log.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The record budget is spent. Fatal to the run.
    #[error("Log storage exhausted after {capacity} records")]
    StorageExhausted { capacity: usize },

    #[error("Malformed table {path:?} at line {line}: {message}")]
    Table {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl RecordError {
    pub(crate) fn table(path: &std::path::Path, line: usize, message: impl Into<String>) -> Self {
        Self::Table {
            path: path.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}
