use thiserror::Error;

use pickplace_core::error::{ConfigError, TaskError};
use pickplace_record::RecordError;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Recording error: {0}")]
    Record(#[from] RecordError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_each_layer() {
        let err: RunError = TaskError::NotInitialized.into();
        assert!(err.to_string().starts_with("Task error"));

        let err: RunError = RecordError::StorageExhausted { capacity: 1 }.into();
        assert!(matches!(err, RunError::Record(_)));

        let err: RunError = ConfigError::InvalidPhysicsDt(0.0).into();
        assert!(matches!(err, RunError::Config(_)));
    }
}
