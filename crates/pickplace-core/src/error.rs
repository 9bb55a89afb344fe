use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid physics_dt: {0} (must be > 0)")]
    InvalidPhysicsDt(f64),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Incompatible configuration: {0}")]
    Incompatible(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Task-control errors.
///
/// Neither variant is retried: both indicate a sequencing or wiring bug in
/// the caller and abort the current tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Invalid observation: missing or malformed `{key}`")]
    InvalidObservation { key: String },

    #[error("Controller not initialized: call reset() before advance()")]
    NotInitialized,
}

impl TaskError {
    pub fn invalid_observation(key: impl Into<String>) -> Self {
        Self::InvalidObservation { key: key.into() }
    }
}
