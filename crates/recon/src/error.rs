use thiserror::Error;

/// Structural failures. Everything recoverable is an [`crate::anomaly::Anomaly`].
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad slave key, empty swap scope, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A check was enabled but the input it needs was not supplied.
    #[error("{check} requires {input}, which was not supplied")]
    MissingInput { check: &'static str, input: &'static str },
}

/// A field value that does not belong to its closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: '{value}'")]
pub struct FieldError {
    pub field: &'static str,
    pub value: String,
}

impl FieldError {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self { field, value: value.into() }
    }
}
