//! Error types for the speech assessment pipeline

use thiserror::Error;

/// Main error type for the assessment system
#[derive(Error, Debug)]
pub enum AssessError {
    #[error("Audio load error: {0}")]
    Load(#[from] LoadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Waveform loading errors
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read audio source: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported audio: {0}")]
    Unsupported(String),

    #[error("Cannot decode audio (primary: {primary}; fallback: {fallback})")]
    Decode { primary: String, fallback: String },

    #[error("Resampling error: {0}")]
    Resampling(String),
}

/// Failure of a single feature family.
///
/// These never leave the feature extractor: each family falls back to its
/// documented defaults and the error is only logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Invalid analysis parameters: {0}")]
    InvalidParameters(String),

    #[error("No input for {family} extraction")]
    EmptyInput { family: &'static str },

    #[error("Only {found} pitch estimates, need at least {required}")]
    InsufficientPitch { found: usize, required: usize },

    #[error("Non-finite values in {family} features")]
    NonFinite { family: &'static str },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration value: {field} = {value}")]
    InvalidValue { field: String, value: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: impl ToString) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssessError>;
