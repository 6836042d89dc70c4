//! Error taxonomy for the orchestration pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Validation failure with field path and constraint description.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"electrolyzer.rating"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every failure the pipeline can surface. Nothing is retried; the first
/// error aborts the run.
#[derive(Debug, Error)]
pub enum PlantError {
    #[error("config not found: \"{}\": {source}", .path.display())]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config \"{origin}\": {message}")]
    ConfigParseError { origin: String, message: String },

    #[error("missing required config: {what}")]
    MissingRequiredConfig { what: String },

    #[error("invalid config: {}", join_errors(.0))]
    InvalidConfig(Vec<ConfigError>),

    #[error("simulation failed: {0}")]
    SimulationFailure(String),

    #[error("unknown result key \"{key}\"")]
    UnknownResultKey { key: String },

    #[error("result \"{key}\" holds {len} values, not a single scalar")]
    NotScalar { key: String, len: usize },

    #[error("cannot convert \"{from}\" to \"{to}\": {reason}")]
    UnitConversionError {
        from: String,
        to: String,
        reason: String,
    },

    #[error("invalid scenario manifest \"{}\": {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("cannot write \"{}\": {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PlantError {
    pub(crate) fn missing(what: impl Into<String>) -> Self {
        Self::MissingRequiredConfig { what: what.into() }
    }

    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig(vec![ConfigError::new(field, message)])
    }
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PlantError>;
