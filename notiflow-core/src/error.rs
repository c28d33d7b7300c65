//! Error types for the NotiFlow engine.

use thiserror::Error;

/// Errors that can occur in NotiFlow operations.
///
/// `Parse` and `MissingField` are scoped to a single record and are collected
/// as skips by a sync run. `Upstream` is the only variant that aborts a run.
#[derive(Error, Debug)]
pub enum NotiflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Calendar storage unreadable: {0}")]
    StorageCorrupt(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("ICS generation error: {0}")]
    IcsGenerate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl NotiflowError {
    /// Whether this error only affects the record being processed.
    pub fn is_record_scoped(&self) -> bool {
        matches!(self, NotiflowError::Parse(_) | NotiflowError::MissingField(_))
    }
}

impl From<serde_json::Error> for NotiflowError {
    fn from(err: serde_json::Error) -> Self {
        NotiflowError::Serialization(err.to_string())
    }
}

/// Result type alias for NotiFlow operations.
pub type NotiflowResult<T> = Result<T, NotiflowError>;
