//! Error taxonomy shared by every layer of the engine

use thiserror::Error;

use crate::slot::SlotKey;

/// Engine errors
///
/// Only `InvalidInput` and `Snapshot` are expected to reach a caller of the
/// conversation engine; the remaining variants are raised by individual
/// components and recovered before a turn completes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Conflicting value for {slot}: had '{existing}', got '{incoming}'")]
    Conflict {
        slot: SlotKey,
        existing: String,
        incoming: String,
    },

    #[error("Ambiguous answer for {slot}: '{span}'")]
    ExtractionAmbiguous { slot: SlotKey, span: String },

    #[error("Retrieval timed out after {timeout_ms}ms")]
    RetrievalTimeout { timeout_ms: u64 },

    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    #[error("Intent could not be determined")]
    IntentAmbiguous,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error must be surfaced to the caller rather than
    /// degraded into a clarifying question or caveat.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::InvalidInput(_) | Error::Snapshot(_) | Error::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Snapshot(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
