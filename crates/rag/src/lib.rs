//! Scheme retrieval
//!
//! Features:
//! - Retrieval gate: when to retrieve, what to ask for, when to escalate
//! - Timeout- and cancellation-bounded execution with at most one
//!   freshness escalation
//! - In-memory keyword index over a YAML scheme corpus
//! - HTTP client for an external knowledge service
//! - Knowledge file loading (YAML/JSON)

pub mod executor;
pub mod gate;
pub mod http;
pub mod index;
pub mod knowledge_loader;

pub use executor::{CancelHandle, CancelToken, RetrievalExecutor, RetrievalOutcome};
pub use gate::RetrievalGate;
pub use http::{HttpKnowledgeConfig, HttpKnowledgeService};
pub use index::InMemorySchemeIndex;
pub use knowledge_loader::{KnowledgeLoader, SchemeCorpus};

use thiserror::Error;

/// Retrieval errors
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Knowledge file error: {0}")]
    Index(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Knowledge service returned {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Malformed knowledge service response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl From<RagError> for udyami_core::Error {
    fn from(err: RagError) -> Self {
        match err {
            RagError::Index(msg) => udyami_core::Error::Config(msg),
            other => udyami_core::Error::RetrievalUnavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_errors_map_to_unavailable() {
        let err: udyami_core::Error = RagError::Service {
            status: 503,
            body: "down".into(),
        }
        .into();
        assert!(matches!(err, udyami_core::Error::RetrievalUnavailable(_)));

        let err: udyami_core::Error = RagError::Index("bad yaml".into()).into();
        assert!(matches!(err, udyami_core::Error::Config(_)));
    }
}
