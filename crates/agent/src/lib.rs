//! Dialogue engine for the MSME scheme navigator
//!
//! Features:
//! - Slot store with refinement, contradiction and reconfirmation rules
//! - Question planner: one question per turn, intent-conditioned
//! - Response composer: profile block, grouped schemes, assessment,
//!   documents, guidance and caveats
//! - Conversation engine with bounded, cancellable retrieval and
//!   versioned snapshots

pub mod composer;
pub mod conversation;
pub mod dst;
pub mod planner;

pub use composer::{
    CompositionRequest, ResponseComposer, ScenarioComparison, SchemeData, SchemeFit, TurnContext, UserSegment,
};
pub use conversation::{
    Conversation, ConversationEngine, ConversationEvent, ConversationSnapshot, SNAPSHOT_VERSION,
};
pub use dst::{ApplyReport, SetOutcome, SlotStore};
pub use planner::{Plan, PlanInput, PlannerState, QuestionPlanner, SpeedBudget};

pub use udyami_rag::CancelHandle;

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Conversation error: {0}")]
    Conversation(String),
}

impl AgentError {
    /// Caller error rather than an engine failure
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, AgentError::InvalidInput(_))
    }
}

impl From<udyami_core::Error> for AgentError {
    fn from(err: udyami_core::Error) -> Self {
        match err {
            udyami_core::Error::InvalidInput(msg) => AgentError::InvalidInput(msg),
            udyami_core::Error::Snapshot(msg) => AgentError::Snapshot(msg),
            udyami_core::Error::Config(msg) => AgentError::Config(msg),
            e @ (udyami_core::Error::RetrievalTimeout { .. } | udyami_core::Error::RetrievalUnavailable(_)) => {
                AgentError::Retrieval(e.to_string())
            },
            other => AgentError::Conversation(other.to_string()),
        }
    }
}

impl From<udyami_config::ConfigError> for AgentError {
    fn from(err: udyami_config::ConfigError) -> Self {
        AgentError::Config(err.to_string())
    }
}

impl From<udyami_rag::RagError> for AgentError {
    fn from(err: udyami_rag::RagError) -> Self {
        AgentError::Retrieval(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;
    use udyami_core::SlotKey;

    #[test]
    fn test_core_error_mapping() {
        let err: AgentError = udyami_core::Error::InvalidInput("empty".into()).into();
        assert!(err.is_invalid_input());

        let err: AgentError = udyami_core::Error::RetrievalTimeout { timeout_ms: 10 }.into();
        assert!(matches!(err, AgentError::Retrieval(_)));

        let err: AgentError = udyami_core::Error::ExtractionAmbiguous {
            slot: SlotKey::TurnoverBand,
            span: "decent".into(),
        }
        .into();
        assert!(matches!(err, AgentError::Conversation(_)));
    }
}
