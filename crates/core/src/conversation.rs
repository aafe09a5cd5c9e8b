//! Conversation types: planner phases, turns and language preference

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::slot::SlotKey;

/// Question planner phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlannerPhase {
    /// Collecting the active intent's critical slots
    #[default]
    Intaking,
    /// Every critical slot is filled
    Ready,
    /// A composition has been produced for the current readiness event
    Composing,
}

static PHASE_TRANSITIONS: Lazy<HashMap<PlannerPhase, &'static [PlannerPhase]>> = Lazy::new(|| {
    use PlannerPhase::*;
    let mut map = HashMap::new();
    map.insert(Intaking, &[Ready] as &[_]);
    map.insert(Ready, &[Composing, Intaking] as &[_]);
    map.insert(Composing, &[Intaking, Ready] as &[_]);
    map
});

impl PlannerPhase {
    pub fn allowed_transitions(&self) -> &'static [PlannerPhase] {
        PHASE_TRANSITIONS.get(self).copied().unwrap_or(&[])
    }

    pub fn can_transition_to(&self, target: PlannerPhase) -> bool {
        *self == target || self.allowed_transitions().contains(&target)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlannerPhase::Intaking => "Intaking",
            PlannerPhase::Ready => "Ready",
            PlannerPhase::Composing => "Composing",
        }
    }
}

impl std::fmt::Display for PlannerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One question-answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub index: usize,
    /// Slot the preceding question targeted, if any
    pub asked: Option<SlotKey>,
    pub reply: String,
    pub at: DateTime<Utc>,
}

/// Append-only turn log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnLog {
    turns: Vec<Turn>,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a turn and return it
    pub fn record(&mut self, asked: Option<SlotKey>, reply: impl Into<String>) -> &Turn {
        let index = self.turns.len();
        self.turns.push(Turn {
            index,
            asked,
            reply: reply.into(),
            at: Utc::now(),
        });
        &self.turns[index]
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Raw replies, oldest first
    pub fn replies(&self) -> Vec<&str> {
        self.turns.iter().map(|t| t.reply.as_str()).collect()
    }

    /// Whether a question for `key` has ever been asked
    pub fn was_asked(&self, key: SlotKey) -> bool {
        self.turns.iter().any(|t| t.asked == Some(key))
    }
}

/// Preferred conversation language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Hindi,
    Hinglish,
}

impl Language {
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Hindi => "Hindi",
            Language::Hinglish => "Hinglish",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(PlannerPhase::Intaking.can_transition_to(PlannerPhase::Ready));
        assert!(!PlannerPhase::Intaking.can_transition_to(PlannerPhase::Composing));
        assert!(PlannerPhase::Ready.can_transition_to(PlannerPhase::Composing));
        assert!(PlannerPhase::Composing.can_transition_to(PlannerPhase::Intaking));
    }

    #[test]
    fn test_turn_log_is_indexed() {
        let mut log = TurnLog::new();
        log.record(None, "hello");
        log.record(Some(SlotKey::BusinessNature), "manufacturing");
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns()[1].index, 1);
        assert!(log.was_asked(SlotKey::BusinessNature));
        assert!(!log.was_asked(SlotKey::Location));
        assert_eq!(log.replies(), vec!["hello", "manufacturing"]);
    }
}
