//! Sticky intent classification
//!
//! Wraps [`IntentDetector`] with per-conversation state. Once an intent is
//! active, a re-classification only switches it when the new score strictly
//! exceeds the active one and the two intents require different critical
//! slots. An ambiguous follow-up ("yes", "2019") therefore never moves the
//! conversation off its intent.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use udyami_config::DomainConfig;
use udyami_core::{Intent, IntentConfidence, IntentKind, SlotKey};

use super::{DetectedIntent, IntentDetector};

/// Intent state carried across turns (part of the conversation snapshot)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentState {
    pub active: Option<Intent>,
    /// Score of the active intent; decays after each composition
    pub score: f32,
    /// A clarifying turn for an unclear intent has already been spent
    pub clarified: bool,
    /// Active intent is a fallback, not something the user asked for
    pub low_confidence: bool,
}

impl IntentState {
    /// Intent the planner should work against
    pub fn current(&self) -> Intent {
        self.active.clone().unwrap_or(Intent::Unclear)
    }
}

/// Outcome of one classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentDecision {
    pub intent: Intent,
    pub confidence: IntentConfidence,
    pub score: f32,
    /// The active intent changed this turn
    pub switched: bool,
    /// Intent is still unclear and this turn is the one clarifying attempt
    pub clarifying: bool,
}

/// Per-conversation intent classifier
pub struct IntentClassifier {
    detector: IntentDetector,
    domain: Arc<DomainConfig>,
}

impl IntentClassifier {
    pub fn new(domain: Arc<DomainConfig>) -> Self {
        Self {
            detector: IntentDetector::new(&domain),
            domain,
        }
    }

    pub fn detector(&self) -> &IntentDetector {
        &self.detector
    }

    /// Classify the latest utterance and update `state`
    ///
    /// `history` holds the earlier user replies, oldest first.
    pub fn classify(&self, state: &mut IntentState, history: &[&str], utterance: &str) -> IntentDecision {
        let detected = self.detector.detect_with_history(history, utterance);

        let Some(active) = state.active.clone() else {
            return self.first_intent(state, detected);
        };

        if detected.intent.is_unclear() {
            return self.keep(state, active);
        }

        if detected.intent.kind() == active.kind() {
            let mut intent = active;
            // A newly named scheme or platform replaces the old reference
            let explicit = match &detected.intent {
                Intent::CheckSchemeEligibility { .. } => self.detector.find_scheme(utterance).is_some(),
                Intent::MarketAccess { .. } => self.detector.find_platform(utterance).is_some(),
                _ => false,
            };
            let reference_changed = explicit && detected.intent != intent;
            if explicit {
                intent = detected.intent.clone();
            }
            state.score = state.score.max(detected.score);
            if IntentConfidence::from_score(detected.score) != IntentConfidence::Low {
                state.low_confidence = false;
            }
            state.active = Some(intent.clone());
            if reference_changed {
                tracing::info!(intent = %intent.label(), "Intent reference updated");
            }
            return IntentDecision {
                confidence: self.confidence_of(state),
                score: state.score,
                intent,
                switched: reference_changed,
                clarifying: false,
            };
        }

        let differs = self.critical_set(active.kind()) != self.critical_set(detected.intent.kind());
        if detected.score > state.score && differs {
            tracing::info!(
                from = %active.kind(),
                to = %detected.intent.kind(),
                score = detected.score,
                previous = state.score,
                "Intent switched"
            );
            state.active = Some(detected.intent.clone());
            state.score = detected.score;
            state.low_confidence = false;
            return IntentDecision {
                confidence: IntentConfidence::from_score(detected.score),
                score: detected.score,
                intent: detected.intent,
                switched: true,
                clarifying: false,
            };
        }

        tracing::debug!(
            active = %active.kind(),
            candidate = %detected.intent.kind(),
            score = detected.score,
            "Keeping active intent"
        );
        self.keep(state, active)
    }

    fn first_intent(&self, state: &mut IntentState, detected: DetectedIntent) -> IntentDecision {
        if detected.intent.is_unclear() {
            if !state.clarified {
                state.clarified = true;
                tracing::debug!(score = detected.score, "Intent unclear, asking a broader question");
                return IntentDecision {
                    intent: Intent::Unclear,
                    confidence: IntentConfidence::Low,
                    score: detected.score,
                    switched: false,
                    clarifying: true,
                };
            }
            return self.degrade(state);
        }

        tracing::info!(intent = %detected.intent.label(), score = detected.score, "Intent set");
        state.active = Some(detected.intent.clone());
        state.score = detected.score;
        state.low_confidence = false;
        IntentDecision {
            confidence: IntentConfidence::from_score(detected.score),
            score: detected.score,
            intent: detected.intent,
            switched: true,
            clarifying: false,
        }
    }

    /// Fall back to scheme discovery, flagged as low confidence
    pub fn degrade(&self, state: &mut IntentState) -> IntentDecision {
        tracing::info!("Intent still unclear, defaulting to scheme discovery");
        state.active = Some(Intent::DiscoverSchemes);
        state.score = 0.0;
        state.clarified = true;
        state.low_confidence = true;
        IntentDecision {
            intent: Intent::DiscoverSchemes,
            confidence: IntentConfidence::Low,
            score: 0.0,
            switched: true,
            clarifying: false,
        }
    }

    /// Lower the active score so a later explicit request can take over
    pub fn decay(&self, state: &mut IntentState, factor: f32) {
        state.score *= factor.clamp(0.0, 1.0);
    }

    fn keep(&self, state: &IntentState, active: Intent) -> IntentDecision {
        IntentDecision {
            intent: active,
            confidence: self.confidence_of(state),
            score: state.score,
            switched: false,
            clarifying: false,
        }
    }

    fn confidence_of(&self, state: &IntentState) -> IntentConfidence {
        if state.low_confidence {
            IntentConfidence::Low
        } else {
            IntentConfidence::from_score(state.score)
        }
    }

    fn critical_set(&self, kind: IntentKind) -> BTreeSet<SlotKey> {
        self.domain.critical_slots(kind).into_iter().collect()
    }
}
