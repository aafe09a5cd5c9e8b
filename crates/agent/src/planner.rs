//! Question planner
//!
//! Chooses the single next question for the active intent, or declares the
//! profile ready for composition. Phases move
//! `Intaking → Ready → Composing`, and back to `Intaking` when a new intent
//! needs slots the profile does not have yet.
//!
//! Priority within `Intaking`:
//! 1. A slot with an open conflict ("I want to double-check ...")
//! 2. One follow-up on a slot whose answer was vague
//! 3. Name and age, once, before intake starts
//! 4. The first missing critical slot in canonical order

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use udyami_config::{DomainConfig, EngineConfig};
use udyami_core::{Intent, PlannerPhase, Profile, QuestionPrompt, SlotKey, SlotValue};

/// Opening used while the intent is still unclear
const BROAD_PREFACE: &str = "I can help you find government schemes, check eligibility for a specific scheme, \
     list documents, recover delayed payments or sell on GeM/ONDC.";

/// Planner state carried across turns (part of the conversation snapshot)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerState {
    pub phase: PlannerPhase,
    /// Slot targeted by the last question
    pub last_asked: Option<SlotKey>,
    /// Slots that already had their one clarifying follow-up
    pub clarified: BTreeSet<SlotKey>,
    /// Personalization slots already asked
    pub personalized: BTreeSet<SlotKey>,
    /// A core question has been asked
    pub intake_started: bool,
    /// User asked for a quick answer
    pub speed_mode: bool,
    /// Slots still allowed in quick mode for one intent
    pub speed_budget: Option<SpeedBudget>,
    /// Intent of the last composition
    pub composed_for: Option<Intent>,
    pub compositions: usize,
}

/// Quick-mode question allowance, fixed per intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedBudget {
    pub intent: Intent,
    pub slots: Vec<SlotKey>,
}

/// What the planner wants to happen this turn
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Ask one question
    Ask {
        prompt: QuestionPrompt,
        approximate: bool,
    },
    /// Every critical slot is filled; retrieve and compose
    Ready {
        approximate: bool,
        /// Critical slots left unasked in quick mode
        skipped: Vec<SlotKey>,
    },
    /// Nothing changed since the last composition
    Acknowledge,
}

impl Plan {
    pub fn asked_slot(&self) -> Option<SlotKey> {
        match self {
            Plan::Ask { prompt, .. } => Some(prompt.slot),
            _ => None,
        }
    }
}

/// Per-turn signals the planner needs besides the profile
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanInput {
    /// Intent is unclear and this turn is the one clarifying attempt
    pub clarifying: bool,
    /// The profile or the intent changed this turn
    pub changed: bool,
}

/// Question planner
pub struct QuestionPlanner {
    domain: Arc<DomainConfig>,
    speed_mode_cap: usize,
    personalization: bool,
}

impl QuestionPlanner {
    pub fn new(domain: Arc<DomainConfig>, config: &EngineConfig) -> Self {
        Self {
            domain,
            speed_mode_cap: config.speed_mode_cap,
            personalization: config.personalization,
        }
    }

    /// Plan the next step for `intent`
    pub fn plan(&self, state: &mut PlannerState, intent: &Intent, profile: &Profile, input: PlanInput) -> Plan {
        let critical = self.domain.critical_for(intent);
        let plan = self.choose(state, intent, &critical, profile, input);

        let next = match &plan {
            Plan::Ask { .. } => PlannerPhase::Intaking,
            Plan::Ready { .. } => PlannerPhase::Ready,
            Plan::Acknowledge => state.phase,
        };
        self.transition(state, next);

        state.last_asked = plan.asked_slot();
        if let Some(slot) = state.last_asked {
            if slot.is_personalization() {
                state.personalized.insert(slot);
            } else {
                state.intake_started = true;
            }
        }
        plan
    }

    fn choose(
        &self,
        state: &mut PlannerState,
        intent: &Intent,
        critical: &[SlotKey],
        profile: &Profile,
        input: PlanInput,
    ) -> Plan {
        let approximate = state.speed_mode;

        if let Some(key) = profile.pending_reconfirmation().first().copied() {
            return Plan::Ask {
                prompt: self.reconfirmation(key, critical, profile),
                approximate,
            };
        }

        if let Some(key) = self.follow_up(state, profile) {
            state.clarified.insert(key);
            return Plan::Ask {
                prompt: self.question(key, critical, true, input.clarifying),
                approximate,
            };
        }

        if let Some(key) = self.personalization_slot(state, profile) {
            return Plan::Ask {
                prompt: self.question(key, critical, false, input.clarifying),
                approximate,
            };
        }

        let mut missing = profile.missing_of(critical);
        let mut skipped = Vec::new();
        if state.speed_mode {
            // A new intent gets its own allowance for the slots it still lacks
            if state.speed_budget.as_ref().map(|b| &b.intent) != Some(intent) {
                state.speed_budget = Some(SpeedBudget {
                    intent: intent.clone(),
                    slots: missing.iter().copied().take(self.speed_mode_cap).collect(),
                });
            }
            let budget = state.speed_budget.as_ref().map(|b| b.slots.as_slice()).unwrap_or_default();
            skipped = missing.iter().copied().filter(|k| !budget.contains(k)).collect();
            missing.retain(|k| budget.contains(k));
        }

        if let Some(key) = missing.first().copied() {
            // Re-asking a slot whose answer was not understood adds its clarifier once
            let repeat = state.last_asked == Some(key) && !state.clarified.contains(&key);
            if repeat {
                state.clarified.insert(key);
            }
            return Plan::Ask {
                prompt: self.question(key, critical, repeat, input.clarifying),
                approximate,
            };
        }

        let same_intent = state.composed_for.as_ref() == Some(intent);
        if state.phase == PlannerPhase::Composing && same_intent && !input.changed {
            return Plan::Acknowledge;
        }
        Plan::Ready {
            approximate: approximate && !skipped.is_empty(),
            skipped,
        }
    }

    /// The slot just answered was vague, or a vague stub was volunteered
    fn follow_up(&self, state: &PlannerState, profile: &Profile) -> Option<SlotKey> {
        if state.speed_mode {
            return None;
        }
        let open = |key: &SlotKey| profile.get(*key).needs_clarification && !state.clarified.contains(key);

        if let Some(key) = state.last_asked.filter(open) {
            return Some(key);
        }
        SlotKey::ALL
            .iter()
            .copied()
            .filter(open)
            .find(|k| matches!(profile.value(*k), Some(SlotValue::Qualitative(_))))
    }

    fn personalization_slot(&self, state: &PlannerState, profile: &Profile) -> Option<SlotKey> {
        if !self.personalization || state.speed_mode || state.intake_started || profile.core_filled_count() > 0 {
            return None;
        }
        SlotKey::PERSONALIZATION
            .iter()
            .copied()
            .find(|k| !profile.get(*k).is_filled() && !state.personalized.contains(k))
    }

    fn title(&self, key: SlotKey) -> String {
        self.domain
            .prompt(key)
            .map(|p| p.title.clone())
            .unwrap_or_else(|| key.display_name().to_string())
    }

    fn header(&self, key: SlotKey, critical: &[SlotKey]) -> String {
        match critical.iter().position(|k| *k == key) {
            Some(pos) => format!("Question {} of {} – {}", pos + 1, critical.len(), self.title(key)),
            None => self.title(key),
        }
    }

    fn question(&self, key: SlotKey, critical: &[SlotKey], clarify: bool, broaden: bool) -> QuestionPrompt {
        let prompt = self.domain.prompt(key);
        let base = prompt
            .map(|p| p.question.clone())
            .unwrap_or_else(|| format!("Could you tell me your {}?", key.display_name().to_lowercase()));
        let text = if broaden {
            format!("{} {}", BROAD_PREFACE, base)
        } else {
            base
        };
        QuestionPrompt {
            slot: key,
            header: self.header(key, critical),
            text,
            clarifier: if clarify { prompt.and_then(|p| p.clarifier.clone()) } else { None },
            reconfirmation: false,
        }
    }

    fn reconfirmation(&self, key: SlotKey, critical: &[SlotKey], profile: &Profile) -> QuestionPrompt {
        let slot = profile.get(key);
        let earlier = slot.describe();
        let incoming = slot
            .pending
            .as_ref()
            .map(|p| p.value.describe())
            .unwrap_or_else(|| "something different".to_string());
        QuestionPrompt {
            slot: key,
            header: self.header(key, critical),
            text: format!(
                "I want to double-check your {}: earlier you said \"{}\", and now \"{}\". Which one is correct?",
                self.title(key).to_lowercase(),
                earlier,
                incoming
            ),
            clarifier: None,
            reconfirmation: true,
        }
    }

    /// Record that a composition was produced for `intent`
    pub fn mark_composed(&self, state: &mut PlannerState, intent: &Intent) {
        self.transition(state, PlannerPhase::Composing);
        state.composed_for = Some(intent.clone());
        state.compositions += 1;
    }

    fn transition(&self, state: &mut PlannerState, next: PlannerPhase) {
        if state.phase == next {
            return;
        }
        if !state.phase.can_transition_to(next) {
            tracing::debug!(from = %state.phase, to = %next, "Skipping planner phase transition");
            return;
        }
        tracing::info!(from = %state.phase, to = %next, "Planner phase changed");
        state.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udyami_core::{
        AmountBand, BusinessNature, CollateralStatus, Confidence, FinancePurpose, FinanceRequirement,
        Location, OwnershipCategory, RegistrationStatus, LAKH,
    };

    fn planner() -> QuestionPlanner {
        QuestionPlanner::new(Arc::new(DomainConfig::default()), &EngineConfig::default())
    }

    fn fill(profile: &mut Profile, key: SlotKey, value: SlotValue) {
        let slot = profile.get_mut(key);
        slot.value = Some(value);
        slot.confidence = Confidence::Confirmed;
    }

    fn eligibility_profile() -> Profile {
        let mut p = Profile::new();
        fill(&mut p, SlotKey::BusinessNature, SlotValue::Nature(BusinessNature::Manufacturing));
        fill(&mut p, SlotKey::BusinessAge, SlotValue::StartYear(2019));
        fill(&mut p, SlotKey::TurnoverBand, SlotValue::Band(AmountBand::from_amount(80 * LAKH)));
        fill(
            &mut p,
            SlotKey::RegistrationStatus,
            SlotValue::Registration(RegistrationStatus {
                udyam: Some(true),
                gst: Some(true),
            }),
        );
        fill(
            &mut p,
            SlotKey::FinanceRequirement,
            SlotValue::Finance(FinanceRequirement {
                purpose: Some(FinancePurpose::MachineryTermLoan),
                amount: Some(AmountBand::from_amount(20 * LAKH)),
            }),
        );
        fill(
            &mut p,
            SlotKey::CollateralStatus,
            SlotValue::Collateral(CollateralStatus {
                has_collateral: Some(false),
                existing_loans: Some(false),
                repayment_issues: Some(false),
            }),
        );
        p
    }

    fn cgtmse() -> Intent {
        Intent::CheckSchemeEligibility {
            scheme: "CGTMSE".into(),
        }
    }

    #[test]
    fn test_personalization_first_then_core_order() {
        let planner = planner();
        let mut state = PlannerState::default();
        let mut profile = Profile::new();

        let plan = planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, PlanInput::default());
        assert_eq!(plan.asked_slot(), Some(SlotKey::Name));
        let plan = planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, PlanInput::default());
        assert_eq!(plan.asked_slot(), Some(SlotKey::Age));

        fill(&mut profile, SlotKey::Age, SlotValue::Years(34));
        let plan = planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, PlanInput::default());
        assert_eq!(plan.asked_slot(), Some(SlotKey::BusinessNature));
        match plan {
            Plan::Ask { prompt, .. } => {
                assert_eq!(prompt.header, "Question 1 of 8 – Nature of business");
                assert!(prompt.clarifier.is_none());
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(state.phase, PlannerPhase::Intaking);
    }

    #[test]
    fn test_narrow_intent_ready_without_location_or_category() {
        let planner = planner();
        let mut state = PlannerState::default();
        let profile = eligibility_profile();
        assert!(!profile.get(SlotKey::Location).is_filled());

        let plan = planner.plan(&mut state, &cgtmse(), &profile, PlanInput::default());
        assert!(matches!(plan, Plan::Ready { approximate: false, .. }));
        assert_eq!(state.phase, PlannerPhase::Ready);

        // The broad intent still needs location and ownership category
        let mut state = PlannerState::default();
        let plan = planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, PlanInput::default());
        assert_eq!(plan.asked_slot(), Some(SlotKey::Location));
    }

    #[test]
    fn test_header_counts_against_active_intent() {
        let planner = planner();
        let mut state = PlannerState::default();
        let mut profile = eligibility_profile();
        profile.get_mut(SlotKey::CollateralStatus).value = None;
        profile.get_mut(SlotKey::CollateralStatus).confidence = Confidence::Unset;

        match planner.plan(&mut state, &cgtmse(), &profile, PlanInput::default()) {
            Plan::Ask { prompt, .. } => assert_eq!(prompt.header, "Question 6 of 6 – Collateral & existing loans"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_reconfirmation_comes_first() {
        let planner = planner();
        let mut state = PlannerState::default();
        let mut profile = eligibility_profile();
        let slot = profile.get_mut(SlotKey::TurnoverBand);
        slot.needs_reconfirmation = true;
        slot.pending = Some(udyami_core::PendingValue {
            value: SlotValue::Band(AmountBand::from_amount(300 * LAKH)),
            confidence: Confidence::Confirmed,
            evidence: "3 crore".into(),
        });

        match planner.plan(&mut state, &cgtmse(), &profile, PlanInput::default()) {
            Plan::Ask { prompt, .. } => {
                assert_eq!(prompt.slot, SlotKey::TurnoverBand);
                assert!(prompt.reconfirmation);
                assert!(prompt.text.starts_with("I want to double-check"));
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_vague_answer_gets_one_follow_up() {
        let planner = planner();
        let mut state = PlannerState {
            last_asked: Some(SlotKey::TurnoverBand),
            intake_started: true,
            ..Default::default()
        };
        let mut profile = Profile::new();
        fill(&mut profile, SlotKey::BusinessNature, SlotValue::Nature(BusinessNature::Services));
        let slot = profile.get_mut(SlotKey::TurnoverBand);
        slot.value = Some(SlotValue::Qualitative("decent".into()));
        slot.confidence = Confidence::Inferred;
        slot.needs_clarification = true;

        match planner.plan(&mut state, &Intent::GeneralAdvice, &profile, PlanInput::default()) {
            Plan::Ask { prompt, .. } => {
                assert_eq!(prompt.slot, SlotKey::TurnoverBand);
                assert!(prompt.clarifier.is_some());
            },
            other => panic!("unexpected {:?}", other),
        }

        // Second time round the stub no longer blocks readiness
        let plan = planner.plan(&mut state, &Intent::GeneralAdvice, &profile, PlanInput::default());
        assert!(matches!(plan, Plan::Ready { .. }));
    }

    #[test]
    fn test_speed_mode_caps_questions() {
        let planner = planner();
        let mut state = PlannerState {
            speed_mode: true,
            ..Default::default()
        };
        let mut profile = Profile::new();

        let mut asked = Vec::new();
        loop {
            match planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, PlanInput::default()) {
                Plan::Ask { prompt, approximate } => {
                    assert!(approximate);
                    asked.push(prompt.slot);
                    let value = match prompt.slot {
                        SlotKey::BusinessNature => SlotValue::Nature(BusinessNature::Trading),
                        SlotKey::BusinessAge => SlotValue::StartYear(2020),
                        SlotKey::TurnoverBand => SlotValue::Band(AmountBand::from_amount(30 * LAKH)),
                        other => panic!("unexpected question for {}", other),
                    };
                    fill(&mut profile, prompt.slot, value);
                },
                Plan::Ready { approximate, skipped } => {
                    assert!(approximate);
                    assert!(skipped.contains(&SlotKey::Location));
                    break;
                },
                Plan::Acknowledge => panic!("nothing composed yet"),
            }
        }
        assert_eq!(
            asked,
            vec![SlotKey::BusinessNature, SlotKey::BusinessAge, SlotKey::TurnoverBand]
        );
    }

    #[test]
    fn test_speed_budget_renewed_on_intent_switch() {
        let planner = planner();
        let mut state = PlannerState {
            speed_mode: true,
            ..Default::default()
        };
        let mut profile = Profile::new();
        while let Plan::Ask { prompt, .. } =
            planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, PlanInput::default())
        {
            let value = match prompt.slot {
                SlotKey::BusinessNature => SlotValue::Nature(BusinessNature::Manufacturing),
                SlotKey::BusinessAge => SlotValue::StartYear(2020),
                SlotKey::TurnoverBand => SlotValue::Band(AmountBand::from_amount(30 * LAKH)),
                other => panic!("unexpected question for {}", other),
            };
            fill(&mut profile, prompt.slot, value);
        }
        planner.mark_composed(&mut state, &Intent::DiscoverSchemes);

        let gem = Intent::MarketAccess {
            platform: "GeM".into(),
        };
        let switched = PlanInput {
            changed: true,
            ..Default::default()
        };
        let plan = planner.plan(&mut state, &gem, &profile, switched);
        assert_eq!(plan.asked_slot(), Some(SlotKey::ProductDescription));
        assert_eq!(state.speed_budget.as_ref().map(|b| &b.intent), Some(&gem));

        fill(&mut profile, SlotKey::ProductDescription, SlotValue::Text("steel utensils".into()));
        let plan = planner.plan(&mut state, &gem, &profile, PlanInput::default());
        assert_eq!(plan.asked_slot(), Some(SlotKey::RegistrationStatus));

        fill(
            &mut profile,
            SlotKey::RegistrationStatus,
            SlotValue::Registration(RegistrationStatus {
                udyam: Some(true),
                gst: Some(true),
            }),
        );
        match planner.plan(&mut state, &gem, &profile, PlanInput::default()) {
            Plan::Ready { approximate, skipped } => {
                assert!(!approximate);
                assert!(skipped.is_empty());
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_acknowledge_then_reenter_for_new_intent() {
        let planner = planner();
        let mut state = PlannerState::default();
        let mut profile = eligibility_profile();

        assert!(matches!(
            planner.plan(&mut state, &cgtmse(), &profile, PlanInput::default()),
            Plan::Ready { .. }
        ));
        planner.mark_composed(&mut state, &cgtmse());
        assert_eq!(state.phase, PlannerPhase::Composing);

        let plan = planner.plan(&mut state, &cgtmse(), &profile, PlanInput::default());
        assert_eq!(plan, Plan::Acknowledge);

        // Discovery needs location and ownership: back to intake for the delta
        let switched = PlanInput {
            changed: true,
            ..Default::default()
        };
        let plan = planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, switched);
        assert_eq!(plan.asked_slot(), Some(SlotKey::Location));
        assert_eq!(state.phase, PlannerPhase::Intaking);

        fill(
            &mut profile,
            SlotKey::Location,
            SlotValue::Location(Location {
                state: Some("Maharashtra".into()),
                district: Some("Pune".into()),
            }),
        );
        fill(
            &mut profile,
            SlotKey::OwnershipCategory,
            SlotValue::Ownership([OwnershipCategory::Women].into_iter().collect()),
        );
        let plan = planner.plan(&mut state, &Intent::DiscoverSchemes, &profile, switched);
        assert!(matches!(plan, Plan::Ready { .. }));
    }

    #[test]
    fn test_unclear_intent_asks_broader_question() {
        let planner = planner();
        let mut state = PlannerState {
            intake_started: true,
            ..Default::default()
        };
        let input = PlanInput {
            clarifying: true,
            changed: false,
        };
        match planner.plan(&mut state, &Intent::Unclear, &Profile::new(), input) {
            Plan::Ask { prompt, .. } => {
                assert_eq!(prompt.slot, SlotKey::BusinessNature);
                assert!(prompt.text.starts_with(BROAD_PREFACE));
                assert_eq!(prompt.header, "Question 1 of 8 – Nature of business");
            },
            other => panic!("unexpected {:?}", other),
        }
    }
}
