//! Slot value extraction
//!
//! Rule-based extraction of profile slots from a single user reply. A reply
//! may answer several slots at once ("manufacturing, started 2021, turnover
//! 80 lakh"), so the engine returns every update it finds and leaves
//! readiness decisions to the planner.
//!
//! ## Pipeline
//!
//! 1. Normalize: drop fillers, collapse repeats, spelled-out numbers to digits
//! 2. Utterance recognizers: nature, registration, collateral, location,
//!    ownership, name
//! 3. Span recognizers: product, business age, age, amounts (turnover or
//!    finance by nearest cue), finance purpose, vague turnover
//! 4. Vague stub for the slot asked when nothing concrete answered it
//! 5. Merge updates per slot
//!
//! All patterns are compiled once with `once_cell::sync::Lazy`.

mod recognizers;

use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

use udyami_core::{
    ContradictionPolicy, Error, Profile, Result, SlotKey, SlotUpdate, SlotValue, ValueRelation,
};

use crate::amount::find_amounts;
use crate::normalize::{normalize, split_spans};
use recognizers::{AmountTarget, Context};

/// Text that matched a pattern but could not be turned into a confident value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ambiguity {
    /// Slot it most likely belongs to, if any
    pub slot: Option<SlotKey>,
    pub span: String,
    pub reason: String,
}

impl Ambiguity {
    fn new(slot: Option<SlotKey>, span: impl Into<String>, reason: &str) -> Self {
        Self {
            slot,
            span: span.into(),
            reason: reason.to_string(),
        }
    }

    /// Soft error form, for slots the ambiguity can be pinned to
    pub fn to_error(&self) -> Option<Error> {
        self.slot.map(|slot| Error::ExtractionAmbiguous {
            slot,
            span: self.span.clone(),
        })
    }
}

/// Result of one extraction call
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// At most one update per slot, in canonical slot order
    pub updates: Vec<SlotUpdate>,
    pub ambiguities: Vec<Ambiguity>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    pub fn get(&self, key: SlotKey) -> Option<&SlotUpdate> {
        self.updates.iter().find(|u| u.key == key)
    }

    pub fn keys(&self) -> Vec<SlotKey> {
        self.updates.iter().map(|u| u.key).collect()
    }
}

/// Extraction engine
pub struct ExtractionEngine {
    /// Year used to resolve "5 years old" and "just started"
    reference_year: i32,
    policy: ContradictionPolicy,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionEngine {
    pub fn new() -> Self {
        Self {
            reference_year: chrono::Utc::now().year(),
            policy: ContradictionPolicy::default(),
        }
    }

    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    pub fn with_policy(mut self, policy: ContradictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Extract slot updates from an utterance with no question context
    pub fn extract(&self, utterance: &str, profile: &Profile) -> Result<Extraction> {
        self.extract_answer(utterance, profile, None)
    }

    /// Extract slot updates from a reply to a question about `expected`.
    ///
    /// The expected slot lets bare replies ("2019", "yes", "Kolhapur") land
    /// on the slot that was asked; everything else is recognized the same
    /// way as in [`extract`](Self::extract).
    pub fn extract_answer(
        &self,
        utterance: &str,
        profile: &Profile,
        expected: Option<SlotKey>,
    ) -> Result<Extraction> {
        if utterance.trim().is_empty() {
            return Err(Error::InvalidInput("utterance is empty".to_string()));
        }

        let normalized = normalize(utterance);
        let lower = normalized.to_lowercase();
        let ctx = Context {
            expected,
            reference_year: self.reference_year,
            profile,
        };

        let mut updates: Vec<SlotUpdate> = Vec::new();
        let mut ambiguities = Vec::new();

        updates.extend(recognizers::nature(&lower, &ctx));
        updates.extend(recognizers::registration(&lower, &ctx));
        updates.extend(recognizers::collateral(&lower, &ctx));
        updates.extend(recognizers::location(&lower, &ctx));
        updates.extend(recognizers::ownership(&lower, &ctx));
        updates.extend(recognizers::name(&normalized, &ctx));

        let mut carry: Option<AmountTarget> = None;
        for span in split_spans(&normalized) {
            let span_lower = span.to_lowercase();
            updates.extend(recognizers::product(&span, &ctx));
            updates.extend(recognizers::business_age(&span_lower, &ctx));
            updates.extend(recognizers::age(&span_lower, &ctx));

            let mentions = find_amounts(&span_lower);
            if mentions.is_empty() {
                updates.extend(recognizers::vague_turnover(&span_lower, &ctx));
                updates.extend(recognizers::finance(&span_lower, None, &ctx));
                carry = recognizers::dangling_cue(&span_lower);
                continue;
            }

            let mut finance_amount = None;
            for (mention, target) in recognizers::attribute_amounts(&span_lower, &mentions, carry, &ctx) {
                match target {
                    Some(AmountTarget::Turnover) => {
                        updates.push(recognizers::turnover(&mention, &span_lower));
                    },
                    Some(AmountTarget::Finance) => {
                        finance_amount.get_or_insert(mention);
                    },
                    None => {
                        tracing::debug!(span = %span, "Amount without turnover or finance cue");
                        ambiguities.push(Ambiguity::new(
                            None,
                            span.as_str(),
                            "amount without a turnover or finance cue",
                        ));
                    },
                }
            }
            updates.extend(recognizers::finance(&span_lower, finance_amount.as_ref(), &ctx));
            carry = None;
        }

        if expected == Some(SlotKey::ProductDescription)
            && !updates.iter().any(|u| u.key == SlotKey::ProductDescription)
        {
            updates.extend(recognizers::product_answer(&normalized));
        }

        // Only a reply that said nothing concrete about anything, to a slot still empty
        if let Some(key) = expected {
            if updates.is_empty() && profile.value(key).is_none() {
                updates.extend(recognizers::vague_answer(&lower, key));
            }
        }

        let updates = merge_updates(updates, &self.policy);

        for update in &updates {
            if matches!(update.value, SlotValue::Qualitative(_)) {
                ambiguities.push(Ambiguity::new(
                    Some(update.key),
                    update.evidence.as_str(),
                    "vague answer",
                ));
            }
            tracing::debug!(
                slot = %update.key,
                confidence = ?update.confidence,
                clarify = update.needs_clarification,
                "Slot candidate"
            );
        }
        if let Some(key) = expected {
            if !updates.iter().any(|u| u.key == key) {
                ambiguities.push(Ambiguity::new(
                    Some(key),
                    normalized.as_str(),
                    "no answer recognized for the question asked",
                ));
            }
        }

        tracing::debug!(
            updates = updates.len(),
            ambiguities = ambiguities.len(),
            expected = ?expected,
            "Extraction complete"
        );

        Ok(Extraction {
            updates,
            ambiguities,
        })
    }
}

/// Fold updates for the same slot: refinements merge, a contradiction
/// inside one reply resolves to the later statement
fn merge_updates(updates: Vec<SlotUpdate>, policy: &ContradictionPolicy) -> Vec<SlotUpdate> {
    let mut merged: BTreeMap<SlotKey, SlotUpdate> = BTreeMap::new();
    for update in updates {
        let combined = match merged.remove(&update.key) {
            Some(prev) => combine(prev, update, policy),
            None => update,
        };
        merged.insert(combined.key, combined);
    }
    merged.into_values().collect()
}

fn combine(prev: SlotUpdate, next: SlotUpdate, policy: &ContradictionPolicy) -> SlotUpdate {
    let confidence = prev.confidence.max(next.confidence);
    let evidence = if prev.evidence == next.evidence {
        prev.evidence.clone()
    } else {
        format!("{} | {}", prev.evidence, next.evidence)
    };

    match prev.value.relation(&next.value, policy) {
        ValueRelation::Same => SlotUpdate {
            confidence,
            evidence,
            ..prev
        },
        ValueRelation::Refines => {
            let value = prev.value.merge(&next.value);
            let needs_clarification =
                value.is_partial() || (prev.needs_clarification && next.needs_clarification);
            SlotUpdate {
                key: prev.key,
                value,
                confidence,
                evidence,
                needs_clarification,
            }
        },
        ValueRelation::Contradicts => SlotUpdate { evidence, ..next },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use udyami_core::{
        AmountBand, BusinessNature, Confidence, FinancePurpose, Location, OwnershipCategory,
        RegistrationStatus, CRORE, LAKH,
    };

    fn engine() -> ExtractionEngine {
        ExtractionEngine::new().with_reference_year(2025)
    }

    const SCENARIO: &str = "manufacturing, started 2021, turnover 80 lakh, Udyam yes GST no, \
         need 20 lakh for machinery, no collateral, Pune Maharashtra, general category";

    #[test]
    fn test_multi_fact_message_fills_eight_core_slots() {
        let profile = Profile::new();
        let extraction = engine().extract(SCENARIO, &profile).unwrap();
        let keys = extraction.keys();

        assert_eq!(
            keys,
            vec![
                SlotKey::BusinessNature,
                SlotKey::BusinessAge,
                SlotKey::TurnoverBand,
                SlotKey::RegistrationStatus,
                SlotKey::FinanceRequirement,
                SlotKey::CollateralStatus,
                SlotKey::Location,
                SlotKey::OwnershipCategory,
            ]
        );

        let get = |k| extraction.get(k).unwrap().value.clone();
        assert_eq!(get(SlotKey::BusinessNature), SlotValue::Nature(BusinessNature::Manufacturing));
        assert_eq!(get(SlotKey::BusinessAge), SlotValue::StartYear(2021));
        assert_eq!(get(SlotKey::TurnoverBand), SlotValue::Band(AmountBand::from_amount(80 * LAKH)));
        assert_eq!(
            get(SlotKey::RegistrationStatus),
            SlotValue::Registration(RegistrationStatus {
                udyam: Some(true),
                gst: Some(false)
            })
        );
        match get(SlotKey::FinanceRequirement) {
            SlotValue::Finance(f) => {
                assert_eq!(f.purpose, Some(FinancePurpose::MachineryTermLoan));
                assert_eq!(f.amount, Some(AmountBand::from_amount(20 * LAKH)));
            },
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            get(SlotKey::Location),
            SlotValue::Location(Location {
                state: Some("Maharashtra".into()),
                district: Some("Pune".into())
            })
        );
        assert_eq!(
            get(SlotKey::OwnershipCategory),
            SlotValue::Ownership([OwnershipCategory::General].into_iter().collect())
        );
    }

    #[test]
    fn test_band_normalization() {
        let profile = Profile::new();
        let range = engine()
            .extract("our turnover is around 50-60 lakh", &profile)
            .unwrap();
        let point = engine().extract("turnover 55 lakh", &profile).unwrap();
        let band = |e: &Extraction| e.get(SlotKey::TurnoverBand).unwrap().value.clone();
        assert_eq!(band(&range), band(&point));
        match band(&range) {
            SlotValue::Band(b) => assert_eq!(b.label(), "₹50 lakh–₹1 crore"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_noisy_voice_input() {
        let profile = Profile::new();
        let extraction = engine()
            .extract(
                "umm so we we are basically into manufacturing, uh, our turnover is, you know, like 2 crore",
                &profile,
            )
            .unwrap();
        assert!(extraction.get(SlotKey::BusinessNature).is_some());
        assert_eq!(
            extraction.get(SlotKey::TurnoverBand).unwrap().value,
            SlotValue::Band(AmountBand::from_amount(2 * CRORE))
        );
    }

    #[test]
    fn test_cue_carried_across_spans() {
        let profile = Profile::new();
        let extraction = engine()
            .extract("my annual turnover is; around 80 lakh", &profile)
            .unwrap();
        assert!(extraction.get(SlotKey::TurnoverBand).is_some());
    }

    #[test]
    fn test_vague_answer_is_inferred_stub() {
        let profile = Profile::new();
        let extraction = engine()
            .extract_answer("it's decent", &profile, Some(SlotKey::TurnoverBand))
            .unwrap();
        let update = extraction.get(SlotKey::TurnoverBand).unwrap();
        assert_eq!(update.confidence, Confidence::Inferred);
        assert!(update.needs_clarification);
        assert!(matches!(update.value, SlotValue::Qualitative(_)));
        assert!(extraction
            .ambiguities
            .iter()
            .any(|a| a.slot == Some(SlotKey::TurnoverBand)));
    }

    #[test]
    fn test_vague_reply_stubs_asked_slot() {
        let profile = Profile::new();
        let cases = [
            (SlotKey::FinanceRequirement, "a decent amount"),
            (SlotKey::CollateralStatus, "average"),
            (SlotKey::BusinessAge, "quite a while"),
            (SlotKey::OwnershipCategory, "average"),
        ];
        for (key, reply) in cases {
            let extraction = engine().extract_answer(reply, &profile, Some(key)).unwrap();
            let update = extraction
                .get(key)
                .unwrap_or_else(|| panic!("no stub for {} from {:?}", key, reply));
            assert_eq!(update.confidence, Confidence::Inferred, "{}", key);
            assert!(update.needs_clarification, "{}", key);
            assert!(matches!(update.value, SlotValue::Qualitative(_)), "{}", key);
            assert!(extraction.ambiguities.iter().any(|a| a.slot == Some(key)));
        }

        // A concrete answer wins over the stub
        let extraction = engine()
            .extract_answer("a decent amount, about 15 lakh", &profile, Some(SlotKey::FinanceRequirement))
            .unwrap();
        assert!(matches!(
            extraction.get(SlotKey::FinanceRequirement).unwrap().value,
            SlotValue::Finance(_)
        ));

        // A slot already holding a value is left alone
        let mut filled = Profile::new();
        let slot = filled.get_mut(SlotKey::BusinessAge);
        slot.value = Some(SlotValue::StartYear(2019));
        slot.confidence = Confidence::Confirmed;
        let extraction = engine()
            .extract_answer("quite a while", &filled, Some(SlotKey::BusinessAge))
            .unwrap();
        assert!(extraction.is_empty());
    }

    #[test]
    fn test_bare_amount_uses_expected_slot() {
        let profile = Profile::new();
        let extraction = engine()
            .extract_answer("15 lakh", &profile, Some(SlotKey::FinanceRequirement))
            .unwrap();
        let update = extraction.get(SlotKey::FinanceRequirement).unwrap();
        assert!(update.needs_clarification);

        let extraction = engine().extract("15 lakh", &profile).unwrap();
        assert!(extraction.is_empty());
        assert_eq!(extraction.ambiguities.len(), 1);
        assert!(extraction.ambiguities[0].to_error().is_none());
    }

    #[test]
    fn test_product_answer_takes_reply() {
        let profile = Profile::new();
        let extraction = engine()
            .extract_answer("Steel almirahs and office racks", &profile, Some(SlotKey::ProductDescription))
            .unwrap();
        assert_eq!(
            extraction.get(SlotKey::ProductDescription).unwrap().value,
            SlotValue::Text("Steel almirahs and office racks".into())
        );
    }

    #[test]
    fn test_partial_registration_completed_by_bare_reply() {
        let mut profile = Profile::new();
        let slot = profile.get_mut(SlotKey::RegistrationStatus);
        slot.value = Some(SlotValue::Registration(RegistrationStatus {
            udyam: Some(true),
            gst: None,
        }));
        slot.confidence = Confidence::Confirmed;

        let extraction = engine()
            .extract_answer("no", &profile, Some(SlotKey::RegistrationStatus))
            .unwrap();
        let update = extraction.get(SlotKey::RegistrationStatus).unwrap();
        assert_eq!(
            update.value,
            SlotValue::Registration(RegistrationStatus {
                udyam: Some(true),
                gst: Some(false)
            })
        );
        assert!(!update.needs_clarification);
    }

    #[test]
    fn test_contradiction_within_reply_keeps_later() {
        let profile = Profile::new();
        let extraction = engine()
            .extract("turnover 30 lakh. sorry, turnover is 3 crore", &profile)
            .unwrap();
        assert_eq!(
            extraction.get(SlotKey::TurnoverBand).unwrap().value,
            SlotValue::Band(AmountBand::from_amount(3 * CRORE))
        );
    }

    #[test]
    fn test_empty_utterance_rejected() {
        let profile = Profile::new();
        assert!(matches!(
            engine().extract("   ", &profile),
            Err(Error::InvalidInput(_))
        ));
    }
}
