//! Response composer
//!
//! Turns the profile, the working intent and retrieved scheme records into a
//! [`StructuredResponse`]. Composition is deterministic: the same inputs
//! always give the same response.
//!
//! A recommendation carries, in order:
//! - the profile block (full for broad intents, key details otherwise)
//! - the user segment line
//! - scheme groups in fixed category order, each scheme with a rationale
//!   tied to slot values and a confidence label
//! - eligibility assessment, document checklist and guidance
//! - a scheme comparison, bank pitch or DPR outline, when asked for
//! - caveats, sources and the scam alert

pub mod assessment;
pub mod checklist;
pub mod deliverables;
pub mod guidance;

pub use assessment::{
    assess, compare_scenarios, infer_segment, scheme_fit, ScenarioComparison, SchemeFit, UserSegment,
};

use chrono::Datelike;
use std::collections::BTreeMap;
use std::sync::Arc;

use udyami_config::constants::{composer as limits, text};
use udyami_config::{DomainConfig, EngineConfig};
use udyami_core::{
    Caveat, CaveatKind, ClaimConfidence, Confidence, Intent, IntentConfidence, IntentKind, Language,
    PlannerPhase, Profile, ProfileBlock, ProfileEntry, ProfileScope, QuestionPrompt, ResponseKind,
    RetrievalResult, SchemeCategory, SchemeGroup, SchemeRecommendation, SchemeRecord, SlotKey,
    StructuredResponse,
};
use udyami_text_processing::OutputRequest;

use guidance::soften_outcome_claims;

/// Scheme data available to a composition
#[derive(Debug, Clone, PartialEq)]
pub enum SchemeData {
    Retrieved {
        result: RetrievalResult,
        /// False when the data is stale or the fresh search failed
        verified: bool,
    },
    /// Retrieval failed or timed out; compose from the profile only
    Unavailable { reason: String },
    /// The intent does not call for scheme data
    NotNeeded,
}

/// Turn metadata echoed on every response
#[derive(Debug, Clone, PartialEq)]
pub struct TurnContext {
    pub turn_index: usize,
    pub intent: Intent,
    pub intent_confidence: IntentConfidence,
    pub phase: PlannerPhase,
    pub language: Language,
}

/// Inputs to one composition
#[derive(Debug, Clone)]
pub struct CompositionRequest<'a> {
    pub context: TurnContext,
    pub profile: &'a Profile,
    pub data: SchemeData,
    /// Composed in quick mode with critical slots skipped
    pub approximate: bool,
    pub skipped: Vec<SlotKey>,
    /// Comparison, pitch or DPR outline the user asked for
    pub outputs: OutputRequest,
}

fn empty_response(kind: ResponseKind, ctx: TurnContext, message: String) -> StructuredResponse {
    StructuredResponse {
        kind,
        turn_index: ctx.turn_index,
        intent: ctx.intent,
        intent_confidence: ctx.intent_confidence,
        phase: ctx.phase,
        language: ctx.language,
        question: None,
        profile: None,
        user_segment: None,
        scheme_groups: Vec::new(),
        assessment: None,
        documents: Vec::new(),
        guidance: Vec::new(),
        comparison: None,
        bank_pitch: None,
        dpr_outline: Vec::new(),
        caveats: Vec::new(),
        sources: Vec::new(),
        scam_alert: None,
        approximate: false,
        message,
    }
}

/// Builds structured responses
pub struct ResponseComposer {
    domain: Arc<DomainConfig>,
    max_per_category: usize,
    reference_year: i32,
}

impl ResponseComposer {
    pub fn new(domain: Arc<DomainConfig>, config: &EngineConfig) -> Self {
        let max_per_category = if config.max_schemes_per_category == 0 {
            limits::MAX_SCHEMES_PER_CATEGORY
        } else {
            config.max_schemes_per_category
        };
        Self {
            domain,
            max_per_category,
            reference_year: chrono::Utc::now().year(),
        }
    }

    /// Year that business ages are measured against
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = year;
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// A single planned question
    pub fn question(&self, ctx: TurnContext, prompt: QuestionPrompt, approximate: bool) -> StructuredResponse {
        let mut message = prompt.text.clone();
        if let Some(clarifier) = &prompt.clarifier {
            message = format!("{} {}", message, clarifier);
        }
        let mut response = empty_response(ResponseKind::Question, ctx, message);
        response.question = Some(prompt);
        response.approximate = approximate;
        response
    }

    pub fn acknowledgement(&self, ctx: TurnContext, message: impl Into<String>) -> StructuredResponse {
        empty_response(ResponseKind::Acknowledgement, ctx, message.into())
    }

    /// Compose a recommendation
    pub fn compose(&self, request: CompositionRequest<'_>) -> StructuredResponse {
        let CompositionRequest {
            context,
            profile,
            data,
            approximate,
            skipped,
            outputs,
        } = request;
        let intent = context.intent.clone();
        let intent_confidence = context.intent_confidence;
        let segment = infer_segment(profile, self.reference_year);

        let mut response = empty_response(ResponseKind::Recommendation, context, String::new());
        response.profile = Some(self.profile_block(&intent, profile));
        response.user_segment = segment.map(|s| s.statement());
        response.approximate = approximate;

        let mut caveats = Vec::new();
        match &data {
            SchemeData::Retrieved { result, verified } => {
                response.scheme_groups = self.scheme_groups(&intent, profile, &result.records, *verified);
                if !verified {
                    caveats.push(Caveat::new(
                        CaveatKind::NotFreshlyVerified,
                        "Scheme details could not be freshly verified; confirm the current terms before applying.",
                    ));
                }
            },
            SchemeData::Unavailable { reason } => {
                tracing::warn!(reason = %reason, "Composing without scheme data");
                caveats.push(Caveat::new(
                    CaveatKind::SchemeDataUnavailable,
                    "Scheme data unavailable right now, so recommendations could not be freshly verified. \
                     The guidance below is based on your profile only.",
                ));
            },
            SchemeData::NotNeeded => {},
        }

        if is_scheme_intent(&intent) {
            let assessment = assess(profile, self.reference_year);
            if assessment.red_flags.is_empty() {
                response.guidance.push("No red flags found in the details you shared.".to_string());
            }
            response.assessment = Some(assessment);
        }
        if checklist::applies_to(&intent) {
            response.documents = checklist::document_checklist(profile);
        }
        response.guidance.extend(guidance::intent_guidance(&intent, profile, segment));
        response.guidance.push(text::DISCLAIMER.to_string());

        let records: &[SchemeRecord] = match &data {
            SchemeData::Retrieved { result, .. } => result.records.as_slice(),
            _ => &[],
        };
        if !outputs.compare.is_empty() {
            response.comparison = Some(deliverables::compare_schemes(
                &outputs.compare,
                records,
                profile,
                self.reference_year,
            ));
        }
        if outputs.bank_pitch {
            response.bank_pitch = Some(deliverables::bank_pitch(profile, records, self.reference_year));
        }
        if outputs.dpr_outline {
            response.dpr_outline = deliverables::dpr_outline(profile, self.reference_year);
        }

        if intent_confidence == IntentConfidence::Low {
            caveats.push(Caveat::new(
                CaveatKind::IntentLowConfidence,
                format!(
                    "I am not fully sure what you are looking for, so I have assumed: {}. Tell me if you meant something else.",
                    intent.label().to_lowercase()
                ),
            ));
        }
        if approximate {
            let message = if skipped.is_empty() {
                "This is a quick, approximate answer.".to_string()
            } else {
                format!(
                    "This is a quick, approximate answer that does not yet use: {}.",
                    names(&skipped)
                )
            };
            caveats.push(Caveat::new(CaveatKind::Approximate, message));
        }
        let pending = profile.pending_reconfirmation();
        if !pending.is_empty() {
            caveats.push(Caveat::new(
                CaveatKind::PendingReconfirmation,
                format!("These details still need confirming: {}.", names(&pending)),
            ));
        }
        response.caveats = caveats;

        response.sources = self.sources(&response.scheme_groups, &data);
        response.scam_alert = Some(text::SCAM_ALERT.to_string());
        response.message = self.summary(&intent, &response, &data);
        if let Some(comparison) = &response.comparison {
            response.message = format!("{} {}", response.message, comparison.verdict);
        }
        response
    }

    fn profile_block(&self, intent: &Intent, profile: &Profile) -> ProfileBlock {
        let entry = |key: SlotKey| {
            let slot = profile.get(key);
            let mut value = slot.describe();
            if slot.needs_reconfirmation {
                value.push_str(" (to be reconfirmed)");
            }
            ProfileEntry {
                slot: key,
                label: key.display_name().to_string(),
                value,
                confidence: slot.confidence,
            }
        };
        if intent.is_broad() {
            return ProfileBlock {
                title: text::PROFILE_TITLE.to_string(),
                scope: ProfileScope::Full,
                entries: SlotKey::CORE.iter().copied().map(entry).collect(),
            };
        }
        let mut keys = self.domain.critical_for(intent);
        keys.extend(self.domain.helpful_for(intent));
        keys.sort();
        keys.dedup();
        ProfileBlock {
            title: text::KEY_DETAILS_TITLE.to_string(),
            scope: ProfileScope::KeyDetails,
            entries: keys
                .into_iter()
                .filter(|k| profile.get(*k).is_filled())
                .map(entry)
                .collect(),
        }
    }

    /// Whether every critical slot is confirmed and complete
    fn critical_solid(&self, intent: &Intent, profile: &Profile) -> bool {
        self.domain.critical_for(intent).iter().all(|k| {
            let slot = profile.get(*k);
            slot.confidence == Confidence::Confirmed && slot.value.as_ref().is_some_and(|v| !v.is_partial())
        })
    }

    fn scheme_confidence(
        &self,
        record: &SchemeRecord,
        fit: &SchemeFit,
        solid: bool,
        pending: bool,
        verified: bool,
    ) -> ClaimConfidence {
        if pending || !fit.eligible {
            return ClaimConfidence::Low;
        }
        let mut level: i8 = if record.score >= limits::STRONG_MATCH_SCORE {
            2
        } else if record.score >= limits::FAIR_MATCH_SCORE {
            1
        } else {
            0
        };
        if !solid {
            level -= 1;
        }
        if !fit.concerns.is_empty() {
            level -= 1;
        }
        let confidence = match level {
            l if l >= 2 => ClaimConfidence::High,
            1 => ClaimConfidence::Medium,
            _ => ClaimConfidence::Low,
        };
        if verified {
            confidence
        } else {
            confidence.min(ClaimConfidence::Medium)
        }
    }

    fn rationale(&self, profile: &Profile, fit: &SchemeFit) -> String {
        let mut reasons = fit.reasons.clone();
        if reasons.is_empty() {
            let cited = [SlotKey::BusinessNature, SlotKey::FinanceRequirement, SlotKey::TurnoverBand]
                .into_iter()
                .chain(SlotKey::CORE)
                .map(|k| profile.get(k))
                .find(|s| s.is_filled());
            reasons.push(match cited {
                Some(slot) => format!(
                    "matches your {} ({})",
                    slot.key.display_name().to_lowercase(),
                    slot.describe()
                ),
                None => "matches your request".to_string(),
            });
        }
        let mut rationale = format!("Why it fits: {}.", reasons.join("; "));
        if !fit.concerns.is_empty() {
            rationale.push_str(&format!(" Check: {}.", fit.concerns.join("; ")));
        }
        rationale
    }

    fn scheme_groups(
        &self,
        intent: &Intent,
        profile: &Profile,
        records: &[SchemeRecord],
        verified: bool,
    ) -> Vec<SchemeGroup> {
        let solid = self.critical_solid(intent, profile);
        let pending = profile.has_pending_reconfirmation();
        let named = intent.reference().map(str::to_lowercase);

        let mut grouped: BTreeMap<SchemeCategory, Vec<SchemeRecommendation>> = BTreeMap::new();
        for record in records {
            let fit = scheme_fit(profile, record, self.reference_year);
            let asked_for = named
                .as_ref()
                .is_some_and(|n| record.name.to_lowercase().contains(n.as_str()));
            // A named scheme is always shown, with its concerns
            if !fit.eligible && !asked_for {
                continue;
            }
            let bucket = grouped.entry(record.resolved_category()).or_default();
            if bucket.len() >= self.max_per_category {
                continue;
            }
            bucket.push(SchemeRecommendation {
                name: record.name.clone(),
                authority: record.authority.clone(),
                summary: soften_outcome_claims(&record.summary),
                amount_range: record.amount_range.as_deref().map(soften_outcome_claims),
                rationale: self.rationale(profile, &fit),
                confidence: self.scheme_confidence(record, &fit, solid, pending, verified),
                source: record.source.clone(),
            });
        }

        SchemeCategory::ORDER
            .iter()
            .filter_map(|category| {
                grouped.remove(category).map(|schemes| SchemeGroup {
                    category: *category,
                    schemes,
                })
            })
            .collect()
    }

    fn sources(&self, groups: &[SchemeGroup], data: &SchemeData) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for source in groups
            .iter()
            .flat_map(|g| g.schemes.iter())
            .filter_map(|s| s.source.as_ref())
        {
            if !sources.contains(source) {
                sources.push(source.clone());
            }
        }
        if let SchemeData::Retrieved { result, .. } = data {
            tracing::debug!(origin = ?result.origin, sources = sources.len(), "Collected sources");
        }
        sources
    }

    fn summary(&self, intent: &Intent, response: &StructuredResponse, data: &SchemeData) -> String {
        let count = response.scheme_count();
        let lead = match (data, count) {
            (SchemeData::Unavailable { .. }, _) => {
                "I could not reach the scheme data just now, so this is based on your profile alone.".to_string()
            },
            (SchemeData::Retrieved { .. }, 0) if is_scheme_intent(intent) => {
                "I did not find a scheme that clearly fits the details shared so far.".to_string()
            },
            (SchemeData::Retrieved { .. } | SchemeData::NotNeeded, 0) => {
                format!("Here is how to go about it: {}.", intent.label().to_lowercase())
            },
            (SchemeData::Retrieved { .. }, 1) => {
                "Based on what you shared, you are likely to fit the scheme below.".to_string()
            },
            (SchemeData::Retrieved { .. }, n) => {
                format!("Based on what you shared, you are likely to fit the {} schemes below.", n)
            },
            (SchemeData::NotNeeded, _) => format!("Here is how to go about it: {}.", intent.label().to_lowercase()),
        };
        match &response.user_segment {
            Some(segment) => format!(
                "{} {} Final approval always rests with the lender or scheme office.",
                segment, lead
            ),
            None if count > 0 => format!("{} Final approval always rests with the lender or scheme office.", lead),
            None => lead,
        }
    }
}

/// Intents answered with scheme recommendations
pub fn is_scheme_intent(intent: &Intent) -> bool {
    matches!(
        intent.kind(),
        IntentKind::DiscoverSchemes | IntentKind::CheckSchemeEligibility | IntentKind::Unclear
    )
}

fn names(keys: &[SlotKey]) -> String {
    keys.iter()
        .map(|k| k.display_name().to_lowercase())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use udyami_core::{
        AmountBand, BusinessNature, CollateralStatus, FinancePurpose, FinanceRequirement, Location,
        OwnershipCategory, PendingValue, RegistrationStatus, RetrievalOrigin, SchemeEligibility, SlotValue,
        LAKH,
    };

    const YEAR: i32 = 2025;

    fn composer() -> ResponseComposer {
        ResponseComposer::new(Arc::new(DomainConfig::default()), &EngineConfig::default()).with_reference_year(YEAR)
    }

    fn ctx(intent: Intent) -> TurnContext {
        TurnContext {
            turn_index: 3,
            intent,
            intent_confidence: IntentConfidence::High,
            phase: PlannerPhase::Composing,
            language: Language::English,
        }
    }

    fn fill(profile: &mut Profile, key: SlotKey, value: SlotValue) {
        let slot = profile.get_mut(key);
        slot.value = Some(value);
        slot.confidence = Confidence::Confirmed;
    }

    fn full_profile() -> Profile {
        let mut p = Profile::new();
        fill(&mut p, SlotKey::BusinessNature, SlotValue::Nature(BusinessNature::Manufacturing));
        fill(&mut p, SlotKey::BusinessAge, SlotValue::StartYear(2021));
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
        fill(
            &mut p,
            SlotKey::Location,
            SlotValue::Location(Location {
                state: Some("Maharashtra".to_string()),
                district: Some("Pune".to_string()),
            }),
        );
        fill(
            &mut p,
            SlotKey::OwnershipCategory,
            SlotValue::Ownership([OwnershipCategory::General].into_iter().collect()),
        );
        p
    }

    fn record(name: &str, category: SchemeCategory, score: f32) -> SchemeRecord {
        SchemeRecord {
            name: name.to_string(),
            authority: "Ministry of MSME".to_string(),
            category: Some(category),
            summary: "Loans will be approved quickly.".to_string(),
            conditions: Vec::new(),
            amount_range: None,
            source: Some(format!("https://example.gov.in/{}", name.to_lowercase())),
            score,
            eligibility: SchemeEligibility {
                natures: vec![BusinessNature::Manufacturing],
                ..Default::default()
            },
        }
    }

    fn retrieved(records: Vec<SchemeRecord>, verified: bool) -> SchemeData {
        SchemeData::Retrieved {
            result: RetrievalResult {
                records,
                updated_at: None,
                origin: RetrievalOrigin::Primary,
            },
            verified,
        }
    }

    fn compose(profile: &Profile, intent: Intent, data: SchemeData) -> StructuredResponse {
        composer().compose(CompositionRequest {
            context: ctx(intent),
            profile,
            data,
            approximate: false,
            skipped: Vec::new(),
            outputs: OutputRequest::default(),
        })
    }

    #[test]
    fn test_recommendation_layout() {
        let profile = full_profile();
        let records = vec![
            record("Stand-Up India", SchemeCategory::CreditLinked, 0.5),
            record("PMEGP", SchemeCategory::SubsidyCapital, 0.9),
            record("CGTMSE", SchemeCategory::CreditLinked, 0.9),
        ];
        let response = compose(&profile, Intent::DiscoverSchemes, retrieved(records, true));

        assert_eq!(response.kind, ResponseKind::Recommendation);
        let block = response.profile.as_ref().unwrap();
        assert_eq!(block.title, "MSME Profile (As Understood)");
        assert_eq!(block.entries.len(), 9);

        let categories: Vec<_> = response.scheme_groups.iter().map(|g| g.category).collect();
        assert_eq!(categories, vec![SchemeCategory::CreditLinked, SchemeCategory::SubsidyCapital]);
        assert_eq!(response.scheme_groups[0].schemes[0].name, "Stand-Up India");

        for scheme in response.scheme_groups.iter().flat_map(|g| &g.schemes) {
            assert!(scheme.rationale.contains("manufacturing"));
            assert!(!scheme.summary.contains("will be approved"));
        }
        assert_eq!(response.sources.len(), 3);
        assert_eq!(response.scam_alert.as_deref(), Some(text::SCAM_ALERT));
        assert!(response.assessment.is_some());
        assert!(!response.documents.is_empty());
        assert!(response.user_segment.as_deref().unwrap().starts_with("From your details"));
        assert!(response.caveats.is_empty());
    }

    #[test]
    fn test_per_category_cap() {
        let profile = full_profile();
        let records = (0..6)
            .map(|i| record(&format!("Scheme {}", i), SchemeCategory::CreditLinked, 0.8))
            .collect();
        let response = compose(&profile, Intent::DiscoverSchemes, retrieved(records, true));
        assert_eq!(response.scheme_count(), limits::MAX_SCHEMES_PER_CATEGORY);
    }

    #[test]
    fn test_unverified_caps_confidence() {
        let profile = full_profile();
        let response = compose(
            &profile,
            Intent::DiscoverSchemes,
            retrieved(vec![record("CGTMSE", SchemeCategory::CreditLinked, 0.95)], false),
        );
        assert!(response.has_caveat(CaveatKind::NotFreshlyVerified));
        assert!(response
            .scheme_groups
            .iter()
            .flat_map(|g| &g.schemes)
            .all(|s| s.confidence <= ClaimConfidence::Medium));

        let verified = compose(
            &profile,
            Intent::DiscoverSchemes,
            retrieved(vec![record("CGTMSE", SchemeCategory::CreditLinked, 0.95)], true),
        );
        assert_eq!(verified.scheme_groups[0].schemes[0].confidence, ClaimConfidence::High);
    }

    #[test]
    fn test_unavailable_data() {
        let profile = full_profile();
        let response = compose(
            &profile,
            Intent::DiscoverSchemes,
            SchemeData::Unavailable {
                reason: "timeout".to_string(),
            },
        );
        assert_eq!(response.scheme_count(), 0);
        let caveat = response
            .caveats
            .iter()
            .find(|c| c.kind == CaveatKind::SchemeDataUnavailable)
            .unwrap();
        assert!(caveat.message.contains("Scheme data unavailable"));
        assert!(caveat.message.contains("could not be freshly verified"));
    }

    #[test]
    fn test_pending_reconfirmation_lowers_confidence() {
        let mut profile = full_profile();
        let slot = profile.get_mut(SlotKey::TurnoverBand);
        slot.needs_reconfirmation = true;
        slot.pending = Some(PendingValue {
            value: SlotValue::Band(AmountBand::from_amount(5 * LAKH)),
            confidence: Confidence::Confirmed,
            evidence: "5 lakh".to_string(),
        });
        let response = compose(
            &profile,
            Intent::DiscoverSchemes,
            retrieved(vec![record("CGTMSE", SchemeCategory::CreditLinked, 0.95)], true),
        );
        assert!(response.has_caveat(CaveatKind::PendingReconfirmation));
        assert_eq!(response.scheme_groups[0].schemes[0].confidence, ClaimConfidence::Low);
    }

    #[test]
    fn test_narrow_intent_key_details() {
        let profile = full_profile();
        let intent = Intent::CheckSchemeEligibility {
            scheme: "CGTMSE".to_string(),
        };
        let response = compose(
            &profile,
            intent,
            retrieved(vec![record("CGTMSE", SchemeCategory::CreditLinked, 0.9)], true),
        );
        let block = response.profile.unwrap();
        assert_eq!(block.scope, ProfileScope::KeyDetails);
        assert_eq!(block.title, "Key details used");
        assert!(block.entries.iter().all(|e| e.confidence != Confidence::Unset));
    }

    #[test]
    fn test_low_intent_confidence_and_approximate() {
        let profile = full_profile();
        let mut context = ctx(Intent::DiscoverSchemes);
        context.intent_confidence = IntentConfidence::Low;
        let response = composer().compose(CompositionRequest {
            context,
            profile: &profile,
            data: retrieved(Vec::new(), true),
            approximate: true,
            skipped: vec![SlotKey::Location],
            outputs: OutputRequest::default(),
        });
        assert!(response.has_caveat(CaveatKind::IntentLowConfidence));
        assert!(response.approximate);
        let approx = response.caveats.iter().find(|c| c.kind == CaveatKind::Approximate).unwrap();
        assert!(approx.message.contains("location"));
    }

    #[test]
    fn test_requested_outputs_composed() {
        let profile = full_profile();
        let records = vec![
            record("CGTMSE", SchemeCategory::CreditLinked, 0.9),
            record("PMEGP", SchemeCategory::SubsidyCapital, 0.7),
        ];
        let response = composer().compose(CompositionRequest {
            context: ctx(Intent::DiscoverSchemes),
            profile: &profile,
            data: retrieved(records, true),
            approximate: false,
            skipped: Vec::new(),
            outputs: OutputRequest {
                compare: vec!["CGTMSE".to_string(), "PMEGP".to_string()],
                bank_pitch: true,
                dpr_outline: true,
            },
        });

        let comparison = response.comparison.as_ref().unwrap();
        assert_eq!(comparison.rows.len(), 2);
        assert!(comparison.rows.iter().all(|r| !r.purpose.contains("will be approved")));
        assert!(response.message.ends_with(&comparison.verdict));
        let pitch = response.bank_pitch.as_ref().unwrap();
        assert!(pitch.lines[0].starts_with("I run a manufacturing unit in Pune"));
        assert_eq!(response.dpr_outline.len(), 11);

        // Nothing extra unless asked
        let plain = compose(&profile, Intent::DiscoverSchemes, retrieved(Vec::new(), true));
        assert!(plain.comparison.is_none());
        assert!(plain.bank_pitch.is_none());
        assert!(plain.dpr_outline.is_empty());
    }

    #[test]
    fn test_delayed_payment_guidance_only() {
        let profile = full_profile();
        let response = compose(&profile, Intent::DelayedPayment, SchemeData::NotNeeded);
        assert!(response.assessment.is_none());
        assert!(response.documents.is_empty());
        assert!(response.guidance.iter().any(|g| g.contains("Samadhaan")));
        assert!(response.scheme_groups.is_empty());
    }
}
