//! End-to-end conversation tests
//!
//! Each test drives a `Conversation` through `handle_turn` against a
//! scripted knowledge service.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use udyami_agent::{AgentError, Conversation, ConversationEngine, ConversationSnapshot};
use udyami_config::{DomainConfig, EngineConfig, RetrievalConfig};
use udyami_core::{
    BusinessNature, CaveatKind, ClaimConfidence, Error, KnowledgeService, PlannerPhase, ProfileScope,
    ResponseKind, RetrievalQuery, RetrievalResult, SchemeCategory, SchemeEligibility, SchemeRecord, SlotKey,
    StructuredResponse,
};

const FULL_PROFILE: &str = "manufacturing, started 2021, turnover 80 lakh, Udyam yes GST no, \
     need 20 lakh for machinery, no collateral, Pune Maharashtra, general category";

const REFERENCE_YEAR: i32 = 2025;

// =============================================================================
// Scripted knowledge services
// =============================================================================

#[derive(Clone, Copy)]
enum Behaviour {
    Instant,
    Slow(Duration),
    Failing,
    /// Primary result is old and the fresh lookup fails
    StaleFreshFails,
}

struct ScriptedService {
    behaviour: Behaviour,
    calls: AtomicUsize,
}

impl ScriptedService {
    fn new(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn record(name: &str, category: SchemeCategory, score: f32) -> SchemeRecord {
    SchemeRecord {
        name: name.to_string(),
        authority: "Ministry of MSME".to_string(),
        category: Some(category),
        summary: format!("{} support for manufacturing units.", name),
        conditions: vec!["Udyam registration".to_string()],
        amount_range: Some("Up to ₹50 lakh".to_string()),
        source: Some(format!("https://schemes.example/{}", name.to_lowercase().replace(' ', "-"))),
        score,
        eligibility: SchemeEligibility {
            natures: vec![BusinessNature::Manufacturing],
            ..Default::default()
        },
    }
}

fn corpus() -> Vec<SchemeRecord> {
    vec![
        record("PMEGP", SchemeCategory::SubsidyCapital, 0.7),
        record("CGTMSE", SchemeCategory::CreditLinked, 0.9),
        record("ZED Certification", SchemeCategory::TechnologyCluster, 0.4),
    ]
}

#[async_trait]
impl KnowledgeService for ScriptedService {
    async fn search(&self, _query: &RetrievalQuery) -> udyami_core::Result<RetrievalResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let updated_at = match self.behaviour {
            Behaviour::StaleFreshFails => Some(Utc::now() - ChronoDuration::days(400)),
            _ => Some(Utc::now()),
        };
        match self.behaviour {
            Behaviour::Slow(delay) => tokio::time::sleep(delay).await,
            Behaviour::Failing => return Err(Error::RetrievalUnavailable("connection refused".to_string())),
            _ => {},
        }
        Ok(RetrievalResult {
            records: corpus(),
            updated_at,
            ..Default::default()
        })
    }

    async fn fresh_search(&self, _query: &RetrievalQuery) -> udyami_core::Result<RetrievalResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::RetrievalUnavailable("fresh search offline".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn engine_with(service: Arc<ScriptedService>, engine: EngineConfig, retrieval: RetrievalConfig) -> Arc<ConversationEngine> {
    Arc::new(
        ConversationEngine::new(Arc::new(DomainConfig::default()), engine, retrieval, service)
            .with_reference_year(REFERENCE_YEAR),
    )
}

fn engine(service: Arc<ScriptedService>) -> Arc<ConversationEngine> {
    engine_with(service, EngineConfig::default(), RetrievalConfig::default())
}

fn quiet_engine(service: Arc<ScriptedService>) -> Arc<ConversationEngine> {
    let config = EngineConfig {
        personalization: false,
        ..EngineConfig::default()
    };
    engine_with(service, config, RetrievalConfig::default())
}

fn schemes(response: &StructuredResponse) -> Vec<&udyami_core::SchemeRecommendation> {
    response.scheme_groups.iter().flat_map(|g| g.schemes.iter()).collect()
}

// =============================================================================
// Tests
// =============================================================================

/// A reply that fills every critical slot goes straight to a recommendation
#[tokio::test]
async fn test_full_profile_in_one_turn() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(engine(service.clone()));

    let response = conversation.handle_turn(FULL_PROFILE).await.unwrap();

    assert_eq!(response.kind, ResponseKind::Recommendation);
    assert!(response.question.is_none());
    assert_eq!(service.calls(), 1);

    let block = response.profile.as_ref().unwrap();
    assert_eq!(block.scope, ProfileScope::Full);
    assert_eq!(block.entries.len(), 9);

    // Fixed category order regardless of retrieval order
    let categories: Vec<_> = response.scheme_groups.iter().map(|g| g.category).collect();
    assert_eq!(
        categories,
        vec![
            SchemeCategory::CreditLinked,
            SchemeCategory::SubsidyCapital,
            SchemeCategory::TechnologyCluster
        ]
    );
    for scheme in schemes(&response) {
        assert!(scheme.rationale.contains("manufacturing"), "{}", scheme.rationale);
    }
    assert_eq!(response.sources.len(), 3);
    assert!(response.scam_alert.is_some());
    assert!(response.user_segment.is_some());
    assert_eq!(conversation.phase(), PlannerPhase::Composing);
}

/// Narrow eligibility check asks only its six critical slots
#[tokio::test]
async fn test_scheme_check_needs_six_slots() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(quiet_engine(service.clone()));

    let first = conversation.handle_turn("Am I eligible for CGTMSE?").await.unwrap();
    let question = first.question.as_ref().unwrap();
    assert_eq!(question.slot, SlotKey::BusinessNature);
    assert_eq!(question.header, "Question 1 of 6 – Nature of business");
    assert_eq!(service.calls(), 0);

    let response = conversation
        .handle_turn("manufacturing, started 2021, turnover 80 lakh, Udyam yes GST no, need 20 lakh for machinery, no collateral")
        .await
        .unwrap();
    assert_eq!(response.kind, ResponseKind::Recommendation);
    assert_eq!(response.intent.reference(), Some("CGTMSE"));
    let block = response.profile.unwrap();
    assert_eq!(block.scope, ProfileScope::KeyDetails);
    assert!(block.entries.iter().all(|e| e.slot != SlotKey::Location));
}

/// Every question response carries exactly one question and no schemes
#[tokio::test]
async fn test_one_question_per_turn() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(quiet_engine(service.clone()));

    let replies = [
        "I want to find government schemes for my business",
        "manufacturing",
        "started in 2019",
        "turnover around 80 lakh",
    ];
    let mut asked = Vec::new();
    for reply in replies {
        let response = conversation.handle_turn(reply).await.unwrap();
        assert_eq!(response.kind, ResponseKind::Question);
        assert!(response.scheme_groups.is_empty());
        asked.push(response.question.unwrap().slot);
    }
    assert_eq!(service.calls(), 0);
    // No slot is asked again once answered
    let mut deduped = asked.clone();
    deduped.dedup();
    assert_eq!(asked, deduped);
}

/// Filled slots never become empty again
#[tokio::test]
async fn test_profile_is_monotonic() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(quiet_engine(service));

    let replies = [
        "I need schemes for my unit",
        "manufacturing",
        "actually I am not sure",
        "turnover around 80 lakh",
        "no idea",
        "started 2021",
    ];
    let mut filled = Vec::new();
    for reply in replies {
        conversation.handle_turn(reply).await.unwrap();
        let now = conversation.profile().filled_keys();
        assert!(filled.iter().all(|k| now.contains(k)), "{:?} lost from {:?}", filled, now);
        filled = now;
    }
    assert!(filled.contains(&SlotKey::BusinessNature));
    assert!(filled.contains(&SlotKey::TurnoverBand));
}

/// A hand-wavy reply to any question gets one clarifying follow-up
#[tokio::test]
async fn test_vague_reply_is_followed_up() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(quiet_engine(service));

    conversation
        .handle_turn("I want to find government schemes for my business")
        .await
        .unwrap();
    let asked = conversation.handle_turn("manufacturing").await.unwrap();
    assert_eq!(asked.question.unwrap().slot, SlotKey::BusinessAge);

    let response = conversation.handle_turn("quite a while").await.unwrap();
    let question = response.question.expect("follow-up question");
    assert_eq!(question.slot, SlotKey::BusinessAge);
    assert!(question.clarifier.is_some());

    let slot = conversation.profile().get(SlotKey::BusinessAge);
    assert!(slot.needs_clarification);
    assert!(slot.is_filled());
}

/// Comparison, bank pitch and DPR outline are composed when asked for
#[tokio::test]
async fn test_requested_outputs() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(quiet_engine(service.clone()));

    // Asked during intake, carried to the first composition
    let first = conversation.handle_turn("Can you help me with a project report?").await.unwrap();
    assert_eq!(first.kind, ResponseKind::Question);
    assert!(conversation.snapshot().requested.dpr_outline);

    let composed = conversation.handle_turn(FULL_PROFILE).await.unwrap();
    assert_eq!(composed.kind, ResponseKind::Recommendation);
    assert_eq!(composed.dpr_outline.len(), 11);
    assert!(composed.comparison.is_none());
    assert!(!conversation.snapshot().requested.dpr_outline);

    let calls = service.calls();
    let compared = conversation.handle_turn("compare CGTMSE vs PMEGP vs Mudra").await.unwrap();
    assert_eq!(compared.kind, ResponseKind::Recommendation);
    let comparison = compared.comparison.as_ref().expect("comparison");
    let rows: Vec<&str> = comparison.rows.iter().map(|r| r.scheme.as_str()).collect();
    assert_eq!(rows, vec!["CGTMSE", "PMEGP"]);
    assert_eq!(comparison.not_found, vec!["Mudra"]);
    assert!(compared.dpr_outline.is_empty());
    // One main search plus one lookup for the scheme it did not return
    assert_eq!(service.calls(), calls + 2);

    let pitch = conversation.handle_turn("what should I tell the bank manager?").await.unwrap();
    assert_eq!(pitch.kind, ResponseKind::Recommendation);
    let lines = pitch.bank_pitch.expect("bank pitch").lines;
    assert_eq!(lines[0], "I run a manufacturing unit in Pune since 2021.");
    assert!(pitch.comparison.is_none());
}

/// A turn that changes nothing after a composition only acknowledges
#[tokio::test]
async fn test_unchanged_turn_is_acknowledged() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(engine(service.clone()));

    let first = conversation.handle_turn(FULL_PROFILE).await.unwrap();
    assert_eq!(first.kind, ResponseKind::Recommendation);

    let second = conversation.handle_turn("ok thanks").await.unwrap();
    assert_eq!(second.kind, ResponseKind::Acknowledgement);
    assert_eq!(service.calls(), 1);

    // Same inputs compose the same recommendation
    let mut other = Conversation::new(engine(ScriptedService::new(Behaviour::Instant)));
    let again = other.handle_turn(FULL_PROFILE).await.unwrap();
    assert_eq!(again.scheme_groups, first.scheme_groups);
    assert_eq!(again.profile, first.profile);
    assert_eq!(again.intent, first.intent);
}

/// A contradiction of a confirmed value is asked back before anything else
#[tokio::test]
async fn test_contradiction_is_reconfirmed() {
    let service = ScriptedService::new(Behaviour::Instant);
    let mut conversation = Conversation::new(engine(service));

    conversation.handle_turn(FULL_PROFILE).await.unwrap();
    let response = conversation.handle_turn("actually turnover is 5 lakh").await.unwrap();

    let question = response.question.expect("reconfirmation question");
    assert!(question.reconfirmation);
    assert_eq!(question.slot, SlotKey::TurnoverBand);
    assert!(question.text.starts_with("I want to double-check"));
    assert!(conversation.profile().get(SlotKey::TurnoverBand).needs_reconfirmation);

    let resolved = conversation.handle_turn("the new figure is correct").await.unwrap();
    assert_eq!(resolved.kind, ResponseKind::Recommendation);
    let slot = conversation.profile().get(SlotKey::TurnoverBand);
    assert!(!slot.needs_reconfirmation);
    assert_eq!(slot.describe(), "Up to ₹10 lakh");
}

/// Timeouts degrade to a profile-only answer
#[tokio::test]
async fn test_retrieval_timeout_degrades() {
    let service = ScriptedService::new(Behaviour::Slow(Duration::from_millis(500)));
    let retrieval = RetrievalConfig {
        timeout_ms: 50,
        ..RetrievalConfig::default()
    };
    let mut conversation = Conversation::new(engine_with(service, EngineConfig::default(), retrieval));

    let response = conversation.handle_turn(FULL_PROFILE).await.unwrap();

    assert_eq!(response.kind, ResponseKind::Recommendation);
    assert!(response.has_caveat(CaveatKind::SchemeDataUnavailable));
    assert_eq!(response.scheme_count(), 0);
    assert!(schemes(&response).iter().all(|s| s.confidence != ClaimConfidence::High));
    assert!(response.assessment.is_some());
    assert!(!response.guidance.is_empty());
}

#[tokio::test]
async fn test_retrieval_failure_degrades() {
    let service = ScriptedService::new(Behaviour::Failing);
    let mut conversation = Conversation::new(engine(service));

    let response = conversation.handle_turn(FULL_PROFILE).await.unwrap();
    let caveat = response
        .caveats
        .iter()
        .find(|c| c.kind == CaveatKind::SchemeDataUnavailable)
        .unwrap();
    assert!(caveat.message.contains("could not be freshly verified"));
}

/// Old data with a failed freshness lookup is shown but capped at Medium
#[tokio::test]
async fn test_stale_data_not_verified() {
    let service = ScriptedService::new(Behaviour::StaleFreshFails);
    let mut conversation = Conversation::new(engine(service.clone()));

    let response = conversation.handle_turn(FULL_PROFILE).await.unwrap();

    assert_eq!(service.calls(), 2);
    assert!(response.has_caveat(CaveatKind::NotFreshlyVerified));
    assert!(response.scheme_count() > 0);
    assert!(schemes(&response).iter().all(|s| s.confidence <= ClaimConfidence::Medium));
}

/// A cancel from another task discards the in-flight retrieval
#[tokio::test]
async fn test_cancelled_retrieval_is_discarded() {
    let service = ScriptedService::new(Behaviour::Slow(Duration::from_secs(2)));
    let mut conversation = Conversation::new(engine(service));
    let mut events = conversation.subscribe();

    let handle = conversation.cancel_handle();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();
    });

    let response = conversation.handle_turn(FULL_PROFILE).await.unwrap();
    canceller.await.unwrap();

    assert_eq!(response.kind, ResponseKind::Acknowledgement);
    assert_eq!(response.scheme_count(), 0);
    assert_eq!(conversation.phase(), PlannerPhase::Ready);

    let mut saw_cancel = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, udyami_agent::ConversationEvent::RetrievalCancelled { .. }) {
            saw_cancel = true;
        }
    }
    assert!(saw_cancel);
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let service = ScriptedService::new(Behaviour::Instant);
    let engine = quiet_engine(service);
    let mut conversation = Conversation::new(engine.clone());
    conversation.handle_turn("I want to find schemes").await.unwrap();
    conversation.handle_turn("manufacturing").await.unwrap();

    let json = conversation.snapshot().to_json().unwrap();
    let snapshot = ConversationSnapshot::from_json(&json).unwrap();
    let mut restored = Conversation::restore(engine, snapshot).unwrap();

    assert_eq!(restored.snapshot(), conversation.snapshot());

    let a = conversation.handle_turn("we make steel utensils").await.unwrap();
    let b = restored.handle_turn("we make steel utensils").await.unwrap();
    assert_eq!(a.question, b.question);
    assert_eq!(a.turn_index, b.turn_index);
}

#[tokio::test]
async fn test_snapshot_unknown_version_rejected() {
    let engine = engine(ScriptedService::new(Behaviour::Instant));
    let conversation = Conversation::new(engine.clone());

    let mut value = serde_json::to_value(conversation.snapshot()).unwrap();
    value["version"] = serde_json::json!(42);
    let snapshot = ConversationSnapshot::from_json(&value.to_string()).unwrap();

    let err = Conversation::restore(engine, snapshot).err().unwrap();
    assert!(matches!(err, AgentError::Snapshot(_)));

    let err = ConversationSnapshot::from_json("{not json").unwrap_err();
    assert!(matches!(err, AgentError::Snapshot(_)));
}

#[tokio::test]
async fn test_empty_input_is_an_error() {
    let mut conversation = Conversation::new(engine(ScriptedService::new(Behaviour::Instant)));
    let err = conversation.handle_turn("").await.unwrap_err();
    assert!(err.is_invalid_input());
    assert!(conversation.turns().is_empty());
}

/// What-if on registration reports the score change
#[tokio::test]
async fn test_scenario_simulation() {
    let mut conversation = Conversation::new(engine(ScriptedService::new(Behaviour::Instant)));
    conversation.handle_turn(FULL_PROFILE).await.unwrap();

    let comparison = conversation
        .simulate(SlotKey::CollateralStatus, "yes we have property to offer as collateral")
        .await
        .unwrap();
    assert_eq!(comparison.slot, SlotKey::CollateralStatus);
    assert!(comparison.score_b >= comparison.score_a);

    let err = conversation.simulate(SlotKey::TurnoverBand, "hmm").await.unwrap_err();
    assert!(err.is_invalid_input());
}
