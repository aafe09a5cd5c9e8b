//! Conversation engine
//!
//! One user turn runs:
//! utterance → extraction → slot store → intent classifier → planner →
//! (if ready) retrieval gate → bounded retrieval → composer.
//!
//! [`ConversationEngine`] holds the stateless parts and is shared between
//! conversations. [`Conversation`] holds the per-user state and processes
//! one turn at a time (`handle_turn` takes `&mut self`).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use udyami_config::{DomainConfig, EngineConfig, RetrievalConfig, Settings};
use udyami_core::{
    Intent, IntentConfidence, KnowledgeService, Language, PlannerPhase, Profile, SchemeRecord, SlotKey,
    SlotValue, StructuredResponse, TurnLog,
};
use udyami_rag::{CancelHandle, RetrievalExecutor, RetrievalGate, RetrievalOutcome};
use udyami_text_processing::{
    conflict_choice, requested_language, requested_outputs, wants_latest, wants_speed, ExtractionEngine,
    IntentClassifier, IntentState, OutputRequest,
};

use crate::composer::deliverables::names_match;
use crate::composer::{
    compare_scenarios, is_scheme_intent, CompositionRequest, ResponseComposer, ScenarioComparison, SchemeData,
    TurnContext,
};
use crate::dst::SlotStore;
use crate::planner::{Plan, PlanInput, PlannerState, QuestionPlanner};
use crate::{AgentError, Result};

/// Current snapshot format
pub const SNAPSHOT_VERSION: u32 = 1;

const UNCHANGED_MESSAGE: &str = "Noted. Nothing in your details changed, so the recommendations above still apply. \
     Tell me if something is different or if you need help with something else.";

const SUPERSEDED_MESSAGE: &str = "Your newer message came in while I was looking up schemes, so I have set that lookup aside.";

/// Conversation events
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    TurnRecorded { index: usize },
    IntentChanged { from: Option<Intent>, to: Intent },
    PhaseChanged { from: PlannerPhase, to: PlannerPhase },
    Composed { turn_index: usize, schemes: usize, degraded: bool },
    RetrievalCancelled { turn_index: usize },
}

/// Serializable state of one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSnapshot {
    pub version: u32,
    pub profile: Profile,
    pub turns: TurnLog,
    pub intent: IntentState,
    pub planner: PlannerState,
    pub language: Language,
    /// Extra outputs asked for and not yet composed
    #[serde(default)]
    pub requested: OutputRequest,
}

impl ConversationSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| AgentError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AgentError::Snapshot(e.to_string()))
    }

    /// Check the invariants a restored conversation relies on
    fn validate(&self) -> Result<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(AgentError::Snapshot(format!(
                "unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }
        if let Some(slot) = self
            .profile
            .slots()
            .find(|s| s.pending.is_some() && !s.needs_reconfirmation)
        {
            return Err(AgentError::Snapshot(format!(
                "slot {} holds a pending value without an open conflict",
                slot.key
            )));
        }
        if let Some(slot) = self
            .profile
            .slots()
            .find(|s| s.value.is_some() != s.is_filled())
        {
            return Err(AgentError::Snapshot(format!(
                "slot {} has a value and confidence out of step",
                slot.key
            )));
        }
        if self.planner.phase == PlannerPhase::Composing && self.planner.composed_for.is_none() {
            return Err(AgentError::Snapshot("composing phase without a composition".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Shared, stateless turn machinery
pub struct ConversationEngine {
    domain: Arc<DomainConfig>,
    engine: EngineConfig,
    staleness_days: i64,
    extractor: ExtractionEngine,
    classifier: IntentClassifier,
    planner: QuestionPlanner,
    gate: RetrievalGate,
    executor: RetrievalExecutor,
    composer: ResponseComposer,
}

impl ConversationEngine {
    pub fn new(
        domain: Arc<DomainConfig>,
        engine: EngineConfig,
        retrieval: RetrievalConfig,
        service: Arc<dyn KnowledgeService>,
    ) -> Self {
        let extractor = ExtractionEngine::new().with_policy(engine.contradiction_policy());
        let composer = ResponseComposer::new(domain.clone(), &engine).with_reference_year(extractor.reference_year());
        tracing::info!(
            service = service.name(),
            timeout_ms = retrieval.timeout_ms,
            fresh_search = retrieval.fresh_search_enabled,
            "Conversation engine ready"
        );
        Self {
            classifier: IntentClassifier::new(domain.clone()),
            planner: QuestionPlanner::new(domain.clone(), &engine),
            gate: RetrievalGate::new(domain.clone(), &retrieval),
            executor: RetrievalExecutor::new(service, Duration::from_millis(retrieval.timeout_ms), retrieval.min_score),
            extractor,
            composer,
            staleness_days: retrieval.staleness_days,
            domain,
            engine,
        }
    }

    /// Build from loaded settings, reading the domain file when one is configured
    pub fn from_settings(settings: &Settings, service: Arc<dyn KnowledgeService>) -> Result<Self> {
        let domain = match &settings.domain_path {
            Some(path) => DomainConfig::load(path)?,
            None => DomainConfig::default(),
        };
        domain.validate()?;
        Ok(Self::new(
            Arc::new(domain),
            settings.engine.clone(),
            settings.retrieval.clone(),
            service,
        ))
    }

    /// Pin the year used for business-age arithmetic
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.extractor = ExtractionEngine::new()
            .with_reference_year(year)
            .with_policy(self.engine.contradiction_policy());
        self.composer = self.composer.with_reference_year(year);
        self
    }

    pub fn domain(&self) -> &DomainConfig {
        &self.domain
    }

    pub fn config(&self) -> &EngineConfig {
        &self.engine
    }

    /// Compare the profile as it is with the profile after `utterance` is
    /// read as the answer for `key`
    pub async fn simulate(&self, profile: &Profile, key: SlotKey, utterance: &str) -> Result<ScenarioComparison> {
        let extraction = self.extractor.extract_answer(utterance, profile, Some(key))?;
        let change = extraction
            .updates
            .into_iter()
            .find(|u| u.key == key && !matches!(u.value, SlotValue::Qualitative(_)))
            .ok_or_else(|| {
                AgentError::InvalidInput(format!(
                    "could not read a {} from \"{}\"",
                    key.display_name().to_lowercase(),
                    utterance
                ))
            })?;

        let mut changed = profile.clone();
        let slot = changed.get_mut(key);
        slot.value = Some(change.value.clone());
        slot.confidence = change.confidence;

        let mut records = self.scheme_records(profile).await;
        for record in self.scheme_records(&changed).await {
            if !records.iter().any(|r| r.name.eq_ignore_ascii_case(&record.name)) {
                records.push(record);
            }
        }

        let comparison = compare_scenarios(profile, &change, &records, self.composer.reference_year());
        tracing::info!(
            slot = %key,
            score_a = comparison.score_a,
            score_b = comparison.score_b,
            unlocked = comparison.unlocked.len(),
            "Scenario compared"
        );
        Ok(comparison)
    }

    /// Add a record for each compared scheme the main search did not return
    async fn named_records(
        &self,
        names: &[String],
        profile: &Profile,
        records: &mut Vec<SchemeRecord>,
        cancel: &CancelHandle,
    ) {
        for name in names {
            if records.iter().any(|r| names_match(&r.name, name)) {
                continue;
            }
            let intent = Intent::CheckSchemeEligibility { scheme: name.clone() };
            let query = self.gate.build_query(&intent, profile);
            match self.executor.execute(&query, &self.gate, false, cancel.token()).await {
                RetrievalOutcome::Completed { result, .. } => {
                    match result.records.into_iter().find(|r| names_match(&r.name, name)) {
                        Some(record) => records.push(record),
                        None => tracing::debug!(scheme = %name, "No record for compared scheme"),
                    }
                },
                RetrievalOutcome::Cancelled => return,
                RetrievalOutcome::Degraded(e) => {
                    tracing::warn!(scheme = %name, error = %e, "Lookup for compared scheme failed");
                },
            }
        }
    }

    /// Primary search for scheme discovery; empty when it fails
    async fn scheme_records(&self, profile: &Profile) -> Vec<SchemeRecord> {
        let query = self.gate.build_query(&Intent::DiscoverSchemes, profile);
        match self
            .executor
            .execute(&query, &self.gate, false, CancelHandle::new().token())
            .await
        {
            RetrievalOutcome::Completed { result, .. } => result.records,
            _ => Vec::new(),
        }
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Per-user conversation state
pub struct Conversation {
    engine: Arc<ConversationEngine>,
    store: SlotStore,
    turns: TurnLog,
    intent: IntentState,
    planner: PlannerState,
    language: Language,
    requested: OutputRequest,
    cancel: CancelHandle,
    event_tx: broadcast::Sender<ConversationEvent>,
}

impl Conversation {
    pub fn new(engine: Arc<ConversationEngine>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        let policy = engine.engine.contradiction_policy();
        Self {
            engine,
            store: SlotStore::new(policy),
            turns: TurnLog::new(),
            intent: IntentState::default(),
            planner: PlannerState::default(),
            language: Language::default(),
            requested: OutputRequest::default(),
            cancel: CancelHandle::new(),
            event_tx,
        }
    }

    /// Rebuild a conversation from a snapshot
    pub fn restore(engine: Arc<ConversationEngine>, snapshot: ConversationSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let mut conversation = Self::new(engine);
        let policy = *conversation.store.policy();
        conversation.store = SlotStore::from_profile(snapshot.profile, policy);
        conversation.turns = snapshot.turns;
        conversation.intent = snapshot.intent;
        conversation.planner = snapshot.planner;
        conversation.language = snapshot.language;
        conversation.requested = snapshot.requested;
        tracing::info!(turns = conversation.turns.len(), phase = %conversation.planner.phase, "Conversation restored");
        Ok(conversation)
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            version: SNAPSHOT_VERSION,
            profile: self.store.profile().clone(),
            turns: self.turns.clone(),
            intent: self.intent.clone(),
            planner: self.planner.clone(),
            language: self.language,
            requested: self.requested.clone(),
        }
    }

    /// Handle that cancels this conversation's in-flight retrieval
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.event_tx.subscribe()
    }

    pub fn profile(&self) -> &Profile {
        self.store.profile()
    }

    pub fn turns(&self) -> &TurnLog {
        &self.turns
    }

    pub fn phase(&self) -> PlannerPhase {
        self.planner.phase
    }

    pub fn intent(&self) -> Intent {
        self.intent.current()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// What-if comparison against the current profile
    pub async fn simulate(&self, key: SlotKey, utterance: &str) -> Result<ScenarioComparison> {
        self.engine.simulate(self.store.profile(), key, utterance).await
    }

    /// Process one user utterance
    pub async fn handle_turn(&mut self, utterance: &str) -> Result<StructuredResponse> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Err(AgentError::InvalidInput("utterance is empty".to_string()));
        }
        // Cancellations issued from here on apply to this turn's retrieval
        let token = self.cancel.token();
        let engine = self.engine.clone();

        let asked = self.planner.last_asked;
        let turn_index = self.turns.record(asked, utterance).index;
        metrics::counter!("udyami_turns_total").increment(1);
        self.emit(ConversationEvent::TurnRecorded { index: turn_index });

        if let Some(language) = requested_language(utterance) {
            if language != self.language {
                tracing::info!(language = language.display_name(), "Response language preference recorded");
                self.language = language;
            }
        }
        if wants_speed(utterance) && !self.planner.speed_mode {
            tracing::info!("Quick answer requested, capping remaining questions");
            self.planner.speed_mode = true;
        }
        let latest = wants_latest(utterance);

        // Asking for a comparison, pitch or DPR outline is reason enough to compose again
        let outputs = requested_outputs(utterance);
        let mut changed = !outputs.is_empty();
        if changed {
            tracing::info!(
                compare = outputs.compare.len(),
                bank_pitch = outputs.bank_pitch,
                dpr_outline = outputs.dpr_outline,
                "Extra output requested"
            );
            self.requested.absorb(outputs);
        }

        if let Some(key) = asked.filter(|k| self.store.get(*k).needs_reconfirmation) {
            if let Some(choice) = conflict_choice(utterance) {
                changed |= self.store.resolve(key, choice);
            }
        }

        let extraction = engine.extractor.extract_answer(utterance, self.store.profile(), asked)?;
        for ambiguity in &extraction.ambiguities {
            tracing::debug!(slot = ?ambiguity.slot, span = %ambiguity.span, reason = %ambiguity.reason, "Ambiguous span");
        }
        let report = self.store.apply(&extraction.updates);
        changed |= report.is_changed();
        tracing::debug!(
            turn = turn_index,
            changed = ?report.changed,
            conflicts = report.conflicts.len(),
            resolved = ?report.resolved,
            "Applied extraction"
        );

        let previous = self.intent.active.clone();
        let replies = self.turns.replies();
        let history = &replies[..replies.len().saturating_sub(1)];
        let decision = engine.classifier.classify(&mut self.intent, history, utterance);
        if decision.switched {
            changed = true;
            self.emit(ConversationEvent::IntentChanged {
                from: previous,
                to: decision.intent.clone(),
            });
        }

        let intent = self.intent.current();
        let phase_before = self.planner.phase;
        let plan = engine.planner.plan(
            &mut self.planner,
            &intent,
            self.store.profile(),
            PlanInput {
                clarifying: decision.clarifying,
                changed,
            },
        );
        self.phase_event(phase_before);

        let intent_confidence = if self.intent.low_confidence {
            IntentConfidence::Low
        } else {
            decision.confidence
        };
        let context = TurnContext {
            turn_index,
            intent: intent.clone(),
            intent_confidence,
            phase: self.planner.phase,
            language: self.language,
        };

        match plan {
            Plan::Ask { prompt, approximate } => {
                tracing::debug!(slot = %prompt.slot, reconfirmation = prompt.reconfirmation, "Asking");
                Ok(engine.composer.question(context, prompt, approximate))
            },
            Plan::Acknowledge => Ok(engine.composer.acknowledgement(context, UNCHANGED_MESSAGE)),
            Plan::Ready { approximate, skipped } => {
                self.compose(&engine, context, approximate, skipped, latest, token)
                    .await
            },
        }
    }

    async fn compose(
        &mut self,
        engine: &ConversationEngine,
        mut context: TurnContext,
        approximate: bool,
        skipped: Vec<SlotKey>,
        latest: bool,
        token: udyami_rag::CancelToken,
    ) -> Result<StructuredResponse> {
        // An intent still unclear at readiness is answered as discovery
        let working = match &context.intent {
            Intent::Unclear => Intent::DiscoverSchemes,
            other => other.clone(),
        };
        context.intent = working.clone();
        let turn_index = context.turn_index;
        let outputs = std::mem::take(&mut self.requested);
        let profile = self.store.profile();

        let mut data = if approximate || engine.gate.should_retrieve(&working, profile) {
            let query = engine.gate.build_query(&working, profile);
            match engine.executor.execute(&query, &engine.gate, latest, token).await {
                RetrievalOutcome::Cancelled => {
                    tracing::info!(turn = turn_index, "Retrieval superseded by a newer turn");
                    self.requested = outputs;
                    self.emit(ConversationEvent::RetrievalCancelled { turn_index });
                    return Ok(engine.composer.acknowledgement(context, SUPERSEDED_MESSAGE));
                },
                RetrievalOutcome::Degraded(e) => SchemeData::Unavailable { reason: e.to_string() },
                RetrievalOutcome::Completed {
                    result,
                    escalated,
                    fresh_failed,
                } => {
                    let stale = result.is_stale(engine.staleness_days, chrono::Utc::now());
                    let verified = !(fresh_failed || (stale && !escalated));
                    SchemeData::Retrieved { result, verified }
                },
            }
        } else {
            SchemeData::NotNeeded
        };
        if let SchemeData::Retrieved { result, .. } = &mut data {
            engine
                .named_records(&outputs.compare, profile, &mut result.records, &self.cancel)
                .await;
        }
        let degraded = matches!(data, SchemeData::Unavailable { .. });

        let phase_before = self.planner.phase;
        engine.planner.mark_composed(&mut self.planner, &working);
        self.phase_event(phase_before);
        context.phase = self.planner.phase;

        let response = engine.composer.compose(CompositionRequest {
            context,
            profile: self.store.profile(),
            data,
            approximate,
            skipped,
            outputs,
        });

        engine
            .classifier
            .decay(&mut self.intent, engine.engine.post_compose_decay);
        metrics::counter!("udyami_compositions_total", "degraded" => degraded.to_string()).increment(1);
        tracing::info!(
            turn = turn_index,
            intent = %working.kind(),
            schemes = response.scheme_count(),
            scheme_intent = is_scheme_intent(&working),
            degraded,
            "Composed recommendation"
        );
        self.emit(ConversationEvent::Composed {
            turn_index,
            schemes: response.scheme_count(),
            degraded,
        });
        Ok(response)
    }

    fn phase_event(&self, before: PlannerPhase) {
        if self.planner.phase != before {
            self.emit(ConversationEvent::PhaseChanged {
                from: before,
                to: self.planner.phase,
            });
        }
    }
}
