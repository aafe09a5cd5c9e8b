//! Retrieval gate
//!
//! Decides whether a turn retrieves at all, which slots the query carries
//! and whether a freshness lookup follows the primary one. Escalation is a
//! policy decision on a successful result; failed primary calls never
//! escalate.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;

use udyami_config::{DomainConfig, RetrievalConfig};
use udyami_core::{Intent, IntentBreadth, Profile, RetrievalQuery, RetrievalResult, SlotKey, SlotValue};

/// Retrieval policy for one deployment
#[derive(Debug, Clone)]
pub struct RetrievalGate {
    domain: Arc<DomainConfig>,
    top_k: usize,
    staleness_days: i64,
    fresh_search_enabled: bool,
}

impl RetrievalGate {
    pub fn new(domain: Arc<DomainConfig>, config: &RetrievalConfig) -> Self {
        Self {
            domain,
            top_k: config.top_k,
            staleness_days: config.staleness_days,
            fresh_search_enabled: config.fresh_search_enabled,
        }
    }

    /// True exactly when every critical slot of the intent is filled and
    /// none of them is contested
    pub fn should_retrieve(&self, intent: &Intent, profile: &Profile) -> bool {
        let critical = self.domain.critical_for(intent);
        profile.missing_of(&critical).is_empty()
            && !critical.iter().any(|k| profile.get(*k).needs_reconfirmation)
    }

    /// Slots a query for `intent` carries, in canonical order
    ///
    /// Broad intents use every filled intake slot; focused intents the
    /// critical slots plus filled helpful ones; narrow intents only the
    /// critical slots (their reference travels separately).
    pub fn query_slots(&self, intent: &Intent, profile: &Profile) -> Vec<SlotKey> {
        let critical = self.domain.critical_for(intent);
        let mut keys: Vec<SlotKey> = match intent.breadth() {
            IntentBreadth::Broad => SlotKey::CORE.to_vec(),
            IntentBreadth::Focused => {
                let mut keys = critical;
                keys.extend(self.domain.helpful_for(intent));
                keys
            },
            IntentBreadth::Narrow => critical,
        };
        keys.sort();
        keys.dedup();
        keys.retain(|k| profile.get(*k).is_filled() && !profile.get(*k).needs_reconfirmation);
        keys
    }

    /// Query scoped to the intent
    pub fn build_query(&self, intent: &Intent, profile: &Profile) -> RetrievalQuery {
        let keys = self.query_slots(intent, profile);
        let snapshot: BTreeMap<SlotKey, SlotValue> = profile.values_of(&keys);

        let mut parts = vec![intent.label()];
        if let Some(reference) = intent.reference() {
            parts.push(reference.to_string());
        }
        parts.extend(
            snapshot
                .iter()
                .map(|(key, value)| format!("{}: {}", key.display_name(), value.describe())),
        );

        let query = RetrievalQuery {
            text: parts.join("; "),
            intent: intent.clone(),
            snapshot,
            reference: intent.reference().map(str::to_string),
            top_k: self.top_k,
        };
        tracing::debug!(
            intent = %intent.kind(),
            slots = query.snapshot.len(),
            reference = ?query.reference,
            "Built retrieval query"
        );
        query
    }

    /// Whether a freshness lookup should follow a successful primary result
    pub fn should_escalate(&self, result: &RetrievalResult, wants_latest: bool, now: DateTime<Utc>) -> bool {
        self.fresh_search_enabled && (wants_latest || result.is_stale(self.staleness_days, now))
    }
}
