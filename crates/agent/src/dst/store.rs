//! Slot store

use udyami_core::{
    Confidence, ContradictionPolicy, Error, PendingValue, Profile, Result, Slot, SlotKey,
    SlotUpdate, SlotValue, ValueRelation,
};
use udyami_text_processing::ConflictChoice;

/// What a single `set` did to the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// Slot was empty and now holds the value
    Filled,
    /// Same value; confidence may have been raised
    Unchanged,
    /// Value merged with a more specific one
    Refined,
    /// Inferred value replaced by a contradicting one
    Replaced,
    /// The update settled an open conflict
    Resolved,
}

/// Summary of applying one extraction
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Slots whose value or confidence changed
    pub changed: Vec<SlotKey>,
    /// Conflicts raised against confirmed values
    pub conflicts: Vec<Error>,
    /// Open conflicts settled by a matching value
    pub resolved: Vec<SlotKey>,
}

impl ApplyReport {
    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty() || !self.conflicts.is_empty() || !self.resolved.is_empty()
    }
}

/// Canonical profile store for one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct SlotStore {
    profile: Profile,
    policy: ContradictionPolicy,
}

impl Default for SlotStore {
    fn default() -> Self {
        Self::new(ContradictionPolicy::default())
    }
}

impl SlotStore {
    pub fn new(policy: ContradictionPolicy) -> Self {
        Self {
            profile: Profile::new(),
            policy,
        }
    }

    pub fn from_profile(profile: Profile, policy: ContradictionPolicy) -> Self {
        Self { profile, policy }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn into_profile(self) -> Profile {
        self.profile
    }

    pub fn policy(&self) -> &ContradictionPolicy {
        &self.policy
    }

    pub fn get(&self, key: SlotKey) -> &Slot {
        self.profile.get(key)
    }

    pub fn is_critical_complete(&self, required: &[SlotKey]) -> bool {
        self.profile.is_critical_complete(required)
    }

    pub fn missing_of(&self, required: &[SlotKey]) -> Vec<SlotKey> {
        self.profile.missing_of(required)
    }

    /// Set a slot value
    ///
    /// A contradiction against a confirmed value is not written: the slot is
    /// flagged for reconfirmation, the incoming value is parked as pending
    /// and `Error::Conflict` is returned.
    pub fn set(
        &mut self,
        key: SlotKey,
        value: SlotValue,
        confidence: Confidence,
        evidence: impl Into<String>,
    ) -> Result<SetOutcome> {
        let mut update = SlotUpdate::inferred(key, value, evidence);
        update.confidence = confidence;
        self.set_update(&update)
    }

    fn set_update(&mut self, update: &SlotUpdate) -> Result<SetOutcome> {
        let key = update.key;
        if update.confidence == Confidence::Unset {
            return Err(Error::InvalidInput(format!("cannot set {} with unset confidence", key)));
        }
        if !key.accepts(&update.value) {
            return Err(Error::InvalidInput(format!(
                "value '{}' does not fit slot {}",
                update.value.describe(),
                key
            )));
        }

        let policy = self.policy;
        let slot = self.profile.get_mut(key);

        let Some(existing) = slot.value.clone() else {
            slot.value = Some(update.value.clone());
            slot.confidence = update.confidence;
            slot.raw_evidence.push(update.evidence.clone());
            slot.needs_clarification = update.needs_clarification;
            tracing::debug!(slot = %key, confidence = ?update.confidence, "Slot filled");
            return Ok(SetOutcome::Filled);
        };

        if slot.needs_reconfirmation {
            return Ok(Self::settle(slot, &existing, update, &policy));
        }

        match existing.relation(&update.value, &policy) {
            ValueRelation::Same => {
                let raised = update.confidence > slot.confidence;
                if raised {
                    slot.confidence = update.confidence;
                    slot.raw_evidence.push(update.evidence.clone());
                    if !update.needs_clarification && !existing.is_partial() {
                        slot.needs_clarification = false;
                    }
                }
                Ok(if raised { SetOutcome::Refined } else { SetOutcome::Unchanged })
            },
            ValueRelation::Refines => {
                let merged = existing.merge(&update.value);
                slot.needs_clarification = update.needs_clarification && merged.is_partial();
                slot.value = Some(merged);
                slot.confidence = slot.confidence.max(update.confidence);
                slot.raw_evidence.push(update.evidence.clone());
                tracing::debug!(slot = %key, confidence = ?slot.confidence, "Slot refined");
                Ok(SetOutcome::Refined)
            },
            ValueRelation::Contradicts if slot.is_confirmed() => {
                slot.needs_reconfirmation = true;
                slot.pending = Some(PendingValue {
                    value: update.value.clone(),
                    confidence: update.confidence,
                    evidence: update.evidence.clone(),
                });
                Err(Error::Conflict {
                    slot: key,
                    existing: existing.describe(),
                    incoming: update.value.describe(),
                })
            },
            ValueRelation::Contradicts => {
                slot.value = Some(update.value.clone());
                slot.confidence = update.confidence;
                slot.raw_evidence.push(update.evidence.clone());
                slot.needs_clarification = update.needs_clarification;
                tracing::debug!(slot = %key, "Inferred value replaced");
                Ok(SetOutcome::Replaced)
            },
        }
    }

    /// An update arriving while a conflict is open picks whichever side it
    /// matches; a third value becomes the new pending one.
    fn settle(slot: &mut Slot, existing: &SlotValue, update: &SlotUpdate, policy: &ContradictionPolicy) -> SetOutcome {
        if matches!(update.value, SlotValue::Qualitative(_)) {
            return SetOutcome::Unchanged;
        }
        if existing.relation(&update.value, policy) != ValueRelation::Contradicts {
            let merged = existing.merge(&update.value);
            Self::close(slot, merged, &update.evidence);
            tracing::debug!(slot = %slot.key, "Conflict settled on the earlier value");
            return SetOutcome::Resolved;
        }

        let matches_pending = slot
            .pending
            .as_ref()
            .is_some_and(|p| p.value.relation(&update.value, policy) != ValueRelation::Contradicts);
        if matches_pending {
            let merged = slot
                .pending
                .as_ref()
                .map(|p| p.value.merge(&update.value))
                .unwrap_or_else(|| update.value.clone());
            Self::close(slot, merged, &update.evidence);
            tracing::debug!(slot = %slot.key, "Conflict settled on the incoming value");
            return SetOutcome::Resolved;
        }

        slot.pending = Some(PendingValue {
            value: update.value.clone(),
            confidence: update.confidence,
            evidence: update.evidence.clone(),
        });
        SetOutcome::Unchanged
    }

    fn close(slot: &mut Slot, value: SlotValue, evidence: &str) {
        slot.needs_clarification = matches!(value, SlotValue::Qualitative(_));
        slot.value = Some(value);
        slot.confidence = Confidence::Confirmed;
        slot.needs_reconfirmation = false;
        slot.pending = None;
        slot.raw_evidence.push(evidence.to_string());
    }

    /// Apply every update from one extraction
    pub fn apply(&mut self, updates: &[SlotUpdate]) -> ApplyReport {
        let mut report = ApplyReport::default();
        for update in updates {
            match self.set_update(update) {
                Ok(SetOutcome::Unchanged) => {},
                Ok(SetOutcome::Resolved) => report.resolved.push(update.key),
                Ok(_) => report.changed.push(update.key),
                Err(conflict @ Error::Conflict { .. }) => {
                    tracing::warn!(slot = %update.key, error = %conflict, "Contradicting a confirmed value, asking to reconfirm");
                    report.conflicts.push(conflict);
                },
                Err(e) => {
                    tracing::debug!(slot = %update.key, error = %e, "Update rejected");
                },
            }
        }
        report
    }

    /// Settle an open conflict with the user's explicit choice
    ///
    /// Returns false when the slot has no open conflict.
    pub fn resolve(&mut self, key: SlotKey, choice: ConflictChoice) -> bool {
        let slot = self.profile.get_mut(key);
        if !slot.needs_reconfirmation {
            return false;
        }
        if let (ConflictChoice::Incoming, Some(pending)) = (choice, slot.pending.take()) {
            slot.value = Some(pending.value);
            slot.raw_evidence.push(pending.evidence);
        }
        slot.pending = None;
        slot.confidence = Confidence::Confirmed;
        slot.needs_reconfirmation = false;
        tracing::info!(slot = %key, choice = ?choice, "Conflict resolved");
        true
    }
}
