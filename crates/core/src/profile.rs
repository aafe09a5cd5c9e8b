//! Business profile: the aggregate of all slots for one conversation

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::amount::AmountBand;
use crate::slot::{
    BusinessNature, CollateralStatus, Confidence, FinanceRequirement, Location, OwnershipCategory,
    RegistrationStatus, Slot, SlotKey, SlotValue,
};

/// Every slot for one conversation, keyed in canonical order.
///
/// Created with all slots unset; slots are mutated through the slot store
/// and are never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawProfile")]
pub struct Profile {
    slots: BTreeMap<SlotKey, Slot>,
}

#[derive(Deserialize)]
struct RawProfile {
    #[serde(default)]
    slots: BTreeMap<SlotKey, Slot>,
}

impl From<RawProfile> for Profile {
    fn from(raw: RawProfile) -> Self {
        let mut slots = raw.slots;
        for key in SlotKey::ALL {
            slots.entry(key).or_insert_with(|| Slot::empty(key));
        }
        Self { slots }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

impl Profile {
    pub fn new() -> Self {
        Self {
            slots: SlotKey::ALL.iter().map(|k| (*k, Slot::empty(*k))).collect(),
        }
    }

    pub fn get(&self, key: SlotKey) -> &Slot {
        // Every key is present: inserted by `new` and by deserialization
        &self.slots[&key]
    }

    pub fn get_mut(&mut self, key: SlotKey) -> &mut Slot {
        self.slots.entry(key).or_insert_with(|| Slot::empty(key))
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.values()
    }

    pub fn value(&self, key: SlotKey) -> Option<&SlotValue> {
        self.get(key).value.as_ref()
    }

    pub fn confidence(&self, key: SlotKey) -> Confidence {
        self.get(key).confidence
    }

    /// Keys with any value, in canonical order
    pub fn filled_keys(&self) -> Vec<SlotKey> {
        self.slots
            .values()
            .filter(|s| s.is_filled())
            .map(|s| s.key)
            .collect()
    }

    pub fn filled_count(&self) -> usize {
        self.slots.values().filter(|s| s.is_filled()).count()
    }

    pub fn core_filled_count(&self) -> usize {
        SlotKey::CORE.iter().filter(|k| self.get(**k).is_filled()).count()
    }

    /// True iff every key in `required` has a value
    pub fn is_critical_complete(&self, required: &[SlotKey]) -> bool {
        required.iter().all(|k| self.get(*k).is_filled())
    }

    /// Unset keys from `required`, in canonical priority order
    pub fn missing_of(&self, required: &[SlotKey]) -> Vec<SlotKey> {
        let set: BTreeSet<SlotKey> = required
            .iter()
            .copied()
            .filter(|k| !self.get(*k).is_filled())
            .collect();
        set.into_iter().collect()
    }

    /// Keys whose stored value is contested
    pub fn pending_reconfirmation(&self) -> Vec<SlotKey> {
        self.slots
            .values()
            .filter(|s| s.needs_reconfirmation)
            .map(|s| s.key)
            .collect()
    }

    pub fn has_pending_reconfirmation(&self) -> bool {
        self.slots.values().any(|s| s.needs_reconfirmation)
    }

    // ====== Typed accessors ======

    pub fn nature(&self) -> Option<BusinessNature> {
        match self.value(SlotKey::BusinessNature) {
            Some(SlotValue::Nature(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn product(&self) -> Option<&str> {
        match self.value(SlotKey::ProductDescription) {
            Some(SlotValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn start_year(&self) -> Option<i32> {
        match self.value(SlotKey::BusinessAge) {
            Some(SlotValue::StartYear(y)) => Some(*y),
            _ => None,
        }
    }

    pub fn turnover(&self) -> Option<AmountBand> {
        match self.value(SlotKey::TurnoverBand) {
            Some(SlotValue::Band(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn registration(&self) -> Option<RegistrationStatus> {
        match self.value(SlotKey::RegistrationStatus) {
            Some(SlotValue::Registration(r)) => Some(*r),
            _ => None,
        }
    }

    pub fn finance(&self) -> Option<FinanceRequirement> {
        match self.value(SlotKey::FinanceRequirement) {
            Some(SlotValue::Finance(f)) => Some(*f),
            _ => None,
        }
    }

    pub fn collateral(&self) -> Option<CollateralStatus> {
        match self.value(SlotKey::CollateralStatus) {
            Some(SlotValue::Collateral(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self.value(SlotKey::Location) {
            Some(SlotValue::Location(l)) => Some(l),
            _ => None,
        }
    }

    pub fn ownership(&self) -> Option<&BTreeSet<OwnershipCategory>> {
        match self.value(SlotKey::OwnershipCategory) {
            Some(SlotValue::Ownership(o)) => Some(o),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self.value(SlotKey::Name) {
            Some(SlotValue::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    /// Snapshot of filled values restricted to `keys`
    pub fn values_of(&self, keys: &[SlotKey]) -> BTreeMap<SlotKey, SlotValue> {
        keys.iter()
            .filter_map(|k| self.value(*k).map(|v| (*k, v.clone())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(profile: &mut Profile, key: SlotKey, value: SlotValue) {
        let slot = profile.get_mut(key);
        slot.value = Some(value);
        slot.confidence = Confidence::Confirmed;
    }

    #[test]
    fn test_new_profile_is_empty() {
        let profile = Profile::new();
        assert_eq!(profile.filled_count(), 0);
        assert!(profile.slots().all(|s| s.value.is_none()));
    }

    #[test]
    fn test_missing_of_uses_canonical_order() {
        let mut profile = Profile::new();
        fill(&mut profile, SlotKey::BusinessNature, SlotValue::Nature(BusinessNature::Trading));
        let missing = profile.missing_of(&[
            SlotKey::OwnershipCategory,
            SlotKey::TurnoverBand,
            SlotKey::BusinessNature,
            SlotKey::BusinessAge,
        ]);
        assert_eq!(
            missing,
            vec![SlotKey::BusinessAge, SlotKey::TurnoverBand, SlotKey::OwnershipCategory]
        );
    }

    #[test]
    fn test_critical_complete() {
        let mut profile = Profile::new();
        let required = [SlotKey::BusinessNature, SlotKey::ProductDescription];
        assert!(!profile.is_critical_complete(&required));
        fill(&mut profile, SlotKey::BusinessNature, SlotValue::Nature(BusinessNature::Services));
        fill(&mut profile, SlotKey::ProductDescription, SlotValue::Text("tailoring".into()));
        assert!(profile.is_critical_complete(&required));
        assert!(profile.is_critical_complete(&[]));
    }

    #[test]
    fn test_typed_accessors() {
        let mut profile = Profile::new();
        fill(&mut profile, SlotKey::BusinessAge, SlotValue::StartYear(2021));
        assert_eq!(profile.start_year(), Some(2021));
        assert_eq!(profile.turnover(), None);
    }

    #[test]
    fn test_deserialize_repairs_partial_profile() {
        let json = r#"{"slots":{}}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.slots().count(), SlotKey::ALL.len());
    }
}
