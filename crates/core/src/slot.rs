//! Profile slots: keys, typed values and fill state
//!
//! A slot is one attribute of the business profile. Its value is typed per
//! key so that later updates can be compared against earlier ones and
//! classified as the same, a refinement, or a contradiction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::amount::AmountBand;
use crate::error::Error;

// =============================================================================
// Slot keys
// =============================================================================

/// Stable slot identifiers.
///
/// Declaration order is the canonical priority order used when planning
/// questions: personalization first, then the nine core intake slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotKey {
    Name,
    Age,
    BusinessNature,
    ProductDescription,
    BusinessAge,
    TurnoverBand,
    RegistrationStatus,
    FinanceRequirement,
    CollateralStatus,
    Location,
    OwnershipCategory,
}

impl SlotKey {
    pub const ALL: [SlotKey; 11] = [
        SlotKey::Name,
        SlotKey::Age,
        SlotKey::BusinessNature,
        SlotKey::ProductDescription,
        SlotKey::BusinessAge,
        SlotKey::TurnoverBand,
        SlotKey::RegistrationStatus,
        SlotKey::FinanceRequirement,
        SlotKey::CollateralStatus,
        SlotKey::Location,
        SlotKey::OwnershipCategory,
    ];

    /// The nine intake slots, in priority order
    pub const CORE: [SlotKey; 9] = [
        SlotKey::BusinessNature,
        SlotKey::ProductDescription,
        SlotKey::BusinessAge,
        SlotKey::TurnoverBand,
        SlotKey::RegistrationStatus,
        SlotKey::FinanceRequirement,
        SlotKey::CollateralStatus,
        SlotKey::Location,
        SlotKey::OwnershipCategory,
    ];

    pub const PERSONALIZATION: [SlotKey; 2] = [SlotKey::Name, SlotKey::Age];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKey::Name => "name",
            SlotKey::Age => "age",
            SlotKey::BusinessNature => "businessNature",
            SlotKey::ProductDescription => "productDescription",
            SlotKey::BusinessAge => "businessAge",
            SlotKey::TurnoverBand => "turnoverBand",
            SlotKey::RegistrationStatus => "registrationStatus",
            SlotKey::FinanceRequirement => "financeRequirement",
            SlotKey::CollateralStatus => "collateralStatus",
            SlotKey::Location => "location",
            SlotKey::OwnershipCategory => "ownershipCategory",
        }
    }

    /// Label used in profile summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            SlotKey::Name => "Name",
            SlotKey::Age => "Age",
            SlotKey::BusinessNature => "Nature of business",
            SlotKey::ProductDescription => "Product/service",
            SlotKey::BusinessAge => "Year of start",
            SlotKey::TurnoverBand => "Turnover range",
            SlotKey::RegistrationStatus => "Registration status",
            SlotKey::FinanceRequirement => "Finance requirement",
            SlotKey::CollateralStatus => "Collateral & loans",
            SlotKey::Location => "Location",
            SlotKey::OwnershipCategory => "Ownership category",
        }
    }

    pub fn is_core(&self) -> bool {
        !self.is_personalization()
    }

    pub fn is_personalization(&self) -> bool {
        matches!(self, SlotKey::Name | SlotKey::Age)
    }

    /// Whether `value` has the shape this key stores
    pub fn accepts(&self, value: &SlotValue) -> bool {
        if matches!(value, SlotValue::Qualitative(_)) {
            return true;
        }
        matches!(
            (self, value),
            (SlotKey::Name, SlotValue::Text(_))
                | (SlotKey::Age, SlotValue::Years(_))
                | (SlotKey::BusinessNature, SlotValue::Nature(_))
                | (SlotKey::ProductDescription, SlotValue::Text(_))
                | (SlotKey::BusinessAge, SlotValue::StartYear(_))
                | (SlotKey::TurnoverBand, SlotValue::Band(_))
                | (SlotKey::RegistrationStatus, SlotValue::Registration(_))
                | (SlotKey::FinanceRequirement, SlotValue::Finance(_))
                | (SlotKey::CollateralStatus, SlotValue::Collateral(_))
                | (SlotKey::Location, SlotValue::Location(_))
                | (SlotKey::OwnershipCategory, SlotValue::Ownership(_))
        )
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown slot key '{}'", s)))
    }
}

/// Fill state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Unset,
    Inferred,
    Confirmed,
}

// =============================================================================
// Typed values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessNature {
    Manufacturing,
    Services,
    Trading,
}

impl BusinessNature {
    pub fn label(&self) -> &'static str {
        match self {
            BusinessNature::Manufacturing => "Manufacturing",
            BusinessNature::Services => "Services",
            BusinessNature::Trading => "Trading",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub udyam: Option<bool>,
    pub gst: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancePurpose {
    MachineryTermLoan,
    WorkingCapital,
    TopUp,
    SubsidyOnly,
    Expansion,
    NewUnit,
    Other,
}

impl FinancePurpose {
    pub fn label(&self) -> &'static str {
        match self {
            FinancePurpose::MachineryTermLoan => "term loan for machinery",
            FinancePurpose::WorkingCapital => "working capital",
            FinancePurpose::TopUp => "top-up loan",
            FinancePurpose::SubsidyOnly => "subsidy/support only",
            FinancePurpose::Expansion => "expansion finance",
            FinancePurpose::NewUnit => "setting up a new unit",
            FinancePurpose::Other => "other finance",
        }
    }

    /// Purposes that are normally met with a term loan
    pub fn is_term_loan(&self) -> bool {
        matches!(
            self,
            FinancePurpose::MachineryTermLoan | FinancePurpose::Expansion | FinancePurpose::NewUnit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinanceRequirement {
    pub purpose: Option<FinancePurpose>,
    pub amount: Option<AmountBand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollateralStatus {
    pub has_collateral: Option<bool>,
    pub existing_loans: Option<bool>,
    pub repayment_issues: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Location {
    pub state: Option<String>,
    pub district: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipCategory {
    General,
    Women,
    Sc,
    St,
    Obc,
    Minority,
    ExServiceman,
    Divyang,
}

impl OwnershipCategory {
    pub fn label(&self) -> &'static str {
        match self {
            OwnershipCategory::General => "General",
            OwnershipCategory::Women => "Women entrepreneur",
            OwnershipCategory::Sc => "SC",
            OwnershipCategory::St => "ST",
            OwnershipCategory::Obc => "OBC",
            OwnershipCategory::Minority => "Minority",
            OwnershipCategory::ExServiceman => "Ex-serviceman",
            OwnershipCategory::Divyang => "Divyang",
        }
    }

    /// Categories that carry extra benefits under most central schemes
    pub fn is_special(&self) -> bool {
        !matches!(self, OwnershipCategory::General)
    }
}

/// Normalized slot value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SlotValue {
    Text(String),
    Years(u8),
    Nature(BusinessNature),
    StartYear(i32),
    Band(AmountBand),
    Registration(RegistrationStatus),
    Finance(FinanceRequirement),
    Collateral(CollateralStatus),
    Location(Location),
    Ownership(BTreeSet<OwnershipCategory>),
    /// Placeholder for a vague answer ("average", "decent") awaiting a
    /// disambiguating follow-up
    Qualitative(String),
}

/// How an incoming value relates to the stored one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRelation {
    Same,
    Refines,
    Contradicts,
}

/// Thresholds that separate a refinement from a contradiction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContradictionPolicy {
    /// Ladder steps a band may move and still count as a refinement
    pub band_tolerance: u8,
    /// Years a start year may drift and still count as a refinement
    pub start_year_tolerance: u16,
    /// Years a stated age may drift and still count as a refinement
    #[serde(default = "default_age_tolerance")]
    pub age_tolerance: u8,
}

fn default_age_tolerance() -> u8 {
    1
}

impl Default for ContradictionPolicy {
    fn default() -> Self {
        Self {
            band_tolerance: 0,
            start_year_tolerance: 1,
            age_tolerance: default_age_tolerance(),
        }
    }
}

#[derive(PartialEq, Eq)]
enum FieldCmp {
    Same,
    Adds,
    Conflicts,
}

fn compare_field<T: PartialEq>(old: &Option<T>, new: &Option<T>) -> FieldCmp {
    match (old, new) {
        (Some(a), Some(b)) if a != b => FieldCmp::Conflicts,
        (None, Some(_)) => FieldCmp::Adds,
        _ => FieldCmp::Same,
    }
}

fn fold(fields: &[FieldCmp]) -> ValueRelation {
    if fields.contains(&FieldCmp::Conflicts) {
        ValueRelation::Contradicts
    } else if fields.contains(&FieldCmp::Adds) {
        ValueRelation::Refines
    } else {
        ValueRelation::Same
    }
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn text_relation(old: &str, new: &str) -> ValueRelation {
    let (old, new) = (normalize_text(old), normalize_text(new));
    if old == new {
        ValueRelation::Same
    } else if old.contains(&new) || new.contains(&old) {
        ValueRelation::Refines
    } else {
        ValueRelation::Contradicts
    }
}

fn band_relation(old: &AmountBand, new: &AmountBand, policy: &ContradictionPolicy) -> ValueRelation {
    if old == new {
        ValueRelation::Same
    } else if old.distance(new) <= policy.band_tolerance {
        ValueRelation::Refines
    } else {
        ValueRelation::Contradicts
    }
}

impl SlotValue {
    /// Compare an incoming value against this (stored) one
    pub fn relation(&self, incoming: &SlotValue, policy: &ContradictionPolicy) -> ValueRelation {
        use SlotValue::*;
        match (self, incoming) {
            (Qualitative(a), Qualitative(b)) if a == b => ValueRelation::Same,
            (Qualitative(_), _) => ValueRelation::Refines,
            // A vague answer never displaces a concrete one
            (_, Qualitative(_)) => ValueRelation::Same,
            (Text(a), Text(b)) => text_relation(a, b),
            (Years(a), Years(b)) => {
                let drift = a.abs_diff(*b);
                if drift == 0 {
                    ValueRelation::Same
                } else if drift <= policy.age_tolerance {
                    ValueRelation::Refines
                } else {
                    ValueRelation::Contradicts
                }
            },
            (Nature(a), Nature(b)) => {
                if a == b {
                    ValueRelation::Same
                } else {
                    ValueRelation::Contradicts
                }
            },
            (StartYear(a), StartYear(b)) => {
                let drift = a.abs_diff(*b);
                if drift == 0 {
                    ValueRelation::Same
                } else if drift <= u32::from(policy.start_year_tolerance) {
                    ValueRelation::Refines
                } else {
                    ValueRelation::Contradicts
                }
            },
            (Band(a), Band(b)) => band_relation(a, b, policy),
            (Registration(a), Registration(b)) => {
                fold(&[compare_field(&a.udyam, &b.udyam), compare_field(&a.gst, &b.gst)])
            },
            (Finance(a), Finance(b)) => {
                let amount = match (&a.amount, &b.amount) {
                    (Some(x), Some(y)) => match band_relation(x, y, policy) {
                        ValueRelation::Same => FieldCmp::Same,
                        ValueRelation::Refines => FieldCmp::Adds,
                        ValueRelation::Contradicts => FieldCmp::Conflicts,
                    },
                    (None, Some(_)) => FieldCmp::Adds,
                    _ => FieldCmp::Same,
                };
                fold(&[compare_field(&a.purpose, &b.purpose), amount])
            },
            (Collateral(a), Collateral(b)) => fold(&[
                compare_field(&a.has_collateral, &b.has_collateral),
                compare_field(&a.existing_loans, &b.existing_loans),
                compare_field(&a.repayment_issues, &b.repayment_issues),
            ]),
            (SlotValue::Location(a), SlotValue::Location(b)) => {
                let lower = |s: &Option<String>| s.as_ref().map(|v| v.to_lowercase());
                fold(&[
                    compare_field(&lower(&a.state), &lower(&b.state)),
                    compare_field(&lower(&a.district), &lower(&b.district)),
                ])
            },
            (Ownership(a), Ownership(b)) => {
                if a == b {
                    return ValueRelation::Same;
                }
                let general = OwnershipCategory::General;
                let a_general = a.contains(&general);
                let b_general = b.contains(&general);
                let a_special = a.iter().any(|c| c.is_special());
                let b_special = b.iter().any(|c| c.is_special());
                if (a_general && b_special) || (b_general && a_special) {
                    ValueRelation::Contradicts
                } else {
                    ValueRelation::Refines
                }
            },
            _ => ValueRelation::Contradicts,
        }
    }

    /// Combine a refining value into this one
    pub fn merge(&self, incoming: &SlotValue) -> SlotValue {
        use SlotValue::*;
        match (self, incoming) {
            (_, Qualitative(_)) if !matches!(self, Qualitative(_)) => self.clone(),
            (Text(a), Text(b)) => {
                if b.len() >= a.len() {
                    Text(b.clone())
                } else {
                    Text(a.clone())
                }
            },
            (Registration(a), Registration(b)) => Registration(RegistrationStatus {
                udyam: b.udyam.or(a.udyam),
                gst: b.gst.or(a.gst),
            }),
            (Finance(a), Finance(b)) => Finance(FinanceRequirement {
                purpose: b.purpose.or(a.purpose),
                amount: b.amount.or(a.amount),
            }),
            (Collateral(a), Collateral(b)) => Collateral(CollateralStatus {
                has_collateral: b.has_collateral.or(a.has_collateral),
                existing_loans: b.existing_loans.or(a.existing_loans),
                repayment_issues: b.repayment_issues.or(a.repayment_issues),
            }),
            (SlotValue::Location(a), SlotValue::Location(b)) => SlotValue::Location(self::Location {
                state: b.state.clone().or_else(|| a.state.clone()),
                district: b.district.clone().or_else(|| a.district.clone()),
            }),
            (Ownership(a), Ownership(b)) => Ownership(a.union(b).copied().collect()),
            _ => incoming.clone(),
        }
    }

    /// Whether the value still lacks a part the planner should follow up on
    pub fn is_partial(&self) -> bool {
        match self {
            SlotValue::Qualitative(_) => true,
            SlotValue::Finance(f) => f.amount.is_none() || f.purpose.is_none(),
            SlotValue::Registration(r) => r.udyam.is_none() || r.gst.is_none(),
            SlotValue::Location(l) => l.state.is_none(),
            _ => false,
        }
    }

    /// Human readable rendering for summaries
    pub fn describe(&self) -> String {
        match self {
            SlotValue::Text(s) => s.clone(),
            SlotValue::Years(y) => format!("{} years", y),
            SlotValue::Nature(n) => n.label().to_string(),
            SlotValue::StartYear(y) => format!("Started {}", y),
            SlotValue::Band(b) => b.label(),
            SlotValue::Registration(r) => {
                let part = |name: &str, v: Option<bool>| match v {
                    Some(true) => format!("{}: yes", name),
                    Some(false) => format!("{}: no", name),
                    None => format!("{}: not stated", name),
                };
                format!("{}, {}", part("Udyam", r.udyam), part("GST", r.gst))
            },
            SlotValue::Finance(f) => {
                let purpose = f.purpose.map(|p| p.label()).unwrap_or("finance");
                match &f.amount {
                    Some(band) => format!("{} ({})", capitalize(purpose), band.label()),
                    None => format!("{} (amount not stated)", capitalize(purpose)),
                }
            },
            SlotValue::Collateral(c) => {
                let mut parts = Vec::new();
                match c.has_collateral {
                    Some(true) => parts.push("Collateral available"),
                    Some(false) => parts.push("No collateral"),
                    None => {},
                }
                match c.existing_loans {
                    Some(true) => parts.push("existing loans"),
                    Some(false) => parts.push("no existing loans"),
                    None => {},
                }
                match c.repayment_issues {
                    Some(true) => parts.push("EMI delays/NPA reported"),
                    Some(false) => parts.push("EMIs on time"),
                    None => {},
                }
                if parts.is_empty() {
                    "Not stated".to_string()
                } else {
                    parts.join(", ")
                }
            },
            SlotValue::Location(l) => match (&l.district, &l.state) {
                (Some(d), Some(s)) => format!("{}, {}", d, s),
                (None, Some(s)) => s.clone(),
                (Some(d), None) => d.clone(),
                (None, None) => "Not stated".to_string(),
            },
            SlotValue::Ownership(set) => set
                .iter()
                .map(|c| c.label())
                .collect::<Vec<_>>()
                .join(", "),
            SlotValue::Qualitative(s) => format!("\"{}\" (to be clarified)", s),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// =============================================================================
// Slot state
// =============================================================================

/// A contradictory value held back until the conflict is resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingValue {
    pub value: SlotValue,
    pub confidence: Confidence,
    pub evidence: String,
}

/// A single profile attribute and its fill state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub key: SlotKey,
    pub value: Option<SlotValue>,
    pub confidence: Confidence,
    pub raw_evidence: Vec<String>,
    pub needs_reconfirmation: bool,
    /// Contradicting value awaiting an explicit resolution
    pub pending: Option<PendingValue>,
    /// Set when the value is a stub that deserves one targeted follow-up
    pub needs_clarification: bool,
}

impl Slot {
    pub fn empty(key: SlotKey) -> Self {
        Self {
            key,
            value: None,
            confidence: Confidence::Unset,
            raw_evidence: Vec::new(),
            needs_reconfirmation: false,
            pending: None,
            needs_clarification: false,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.confidence != Confidence::Unset
    }

    pub fn is_confirmed(&self) -> bool {
        self.confidence == Confidence::Confirmed
    }

    /// Display string for summaries
    pub fn describe(&self) -> String {
        self.value
            .as_ref()
            .map(|v| v.describe())
            .unwrap_or_else(|| "Not provided".to_string())
    }
}

/// One proposed change produced by extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUpdate {
    pub key: SlotKey,
    pub value: SlotValue,
    pub confidence: Confidence,
    pub evidence: String,
    /// The answer was matched but is too vague to confirm
    pub needs_clarification: bool,
}

impl SlotUpdate {
    pub fn confirmed(key: SlotKey, value: SlotValue, evidence: impl Into<String>) -> Self {
        Self {
            key,
            value,
            confidence: Confidence::Confirmed,
            evidence: evidence.into(),
            needs_clarification: false,
        }
    }

    pub fn inferred(key: SlotKey, value: SlotValue, evidence: impl Into<String>) -> Self {
        Self {
            key,
            value,
            confidence: Confidence::Inferred,
            evidence: evidence.into(),
            needs_clarification: false,
        }
    }

    /// Inferred stub that asks the planner for one disambiguating follow-up
    pub fn vague(key: SlotKey, value: SlotValue, evidence: impl Into<String>) -> Self {
        Self {
            needs_clarification: true,
            ..Self::inferred(key, value, evidence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{CRORE, LAKH};

    fn policy() -> ContradictionPolicy {
        ContradictionPolicy::default()
    }

    #[test]
    fn test_key_order_is_priority_order() {
        let mut keys = SlotKey::CORE.to_vec();
        keys.reverse();
        keys.sort();
        assert_eq!(keys, SlotKey::CORE.to_vec());
        assert!(SlotKey::Name < SlotKey::BusinessNature);
        assert!(SlotKey::Location < SlotKey::OwnershipCategory);
    }

    #[test]
    fn test_key_parse_roundtrip() {
        for key in SlotKey::ALL {
            assert_eq!(key.as_str().parse::<SlotKey>().unwrap(), key);
        }
        assert!("colour".parse::<SlotKey>().is_err());
    }

    #[test]
    fn test_key_accepts_matching_shape() {
        assert!(SlotKey::TurnoverBand.accepts(&SlotValue::Band(AmountBand::from_amount(LAKH))));
        assert!(!SlotKey::TurnoverBand.accepts(&SlotValue::Text("big".into())));
        assert!(SlotKey::TurnoverBand.accepts(&SlotValue::Qualitative("average".into())));
    }

    #[test]
    fn test_adjacent_band_is_contradiction_by_default() {
        let old = SlotValue::Band(AmountBand::from_amount(80 * LAKH));
        let new = SlotValue::Band(AmountBand::from_amount(2 * CRORE));
        assert_eq!(old.relation(&new, &policy()), ValueRelation::Contradicts);

        let lenient = ContradictionPolicy {
            band_tolerance: 1,
            ..policy()
        };
        assert_eq!(old.relation(&new, &lenient), ValueRelation::Refines);
    }

    #[test]
    fn test_overlapping_band_refines() {
        let old = SlotValue::Band(AmountBand::from_range(40 * LAKH, 60 * LAKH));
        let new = SlotValue::Band(AmountBand::from_amount(55 * LAKH));
        assert_eq!(old.relation(&new, &policy()), ValueRelation::Refines);
    }

    #[test]
    fn test_registration_fills_unknown_field() {
        let old = SlotValue::Registration(RegistrationStatus {
            udyam: Some(true),
            gst: None,
        });
        let new = SlotValue::Registration(RegistrationStatus {
            udyam: None,
            gst: Some(false),
        });
        assert_eq!(old.relation(&new, &policy()), ValueRelation::Refines);
        assert_eq!(
            old.merge(&new),
            SlotValue::Registration(RegistrationStatus {
                udyam: Some(true),
                gst: Some(false),
            })
        );

        let flipped = SlotValue::Registration(RegistrationStatus {
            udyam: Some(false),
            gst: None,
        });
        assert_eq!(old.relation(&flipped, &policy()), ValueRelation::Contradicts);
    }

    #[test]
    fn test_text_containment_refines() {
        let old = SlotValue::Text("steel furniture".into());
        let new = SlotValue::Text("steel furniture for offices".into());
        assert_eq!(old.relation(&new, &policy()), ValueRelation::Refines);
        assert_eq!(
            old.relation(&SlotValue::Text("bakery".into()), &policy()),
            ValueRelation::Contradicts
        );
    }

    #[test]
    fn test_ownership_general_vs_special() {
        let general: BTreeSet<_> = [OwnershipCategory::General].into_iter().collect();
        let women: BTreeSet<_> = [OwnershipCategory::Women].into_iter().collect();
        let sc: BTreeSet<_> = [OwnershipCategory::Sc].into_iter().collect();
        assert_eq!(
            SlotValue::Ownership(general).relation(&SlotValue::Ownership(women.clone()), &policy()),
            ValueRelation::Contradicts
        );
        let merged = SlotValue::Ownership(women.clone()).merge(&SlotValue::Ownership(sc.clone()));
        assert_eq!(
            SlotValue::Ownership(women).relation(&SlotValue::Ownership(sc), &policy()),
            ValueRelation::Refines
        );
        if let SlotValue::Ownership(set) = merged {
            assert_eq!(set.len(), 2);
        } else {
            panic!("expected ownership set");
        }
    }

    #[test]
    fn test_qualitative_never_displaces_concrete() {
        let concrete = SlotValue::Band(AmountBand::from_amount(20 * LAKH));
        let vague = SlotValue::Qualitative("average".into());
        assert_eq!(concrete.relation(&vague, &policy()), ValueRelation::Same);
        assert_eq!(vague.relation(&concrete, &policy()), ValueRelation::Refines);
        assert_eq!(concrete.merge(&vague), concrete);
    }

    #[test]
    fn test_start_year_tolerance() {
        let old = SlotValue::StartYear(2021);
        assert_eq!(old.relation(&SlotValue::StartYear(2022), &policy()), ValueRelation::Refines);
        assert_eq!(
            old.relation(&SlotValue::StartYear(2015), &policy()),
            ValueRelation::Contradicts
        );
    }

    #[test]
    fn test_age_tolerance_follows_policy() {
        let old = SlotValue::Years(34);
        assert_eq!(old.relation(&SlotValue::Years(35), &policy()), ValueRelation::Refines);
        assert_eq!(old.relation(&SlotValue::Years(37), &policy()), ValueRelation::Contradicts);

        let lenient = ContradictionPolicy {
            age_tolerance: 3,
            ..policy()
        };
        assert_eq!(old.relation(&SlotValue::Years(37), &lenient), ValueRelation::Refines);

        let strict = ContradictionPolicy {
            age_tolerance: 0,
            ..policy()
        };
        assert_eq!(old.relation(&SlotValue::Years(35), &strict), ValueRelation::Contradicts);
    }

    #[test]
    fn test_partial_locations_merge() {
        let state_only = SlotValue::Location(Location {
            state: Some("Maharashtra".into()),
            district: None,
        });
        let district_only = SlotValue::Location(Location {
            state: None,
            district: Some("Pune".into()),
        });
        assert_eq!(state_only.relation(&district_only, &policy()), ValueRelation::Refines);
        assert_eq!(
            state_only.merge(&district_only),
            SlotValue::Location(Location {
                state: Some("Maharashtra".into()),
                district: Some("Pune".into()),
            })
        );
        assert!(!state_only.merge(&district_only).is_partial());
    }

    #[test]
    fn test_describe_finance() {
        let value = SlotValue::Finance(FinanceRequirement {
            purpose: Some(FinancePurpose::MachineryTermLoan),
            amount: Some(AmountBand::from_amount(20 * LAKH)),
        });
        assert_eq!(value.describe(), "Term loan for machinery (₹10 lakh–₹50 lakh)");
    }

    #[test]
    fn test_partial_values() {
        assert!(SlotValue::Finance(FinanceRequirement {
            purpose: Some(FinancePurpose::WorkingCapital),
            amount: None,
        })
        .is_partial());
        assert!(!SlotValue::Nature(BusinessNature::Trading).is_partial());
    }
}
