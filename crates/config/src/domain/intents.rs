//! Intent requirement tables
//!
//! Each intent declares which slots are critical (block readiness) and which
//! are helpful (used when present), plus the phrases used to detect it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use udyami_core::{IntentKind, SlotKey};

/// Single intent definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDefinition {
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Slots that must be filled before composing
    #[serde(default)]
    pub critical: Vec<SlotKey>,
    /// Slots used when present
    #[serde(default)]
    pub helpful: Vec<SlotKey>,
    /// Detection phrases (lowercase)
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Strong phrases that alone identify the intent
    #[serde(default)]
    pub strong_phrases: Vec<String>,
}

impl IntentDefinition {
    fn new(
        description: &str,
        critical: &[SlotKey],
        helpful: &[SlotKey],
        keywords: &[&str],
        strong_phrases: &[&str],
    ) -> Self {
        Self {
            description: description.to_string(),
            critical: critical.to_vec(),
            helpful: helpful.to_vec(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            strong_phrases: strong_phrases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Built-in intent table
pub fn default_intents() -> BTreeMap<IntentKind, IntentDefinition> {
    use SlotKey::*;
    let mut map = BTreeMap::new();

    map.insert(
        IntentKind::DiscoverSchemes,
        IntentDefinition::new(
            "Find government loan and subsidy schemes that fit the business",
            &[
                BusinessNature,
                BusinessAge,
                TurnoverBand,
                RegistrationStatus,
                FinanceRequirement,
                CollateralStatus,
                Location,
                OwnershipCategory,
            ],
            &[ProductDescription],
            &[
                "scheme", "schemes", "yojana", "subsidy", "loan", "loans", "finance", "funding",
                "fund", "need", "capital", "support", "government", "sarkari", "chahiye",
                "machinery", "working capital", "money",
            ],
            &["which schemes", "what schemes", "schemes for me", "suggest schemes", "kaun si yojana"],
        ),
    );

    map.insert(
        IntentKind::CheckSchemeEligibility,
        IntentDefinition::new(
            "Check eligibility for one named scheme",
            &[
                BusinessNature,
                BusinessAge,
                TurnoverBand,
                RegistrationStatus,
                FinanceRequirement,
                CollateralStatus,
            ],
            &[Location, OwnershipCategory, ProductDescription],
            &["eligible", "eligibility", "qualify", "can i get", "can i apply", "patra", "apply for"],
            &["am i eligible", "check eligibility", "do i qualify"],
        ),
    );

    map.insert(
        IntentKind::DocumentChecklist,
        IntentDefinition::new(
            "List the documents needed for an application",
            &[BusinessNature, RegistrationStatus, FinanceRequirement],
            &[CollateralStatus, BusinessAge, TurnoverBand],
            &["document", "documents", "papers", "paperwork", "checklist", "kagaz", "dastavez", "kyc"],
            &["what documents", "which documents", "documents required", "document checklist"],
        ),
    );

    map.insert(
        IntentKind::DelayedPayment,
        IntentDefinition::new(
            "Recover delayed payments from buyers",
            &[BusinessNature, RegistrationStatus],
            &[TurnoverBand, Location],
            &["payment", "delayed", "dues", "outstanding", "not paid", "unpaid", "samadhaan", "buyer"],
            &["delayed payment", "payment delay", "not paying", "pending payment", "msme samadhaan"],
        ),
    );

    map.insert(
        IntentKind::MarketAccess,
        IntentDefinition::new(
            "Sell through a government or digital marketplace",
            &[BusinessNature, ProductDescription, RegistrationStatus],
            &[Location, TurnoverBand],
            &["sell", "marketplace", "market", "buyers", "tender", "online", "customers", "vendor"],
            &["sell on gem", "register on gem", "join ondc", "sell online", "market access"],
        ),
    );

    map.insert(
        IntentKind::GeneralAdvice,
        IntentDefinition::new(
            "General business guidance",
            &[BusinessNature],
            &[ProductDescription, BusinessAge, TurnoverBand, Location],
            &["advice", "guide", "tips", "grow", "how to", "help", "marketing", "pricing", "suggest"],
            &["business advice", "how do i grow"],
        ),
    );

    map.insert(
        IntentKind::Unclear,
        IntentDefinition::new("Intent not yet known", &[], &[], &[], &[]),
    );

    map
}
