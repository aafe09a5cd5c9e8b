//! User intents and their breadth

use serde::{Deserialize, Serialize};
use std::fmt;

/// Intent without its payload, used as a configuration key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    DiscoverSchemes,
    CheckSchemeEligibility,
    DocumentChecklist,
    DelayedPayment,
    MarketAccess,
    GeneralAdvice,
    Unclear,
}

impl IntentKind {
    pub const ALL: [IntentKind; 7] = [
        IntentKind::DiscoverSchemes,
        IntentKind::CheckSchemeEligibility,
        IntentKind::DocumentChecklist,
        IntentKind::DelayedPayment,
        IntentKind::MarketAccess,
        IntentKind::GeneralAdvice,
        IntentKind::Unclear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::DiscoverSchemes => "discover_schemes",
            IntentKind::CheckSchemeEligibility => "check_scheme_eligibility",
            IntentKind::DocumentChecklist => "document_checklist",
            IntentKind::DelayedPayment => "delayed_payment",
            IntentKind::MarketAccess => "market_access",
            IntentKind::GeneralAdvice => "general_advice",
            IntentKind::Unclear => "unclear",
        }
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the profile an intent draws on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentBreadth {
    /// Whole filled profile, full profile block
    Broad,
    /// Critical plus filled helpful slots, key-details block
    Focused,
    /// Critical slots and the named reference only, key-details block
    Narrow,
}

/// Closed set of user intents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    #[default]
    DiscoverSchemes,
    CheckSchemeEligibility {
        scheme: String,
    },
    DocumentChecklist,
    DelayedPayment,
    MarketAccess {
        platform: String,
    },
    GeneralAdvice,
    Unclear,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::DiscoverSchemes => IntentKind::DiscoverSchemes,
            Intent::CheckSchemeEligibility { .. } => IntentKind::CheckSchemeEligibility,
            Intent::DocumentChecklist => IntentKind::DocumentChecklist,
            Intent::DelayedPayment => IntentKind::DelayedPayment,
            Intent::MarketAccess { .. } => IntentKind::MarketAccess,
            Intent::GeneralAdvice => IntentKind::GeneralAdvice,
            Intent::Unclear => IntentKind::Unclear,
        }
    }

    /// Named scheme or platform carried by narrow intents
    pub fn reference(&self) -> Option<&str> {
        match self {
            Intent::CheckSchemeEligibility { scheme } => Some(scheme.as_str()),
            Intent::MarketAccess { platform } => Some(platform.as_str()),
            _ => None,
        }
    }

    pub fn breadth(&self) -> IntentBreadth {
        match self {
            Intent::DiscoverSchemes | Intent::GeneralAdvice | Intent::Unclear => IntentBreadth::Broad,
            Intent::CheckSchemeEligibility { .. } | Intent::MarketAccess { .. } => {
                IntentBreadth::Narrow
            },
            Intent::DocumentChecklist | Intent::DelayedPayment => IntentBreadth::Focused,
        }
    }

    pub fn is_broad(&self) -> bool {
        self.breadth() == IntentBreadth::Broad
    }

    pub fn is_unclear(&self) -> bool {
        matches!(self, Intent::Unclear)
    }

    /// Short human label
    pub fn label(&self) -> String {
        match self {
            Intent::DiscoverSchemes => "Discover schemes".to_string(),
            Intent::CheckSchemeEligibility { scheme } => format!("Check eligibility for {}", scheme),
            Intent::DocumentChecklist => "Document checklist".to_string(),
            Intent::DelayedPayment => "Delayed payment recovery".to_string(),
            Intent::MarketAccess { platform } => format!("Market access via {}", platform),
            Intent::GeneralAdvice => "General advice".to_string(),
            Intent::Unclear => "Unclear".to_string(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Confidence in the active intent, surfaced as a caveat when low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntentConfidence {
    Low,
    #[default]
    Medium,
    High,
}

impl IntentConfidence {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.75 {
            IntentConfidence::High
        } else if score >= 0.45 {
            IntentConfidence::Medium
        } else {
            IntentConfidence::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadth() {
        assert_eq!(Intent::DiscoverSchemes.breadth(), IntentBreadth::Broad);
        assert_eq!(
            Intent::CheckSchemeEligibility {
                scheme: "CGTMSE".into()
            }
            .breadth(),
            IntentBreadth::Narrow
        );
        assert_eq!(Intent::DocumentChecklist.breadth(), IntentBreadth::Focused);
    }

    #[test]
    fn test_reference() {
        let intent = Intent::MarketAccess {
            platform: "GeM".into(),
        };
        assert_eq!(intent.reference(), Some("GeM"));
        assert_eq!(intent.kind(), IntentKind::MarketAccess);
        assert_eq!(Intent::GeneralAdvice.reference(), None);
    }

    #[test]
    fn test_intent_serde_shape() {
        let intent = Intent::CheckSchemeEligibility {
            scheme: "PMEGP".into(),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["type"], "check_scheme_eligibility");
        assert_eq!(json["scheme"], "PMEGP");
        let back: Intent = serde_json::from_value(json).unwrap();
        assert_eq!(back, intent);
    }

    #[test]
    fn test_confidence_from_score() {
        assert_eq!(IntentConfidence::from_score(0.9), IntentConfidence::High);
        assert_eq!(IntentConfidence::from_score(0.5), IntentConfidence::Medium);
        assert_eq!(IntentConfidence::from_score(0.2), IntentConfidence::Low);
    }
}
