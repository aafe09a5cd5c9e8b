//! Question wording per slot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use udyami_core::SlotKey;

/// How a slot is asked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotPrompt {
    /// Short title used in "Question X of N – <title>"
    pub title: String,
    /// Exact question text
    pub question: String,
    /// One short sub-question on the same slot, offered after a vague or
    /// partial answer
    #[serde(default)]
    pub clarifier: Option<String>,
}

impl SlotPrompt {
    fn new(title: &str, question: &str, clarifier: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            question: question.to_string(),
            clarifier: clarifier.map(str::to_string),
        }
    }
}

/// Built-in question wording
pub fn default_prompts() -> BTreeMap<SlotKey, SlotPrompt> {
    let mut map = BTreeMap::new();
    map.insert(
        SlotKey::Name,
        SlotPrompt::new("Your name", "Before we begin, may I know your name?", None),
    );
    map.insert(
        SlotKey::Age,
        SlotPrompt::new(
            "Your age",
            "And how old are you? Some schemes have age conditions for the applicant.",
            None,
        ),
    );
    map.insert(
        SlotKey::BusinessNature,
        SlotPrompt::new(
            "Nature of business",
            "Is your business mainly manufacturing, services, or trading?",
            Some("If it is a mix, which one brings most of your revenue?"),
        ),
    );
    map.insert(
        SlotKey::ProductDescription,
        SlotPrompt::new(
            "Product / service",
            "What do you manufacture or provide? (1–2 lines)",
            None,
        ),
    );
    map.insert(
        SlotKey::BusinessAge,
        SlotPrompt::new(
            "Age of business",
            "In which year did your business start operations?",
            Some("If you have not started yet, just say so."),
        ),
    );
    map.insert(
        SlotKey::TurnoverBand,
        SlotPrompt::new(
            "Size and turnover",
            "What is your approximate annual turnover? You can give a rough range.",
            Some("Is it up to ₹10 lakh, ₹10–50 lakh, ₹50 lakh–₹1 crore, ₹1–5 crore, or above ₹5 crore?"),
        ),
    );
    map.insert(
        SlotKey::RegistrationStatus,
        SlotPrompt::new(
            "Registration status",
            "Do you have Udyam registration? Are you GST registered?",
            Some("Please tell me about Udyam and GST separately."),
        ),
    );
    map.insert(
        SlotKey::FinanceRequirement,
        SlotPrompt::new(
            "Finance requirement",
            "What do you need right now (for example: new term loan for machinery, working capital, top-up loan, only subsidy/support), and roughly how much amount?",
            Some("Roughly how much amount do you need?"),
        ),
    );
    map.insert(
        SlotKey::CollateralStatus,
        SlotPrompt::new(
            "Collateral & existing loans",
            "Do you have any collateral (property, machinery, etc.)? Do you already have any loans? Are EMIs being paid on time (any NPAs or defaults)?",
            Some("Are any EMIs delayed, or is any account marked NPA?"),
        ),
    );
    map.insert(
        SlotKey::Location,
        SlotPrompt::new(
            "Location",
            "In which state and district is your unit located?",
            Some("Please mention both the state and the district."),
        ),
    );
    map.insert(
        SlotKey::OwnershipCategory,
        SlotPrompt::new(
            "Ownership category",
            "Are you a women entrepreneur, SC/ST, minority, ex-serviceman, or any other special category? If yes, please mention.",
            Some("If none of these apply, just say 'general'."),
        ),
    );
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_slot_has_prompt() {
        let prompts = default_prompts();
        for key in SlotKey::ALL {
            assert!(prompts.contains_key(&key), "missing prompt for {}", key);
        }
    }

    #[test]
    fn test_turnover_clarifier_offers_bands() {
        let prompts = default_prompts();
        let clarifier = prompts[&SlotKey::TurnoverBand].clarifier.as_deref().unwrap();
        assert!(clarifier.contains("₹50 lakh–₹1 crore"));
    }
}
