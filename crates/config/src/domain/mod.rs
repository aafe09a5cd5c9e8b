//! Domain tables
//!
//! Intent requirements, slot question wording and the named scheme and
//! platform vocabularies. A built-in table is always available; a YAML file
//! may override any part of it:
//!
//! ```yaml
//! intents:
//!   document_checklist:
//!     critical: [businessNature, registrationStatus]
//!     helpful: [financeRequirement]
//!     keywords: [documents, papers]
//! slots:
//!   turnoverBand:
//!     title: Turnover
//!     question: What is your yearly turnover?
//! ```

mod intents;
mod slots;

pub use intents::{default_intents, IntentDefinition};
pub use slots::{default_prompts, SlotPrompt};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use udyami_core::{Intent, IntentKind, SlotKey};

use crate::ConfigError;

/// Intent, slot and vocabulary tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default)]
    pub intents: BTreeMap<IntentKind, IntentDefinition>,
    #[serde(default)]
    pub slots: BTreeMap<SlotKey, SlotPrompt>,
    /// Scheme names recognized as eligibility references
    #[serde(default)]
    pub scheme_names: Vec<String>,
    /// Platform names recognized as market-access references
    #[serde(default)]
    pub platform_names: Vec<String>,
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            intents: default_intents(),
            slots: default_prompts(),
            scheme_names: default_scheme_names(),
            platform_names: default_platform_names(),
        }
    }
}

fn default_scheme_names() -> Vec<String> {
    [
        "PMEGP",
        "CGTMSE",
        "Mudra",
        "Stand-Up India",
        "CLCSS",
        "MSE-CDP",
        "TEQUP",
        "ZED",
        "SIDBI",
        "PMFME",
        "PM Vishwakarma",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_platform_names() -> Vec<String> {
    ["GeM", "ONDC", "Amazon Saheli", "Flipkart Samarth"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl DomainConfig {
    /// Load overrides from a YAML file; anything the file omits keeps the
    /// built-in value
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: DomainConfig =
            serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.fill_defaults();
        config.validate()?;
        tracing::debug!(
            intents = config.intents.len(),
            slots = config.slots.len(),
            "Loaded domain tables"
        );
        Ok(config)
    }

    fn fill_defaults(&mut self) {
        let defaults = DomainConfig::default();
        for (kind, def) in defaults.intents {
            self.intents.entry(kind).or_insert(def);
        }
        for (key, prompt) in defaults.slots {
            self.slots.entry(key).or_insert(prompt);
        }
        if self.scheme_names.is_empty() {
            self.scheme_names = defaults.scheme_names;
        }
        if self.platform_names.is_empty() {
            self.platform_names = defaults.platform_names;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (kind, def) in &self.intents {
            let critical: BTreeSet<_> = def.critical.iter().collect();
            if let Some(overlap) = def.helpful.iter().find(|k| critical.contains(k)) {
                return Err(ConfigError::InvalidValue {
                    field: format!("intents.{}.helpful", kind),
                    message: format!("{} is already critical", overlap),
                });
            }
            if *kind == IntentKind::Unclear && !def.critical.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "intents.unclear.critical".to_string(),
                    message: "Unclear must not require slots".to_string(),
                });
            }
        }
        if let Some(key) = SlotKey::ALL.iter().find(|k| !self.slots.contains_key(k)) {
            return Err(ConfigError::MissingField(format!("slots.{}", key)));
        }
        Ok(())
    }

    /// Critical slots of an intent, in canonical order
    pub fn critical_slots(&self, kind: IntentKind) -> Vec<SlotKey> {
        self.sorted(kind, |d| &d.critical)
    }

    /// Helpful slots of an intent, in canonical order
    pub fn helpful_slots(&self, kind: IntentKind) -> Vec<SlotKey> {
        self.sorted(kind, |d| &d.helpful)
    }

    /// Critical slots the planner works against for `intent`; an unclear
    /// intent is intaken as scheme discovery
    pub fn critical_for(&self, intent: &Intent) -> Vec<SlotKey> {
        self.critical_slots(Self::working_kind(intent))
    }

    pub fn helpful_for(&self, intent: &Intent) -> Vec<SlotKey> {
        self.helpful_slots(Self::working_kind(intent))
    }

    fn working_kind(intent: &Intent) -> IntentKind {
        match intent.kind() {
            IntentKind::Unclear => IntentKind::DiscoverSchemes,
            kind => kind,
        }
    }

    fn sorted(&self, kind: IntentKind, pick: impl Fn(&IntentDefinition) -> &Vec<SlotKey>) -> Vec<SlotKey> {
        let set: BTreeSet<SlotKey> = self
            .intents
            .get(&kind)
            .map(|d| pick(d).iter().copied().collect())
            .unwrap_or_default();
        set.into_iter().collect()
    }

    pub fn intent(&self, kind: IntentKind) -> Option<&IntentDefinition> {
        self.intents.get(&kind)
    }

    pub fn prompt(&self, key: SlotKey) -> Option<&SlotPrompt> {
        self.slots.get(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = DomainConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.critical_slots(IntentKind::DiscoverSchemes).len(), 8);
    }

    #[test]
    fn test_unclear_intakes_as_discovery() {
        let config = DomainConfig::default();
        assert!(config.critical_slots(IntentKind::Unclear).is_empty());
        assert_eq!(
            config.critical_for(&Intent::Unclear),
            config.critical_for(&Intent::DiscoverSchemes)
        );
    }

    #[test]
    fn test_yaml_override_keeps_other_defaults() {
        let yaml = r#"
intents:
  document_checklist:
    critical: [registrationStatus, businessNature]
    helpful: [financeRequirement]
    keywords: [documents]
slots:
  turnoverBand:
    title: Turnover
    question: What is your yearly turnover?
"#;
        let config = DomainConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.critical_slots(IntentKind::DocumentChecklist),
            vec![SlotKey::BusinessNature, SlotKey::RegistrationStatus]
        );
        assert_eq!(config.prompt(SlotKey::TurnoverBand).unwrap().title, "Turnover");
        assert_eq!(config.critical_slots(IntentKind::DiscoverSchemes).len(), 8);
        assert!(config.scheme_names.iter().any(|s| s == "CGTMSE"));
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let yaml = r#"
intents:
  general_advice:
    critical: [businessNature]
    helpful: [businessNature]
"#;
        assert!(matches!(
            DomainConfig::from_yaml(yaml),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_slot_key_rejected() {
        let yaml = "intents:\n  general_advice:\n    critical: [favouriteColour]\n";
        assert!(matches!(DomainConfig::from_yaml(yaml), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("domain.yaml");
        std::fs::write(&path, "platform_names: [GeM]\n").unwrap();
        let config = DomainConfig::load(&path).unwrap();
        assert_eq!(config.platform_names, vec!["GeM".to_string()]);
        assert!(DomainConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
