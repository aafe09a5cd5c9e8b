//! Retrieval query and scheme record types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::intent::Intent;
use crate::slot::{BusinessNature, FinancePurpose, OwnershipCategory, SlotKey, SlotValue};

/// Query handed to the knowledge service, with the slot snapshot it was
/// built from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    pub text: String,
    pub intent: Intent,
    pub snapshot: BTreeMap<SlotKey, SlotValue>,
    /// Scheme or platform named by a narrow intent
    pub reference: Option<String>,
    pub top_k: usize,
}

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalOrigin {
    #[default]
    Primary,
    Fresh,
}

/// Fixed recommendation categories, in rendering order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeCategory {
    CreditLinked,
    SubsidyCapital,
    ExportTrade,
    TechnologyCluster,
    ComplianceSupport,
}

impl SchemeCategory {
    pub const ORDER: [SchemeCategory; 5] = [
        SchemeCategory::CreditLinked,
        SchemeCategory::SubsidyCapital,
        SchemeCategory::ExportTrade,
        SchemeCategory::TechnologyCluster,
        SchemeCategory::ComplianceSupport,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SchemeCategory::CreditLinked => "Credit-linked",
            SchemeCategory::SubsidyCapital => "Subsidy / capital support",
            SchemeCategory::ExportTrade => "Export / trade",
            SchemeCategory::TechnologyCluster => "Technology / cluster",
            SchemeCategory::ComplianceSupport => "Compliance / support",
        }
    }

    /// Keyword fallback for records that arrive without a category
    pub fn infer(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
        if has(&["export", "trade fair", "market development", "rodtep", "epcg"]) {
            SchemeCategory::ExportTrade
        } else if has(&["subsidy", "margin money", "capital investment", "pmegp"]) {
            SchemeCategory::SubsidyCapital
        } else if has(&["technology", "cluster", "zed", "lean", "tequp", "clcss", "upgradation"]) {
            SchemeCategory::TechnologyCluster
        } else if has(&["guarantee", "loan", "credit", "mudra", "stand-up", "cgtmse", "sidbi"]) {
            SchemeCategory::CreditLinked
        } else {
            SchemeCategory::ComplianceSupport
        }
    }
}

impl fmt::Display for SchemeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Structured eligibility hints attached to a scheme record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemeEligibility {
    /// Empty means every business nature
    pub natures: Vec<BusinessNature>,
    pub purposes: Vec<FinancePurpose>,
    pub collateral_free: bool,
    pub requires_udyam: bool,
    pub new_units_only: bool,
    pub excludes_retail_trading: bool,
    pub max_loan_inr: Option<u64>,
    pub max_turnover_inr: Option<u64>,
    /// Categories that receive higher benefit
    pub preferred_categories: Vec<OwnershipCategory>,
    /// Empty means nationwide
    pub states: Vec<String>,
}

/// One scheme returned by the knowledge service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeRecord {
    pub name: String,
    pub authority: String,
    #[serde(default)]
    pub category: Option<SchemeCategory>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub amount_range: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    /// Relevance in `[0, 1]`
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub eligibility: SchemeEligibility,
}

impl SchemeRecord {
    /// Declared category, or one inferred from the record text
    pub fn resolved_category(&self) -> SchemeCategory {
        self.category.unwrap_or_else(|| {
            SchemeCategory::infer(&format!("{} {} {}", self.name, self.summary, self.conditions.join(" ")))
        })
    }
}

/// Ordered scheme records plus result metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub records: Vec<SchemeRecord>,
    /// When the underlying corpus was last refreshed
    pub updated_at: Option<DateTime<Utc>>,
    pub origin: RetrievalOrigin,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether the result metadata is older than `threshold_days`.
    /// Results without a timestamp are never considered stale.
    pub fn is_stale(&self, threshold_days: i64, now: DateTime<Utc>) -> bool {
        match self.updated_at {
            Some(ts) => now - ts > Duration::days(threshold_days),
            None => false,
        }
    }

    /// Fold a fresher result in: fresh records replace same-named primary
    /// ones and keep their position, new names are appended.
    pub fn merge_fresh(mut self, fresh: RetrievalResult) -> RetrievalResult {
        let mut seen: HashSet<String> = HashSet::new();
        for record in fresh.records {
            let key = record.name.to_lowercase();
            if let Some(existing) = self
                .records
                .iter_mut()
                .find(|r| r.name.to_lowercase() == key)
            {
                *existing = record;
            } else if seen.insert(key) {
                self.records.push(record);
            }
        }
        self.updated_at = match (self.updated_at, fresh.updated_at) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, score: f32) -> SchemeRecord {
        SchemeRecord {
            name: name.to_string(),
            authority: "Ministry of MSME".to_string(),
            category: None,
            summary: String::new(),
            conditions: Vec::new(),
            amount_range: None,
            source: None,
            score,
            eligibility: SchemeEligibility::default(),
        }
    }

    #[test]
    fn test_category_inference() {
        assert_eq!(SchemeCategory::infer("CGTMSE credit guarantee"), SchemeCategory::CreditLinked);
        assert_eq!(SchemeCategory::infer("PMEGP margin money subsidy"), SchemeCategory::SubsidyCapital);
        assert_eq!(SchemeCategory::infer("ZED certification"), SchemeCategory::TechnologyCluster);
        assert_eq!(SchemeCategory::infer("Export promotion"), SchemeCategory::ExportTrade);
        assert_eq!(SchemeCategory::infer("MSME Samadhaan"), SchemeCategory::ComplianceSupport);
    }

    #[test]
    fn test_staleness() {
        let now = Utc::now();
        let result = RetrievalResult {
            records: vec![],
            updated_at: Some(now - Duration::days(400)),
            origin: RetrievalOrigin::Primary,
        };
        assert!(result.is_stale(180, now));
        assert!(!result.is_stale(500, now));
        assert!(!RetrievalResult::default().is_stale(1, now));
    }

    #[test]
    fn test_merge_fresh_replaces_by_name() {
        let primary = RetrievalResult {
            records: vec![record("CGTMSE", 0.5), record("PMEGP", 0.4)],
            updated_at: None,
            origin: RetrievalOrigin::Primary,
        };
        let fresh = RetrievalResult {
            records: vec![record("pmegp", 0.9), record("Stand-Up India", 0.3)],
            updated_at: Some(Utc::now()),
            origin: RetrievalOrigin::Fresh,
        };
        let merged = primary.merge_fresh(fresh);
        let names: Vec<_> = merged.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["CGTMSE", "pmegp", "Stand-Up India"]);
        assert!(merged.updated_at.is_some());
    }
}
