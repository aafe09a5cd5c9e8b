//! In-memory scheme index
//!
//! Keyword and profile-fit ranking over a loaded [`SchemeCorpus`]. Records
//! that structurally cannot apply (wrong sector, excluded retail trade,
//! another state, turnover above the ceiling) are filtered out unless the
//! query names them explicitly; the rest are scored by term overlap with
//! the query text plus how well their eligibility hints fit the profile.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

use udyami_core::{
    BusinessNature, KnowledgeService, RetrievalOrigin, RetrievalQuery, RetrievalResult,
    SchemeRecord, SlotKey, SlotValue,
};

use crate::knowledge_loader::{KnowledgeLoader, SchemeCorpus};

const BASE_SCORE: f32 = 0.2;
const OVERLAP_WEIGHT: f32 = 0.4;

/// Keyword index over an in-memory scheme corpus
pub struct InMemorySchemeIndex {
    corpus: RwLock<SchemeCorpus>,
}

impl InMemorySchemeIndex {
    pub fn new(corpus: SchemeCorpus) -> Self {
        Self {
            corpus: RwLock::new(corpus),
        }
    }

    /// Index over the bundled seed corpus
    pub fn builtin() -> crate::Result<Self> {
        Ok(Self::new(KnowledgeLoader::builtin()?))
    }

    /// Swap in a reloaded corpus
    pub fn replace(&self, corpus: SchemeCorpus) {
        *self.corpus.write() = corpus;
    }

    pub fn len(&self) -> usize {
        self.corpus.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.read().is_empty()
    }

    fn rank(&self, records: &[SchemeRecord], query: &RetrievalQuery) -> Vec<SchemeRecord> {
        let query_terms = terms(&query.text);
        let fit = ProfileFit::from_snapshot(&query.snapshot);

        let mut ranked: Vec<SchemeRecord> = records
            .iter()
            .filter_map(|record| {
                let named = query
                    .reference
                    .as_deref()
                    .map(|r| same_name(&record.name, r))
                    .unwrap_or(false);
                if !named && !fit.admits(record) {
                    return None;
                }
                let score = if named {
                    1.0
                } else {
                    let overlap = overlap(&query_terms, record);
                    (BASE_SCORE + OVERLAP_WEIGHT * overlap + fit.bonus(record)).clamp(0.0, 0.99)
                };
                let mut record = record.clone();
                record.score = (score * 100.0).round() / 100.0;
                Some(record)
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked.truncate(query.top_k.max(1));
        ranked
    }
}

#[async_trait]
impl KnowledgeService for InMemorySchemeIndex {
    async fn search(&self, query: &RetrievalQuery) -> udyami_core::Result<RetrievalResult> {
        let corpus = self.corpus.read();
        let records = self.rank(&corpus.schemes, query);
        tracing::debug!(matched = records.len(), corpus = corpus.schemes.len(), "In-memory scheme search");
        Ok(RetrievalResult {
            records,
            updated_at: corpus.updated_at,
            origin: RetrievalOrigin::Primary,
        })
    }

    async fn fresh_search(&self, query: &RetrievalQuery) -> udyami_core::Result<RetrievalResult> {
        let corpus = self.corpus.read();
        let records = self.rank(&corpus.updates, query);
        Ok(RetrievalResult {
            records,
            updated_at: Some(Utc::now()),
            origin: RetrievalOrigin::Fresh,
        })
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

fn terms(text: &str) -> HashSet<String> {
    text.unicode_words()
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn same_name(record: &str, reference: &str) -> bool {
    let (record, reference) = (compact(record), compact(reference));
    !reference.is_empty() && (record == reference || record.starts_with(&reference))
}

/// Share of query terms found in the record text
fn overlap(query_terms: &HashSet<String>, record: &SchemeRecord) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let text = format!(
        "{} {} {} {} {}",
        record.name,
        record.authority,
        record.summary,
        record.conditions.join(" "),
        record.amount_range.as_deref().unwrap_or("")
    );
    let record_terms = terms(&text);
    let hits = query_terms.iter().filter(|t| record_terms.contains(*t)).count();
    hits as f32 / query_terms.len() as f32
}

/// Profile facts relevant to structural filtering
struct ProfileFit<'a> {
    snapshot: &'a BTreeMap<SlotKey, SlotValue>,
    current_year: i32,
}

impl<'a> ProfileFit<'a> {
    fn from_snapshot(snapshot: &'a BTreeMap<SlotKey, SlotValue>) -> Self {
        Self {
            snapshot,
            current_year: Utc::now().year(),
        }
    }

    fn nature(&self) -> Option<BusinessNature> {
        match self.snapshot.get(&SlotKey::BusinessNature) {
            Some(SlotValue::Nature(n)) => Some(*n),
            _ => None,
        }
    }

    fn admits(&self, record: &SchemeRecord) -> bool {
        let e = &record.eligibility;
        if let Some(nature) = self.nature() {
            if !e.natures.is_empty() && !e.natures.contains(&nature) {
                return false;
            }
            if e.excludes_retail_trading && nature == BusinessNature::Trading {
                return false;
            }
        }
        if let Some(SlotValue::Location(loc)) = self.snapshot.get(&SlotKey::Location) {
            if let Some(state) = &loc.state {
                if !e.states.is_empty() && !e.states.iter().any(|s| s.eq_ignore_ascii_case(state)) {
                    return false;
                }
            }
        }
        if let (Some(SlotValue::Band(band)), Some(ceiling)) =
            (self.snapshot.get(&SlotKey::TurnoverBand), e.max_turnover_inr)
        {
            if band.min_inr() > ceiling {
                return false;
            }
        }
        true
    }

    fn bonus(&self, record: &SchemeRecord) -> f32 {
        let e = &record.eligibility;
        let mut bonus = 0.0;

        if let Some(SlotValue::Finance(finance)) = self.snapshot.get(&SlotKey::FinanceRequirement) {
            if let Some(purpose) = finance.purpose {
                if e.purposes.contains(&purpose) {
                    bonus += 0.3;
                }
            }
            if let (Some(band), Some(max_loan)) = (finance.amount, e.max_loan_inr) {
                if band.min_inr() > max_loan {
                    bonus -= 0.3;
                }
            }
        }
        if let Some(SlotValue::Collateral(c)) = self.snapshot.get(&SlotKey::CollateralStatus) {
            if e.collateral_free && c.has_collateral == Some(false) {
                bonus += 0.2;
            }
        }
        if let Some(SlotValue::Ownership(categories)) = self.snapshot.get(&SlotKey::OwnershipCategory) {
            if categories.iter().any(|c| e.preferred_categories.contains(c)) {
                bonus += 0.1;
            }
        }
        if let Some(SlotValue::Registration(r)) = self.snapshot.get(&SlotKey::RegistrationStatus) {
            if e.requires_udyam && r.udyam == Some(false) {
                bonus -= 0.2;
            }
        }
        if let Some(SlotValue::StartYear(year)) = self.snapshot.get(&SlotKey::BusinessAge) {
            if e.new_units_only && self.current_year - year > 1 {
                bonus -= 0.2;
            }
        }
        bonus
    }
}
