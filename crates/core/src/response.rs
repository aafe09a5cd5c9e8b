//! Structured per-turn response
//!
//! One `StructuredResponse` is returned for every user utterance. It carries
//! either a single planned question, a composed recommendation, or a short
//! acknowledgement, plus the state needed by a transport to render it.

use serde::{Deserialize, Serialize};

use crate::conversation::{Language, PlannerPhase};
use crate::intent::{Intent, IntentConfidence};
use crate::retrieval::SchemeCategory;
use crate::slot::{Confidence, SlotKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Question,
    Recommendation,
    Acknowledgement,
}

/// Confidence label attached to a claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClaimConfidence {
    Low,
    Medium,
    High,
}

impl ClaimConfidence {
    pub fn label(&self) -> &'static str {
        match self {
            ClaimConfidence::High => "High",
            ClaimConfidence::Medium => "Medium",
            ClaimConfidence::Low => "Low",
        }
    }
}

/// A single planned question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionPrompt {
    pub slot: SlotKey,
    /// e.g. "Question 3 of 8 – Age of business"
    pub header: String,
    pub text: String,
    /// Short sub-question on the same slot
    pub clarifier: Option<String>,
    /// The slot is being re-asked after a contradiction
    pub reconfirmation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileScope {
    /// "MSME Profile (As Understood)"
    Full,
    /// "Key details used"
    KeyDetails,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub slot: SlotKey,
    pub label: String,
    pub value: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBlock {
    pub title: String,
    pub scope: ProfileScope,
    pub entries: Vec<ProfileEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeRecommendation {
    pub name: String,
    pub authority: String,
    pub summary: String,
    pub amount_range: Option<String>,
    /// One line tied to specific profile values
    pub rationale: String,
    pub confidence: ClaimConfidence,
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeGroup {
    pub category: SchemeCategory,
    pub schemes: Vec<SchemeRecommendation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BankabilityGrade {
    C,
    B,
    #[serde(rename = "B+")]
    BPlus,
    A,
    #[serde(rename = "A+")]
    APlus,
}

impl BankabilityGrade {
    pub fn label(&self) -> &'static str {
        match self {
            BankabilityGrade::APlus => "A+",
            BankabilityGrade::A => "A",
            BankabilityGrade::BPlus => "B+",
            BankabilityGrade::B => "B",
            BankabilityGrade::C => "C",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityAssessment {
    /// 0 to 100
    pub score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub red_flags: Vec<String>,
    pub bankability: BankabilityGrade,
    pub confidence: ClaimConfidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentGroup {
    pub title: String,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaveatKind {
    IntentLowConfidence,
    SchemeDataUnavailable,
    NotFreshlyVerified,
    Approximate,
    PendingReconfirmation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caveat {
    pub kind: CaveatKind,
    pub message: String,
}

impl Caveat {
    pub fn new(kind: CaveatKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One scheme in a side-by-side comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub scheme: String,
    pub purpose: String,
    pub amount_range: String,
    pub collateral: String,
    /// Subsidy, guarantee or plain credit
    pub support: String,
    pub suited_for: String,
    /// Rough processing effort, qualitative
    pub complexity: String,
    /// No known profile value rules the scheme out or raises a concern
    pub fits: bool,
    pub notes: Vec<String>,
}

/// Schemes the user asked to compare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeComparison {
    pub rows: Vec<ComparisonRow>,
    /// Which one suits the profile better, or why none clearly does
    pub verdict: String,
    /// Names with no scheme data behind them
    pub not_found: Vec<String>,
}

/// Short pitch the user can say to a bank manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankPitch {
    pub title: String,
    pub lines: Vec<String>,
}

/// One heading of a project report outline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DprSection {
    pub heading: String,
    pub points: Vec<String>,
}

/// Output of one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredResponse {
    pub kind: ResponseKind,
    pub turn_index: usize,
    pub intent: Intent,
    pub intent_confidence: IntentConfidence,
    pub phase: PlannerPhase,
    pub language: Language,
    pub question: Option<QuestionPrompt>,
    pub profile: Option<ProfileBlock>,
    pub user_segment: Option<String>,
    pub scheme_groups: Vec<SchemeGroup>,
    pub assessment: Option<EligibilityAssessment>,
    pub documents: Vec<DocumentGroup>,
    pub guidance: Vec<String>,
    #[serde(default)]
    pub comparison: Option<SchemeComparison>,
    #[serde(default)]
    pub bank_pitch: Option<BankPitch>,
    #[serde(default)]
    pub dpr_outline: Vec<DprSection>,
    pub caveats: Vec<Caveat>,
    pub sources: Vec<String>,
    pub scam_alert: Option<String>,
    /// Quick mode answered before every critical slot was filled
    pub approximate: bool,
    /// Plain-text rendering
    pub message: String,
}

impl StructuredResponse {
    pub fn has_caveat(&self, kind: CaveatKind) -> bool {
        self.caveats.iter().any(|c| c.kind == kind)
    }

    pub fn scheme_count(&self) -> usize {
        self.scheme_groups.iter().map(|g| g.schemes.len()).sum()
    }
}
