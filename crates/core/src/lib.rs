//! Core types and traits for the MSME scheme navigator
//!
//! This crate provides foundational types used across all other crates:
//! - Profile slots, typed values and the refinement/contradiction rules
//! - Lakh/crore amount bands
//! - Intents, planner phases and the append-only turn log
//! - Retrieval query/result types and the knowledge service trait
//! - The structured per-turn response
//! - Error types

pub mod amount;
pub mod conversation;
pub mod error;
pub mod intent;
pub mod profile;
pub mod response;
pub mod retrieval;
pub mod slot;
pub mod traits;

pub use amount::{format_inr, AmountBand, CRORE, LAKH};
pub use conversation::{Language, PlannerPhase, Turn, TurnLog};
pub use error::{Error, Result};
pub use intent::{Intent, IntentBreadth, IntentConfidence, IntentKind};
pub use profile::Profile;
pub use response::{
    BankPitch, BankabilityGrade, Caveat, CaveatKind, ClaimConfidence, ComparisonRow, DocumentGroup,
    DprSection, EligibilityAssessment, ProfileBlock, ProfileEntry, ProfileScope, QuestionPrompt,
    ResponseKind, SchemeComparison, SchemeGroup, SchemeRecommendation, StructuredResponse,
};
pub use retrieval::{
    RetrievalOrigin, RetrievalQuery, RetrievalResult, SchemeCategory, SchemeEligibility,
    SchemeRecord,
};
pub use slot::{
    BusinessNature, CollateralStatus, Confidence, ContradictionPolicy, FinancePurpose,
    FinanceRequirement, Location, OwnershipCategory, PendingValue, RegistrationStatus, Slot,
    SlotKey, SlotUpdate, SlotValue, ValueRelation,
};
pub use traits::KnowledgeService;
