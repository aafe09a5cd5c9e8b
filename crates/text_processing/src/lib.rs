//! Text processing for the MSME scheme navigator
//!
//! This crate turns noisy, often voice-transcribed replies into structured
//! facts:
//! - **Normalization**: filler removal, repeated words, spelled-out numbers
//! - **Slot extraction**: every profile slot a reply answers, with confidence
//! - **Amounts**: lakh/crore mentions mapped onto the band ladder
//! - **Intent detection**: keyword detector plus the sticky per-conversation classifier
//! - **Signals**: speed and freshness requests, language preference, conflict answers,
//!   comparison, bank pitch and project report requests
//!
//! # Example
//!
//! ```
//! use udyami_core::{Profile, SlotKey};
//! use udyami_text_processing::ExtractionEngine;
//!
//! let engine = ExtractionEngine::new();
//! let extraction = engine
//!     .extract("we are into manufacturing, turnover around 80 lakh", &Profile::new())
//!     .unwrap();
//!
//! assert!(extraction.get(SlotKey::BusinessNature).is_some());
//! assert!(extraction.get(SlotKey::TurnoverBand).is_some());
//! ```

pub mod amount;
pub mod geo;
pub mod intent;
pub mod normalize;
pub mod signals;
pub mod slot_extraction;

pub use amount::{find_amounts, AmountMention};
pub use intent::{DetectedIntent, IntentClassifier, IntentDecision, IntentDetector, IntentState};
pub use normalize::{normalize, split_spans};
pub use signals::{
    conflict_choice, requested_language, requested_outputs, wants_latest, wants_speed, ConflictChoice,
    OutputRequest,
};
pub use slot_extraction::{Ambiguity, Extraction, ExtractionEngine};
