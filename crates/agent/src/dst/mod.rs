//! Dialogue State Tracking
//!
//! Owns the business profile of one conversation and enforces its update
//! rules.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SlotStore                            │
//! │  - Profile (eleven slots, canonical priority order)         │
//! │  - Contradiction policy (band / start-year tolerance)       │
//! └─────────────────────────────────────────────────────────────┘
//!            │ apply(updates)                 ▲ resolve(key, choice)
//!            ▼                                │
//! ┌──────────────────────┐   Contradicts a confirmed value
//! │ Same    → raise conf │──────────────────────────────┐
//! │ Refines → merge      │                              ▼
//! │ New     → fill       │              needs_reconfirmation + pending
//! └──────────────────────┘
//! ```
//!
//! Slots only ever move from unset to filled. A confirmed value is replaced
//! only after the user picks the incoming side of a reported conflict.

mod store;

pub use store::{ApplyReport, SetOutcome, SlotStore};
