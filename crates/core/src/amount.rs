//! Rupee amounts on the lakh/crore band ladder
//!
//! Turnover and finance amounts are never stored as point estimates. Every
//! stated amount or range is mapped onto a fixed ladder and kept as the
//! band (or run of adjacent bands) that contains it.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const LAKH: u64 = 100_000;
pub const CRORE: u64 = 10_000_000;

/// Band boundaries in rupees. Step `i` covers `[LADDER[i-1], LADDER[i])`,
/// step 0 starts at zero and the last step is open-ended.
pub const LADDER: [u64; 8] = [
    10 * LAKH,
    50 * LAKH,
    CRORE,
    5 * CRORE,
    10 * CRORE,
    50 * CRORE,
    100 * CRORE,
    250 * CRORE,
];

/// Highest step index on the ladder
pub const TOP_STEP: u8 = LADDER.len() as u8;

/// A contiguous run of ladder steps, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmountBand {
    pub from_step: u8,
    pub to_step: u8,
}

impl AmountBand {
    /// Single-step band containing `amount`
    pub fn from_amount(amount: u64) -> Self {
        let step = step_of(amount);
        Self {
            from_step: step,
            to_step: step,
        }
    }

    /// Coarsest ladder-aligned band containing the whole range.
    ///
    /// The upper end is inclusive, so "50 lakh to 1 crore" stays inside the
    /// `₹50 lakh–₹1 crore` step instead of spilling into the next one.
    pub fn from_range(low: u64, high: u64) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let from_step = step_of(low);
        let to_step = if high > low {
            step_of(high - 1).max(from_step)
        } else {
            from_step
        };
        Self { from_step, to_step }
    }

    pub fn step(step: u8) -> Self {
        let step = step.min(TOP_STEP);
        Self {
            from_step: step,
            to_step: step,
        }
    }

    /// Lower bound in rupees
    pub fn min_inr(&self) -> u64 {
        if self.from_step == 0 {
            0
        } else {
            LADDER[(self.from_step - 1) as usize]
        }
    }

    /// Upper bound in rupees, `None` for the open-ended top step
    pub fn max_inr(&self) -> Option<u64> {
        LADDER.get(self.to_step as usize).copied()
    }

    pub fn contains(&self, amount: u64) -> bool {
        let step = step_of(amount);
        step >= self.from_step && step <= self.to_step
    }

    pub fn overlaps(&self, other: &AmountBand) -> bool {
        self.from_step <= other.to_step && other.from_step <= self.to_step
    }

    /// Ladder steps separating two bands, zero when they overlap
    pub fn distance(&self, other: &AmountBand) -> u8 {
        if self.overlaps(other) {
            0
        } else if self.to_step < other.from_step {
            other.from_step - self.to_step
        } else {
            self.from_step - other.to_step
        }
    }

    /// Whether every amount in `self` also lies in `other`
    pub fn within(&self, other: &AmountBand) -> bool {
        self.from_step >= other.from_step && self.to_step <= other.to_step
    }

    /// Human readable label, e.g. `₹50 lakh–₹1 crore`
    pub fn label(&self) -> String {
        match (self.min_inr(), self.max_inr()) {
            (0, Some(max)) => format!("Up to {}", format_inr(max)),
            (min, None) => format!("Above {}", format_inr(min)),
            (min, Some(max)) => format!("{}–{}", format_inr(min), format_inr(max)),
        }
    }
}

impl fmt::Display for AmountBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Ladder step containing `amount`
pub fn step_of(amount: u64) -> u8 {
    LADDER.iter().filter(|boundary| amount >= **boundary).count() as u8
}

/// Format rupees in lakh/crore notation
pub fn format_inr(amount: u64) -> String {
    if amount >= CRORE {
        format!("₹{} crore", trim_decimal(amount as f64 / CRORE as f64))
    } else if amount >= LAKH {
        format!("₹{} lakh", trim_decimal(amount as f64 / LAKH as f64))
    } else {
        format!("₹{}", amount)
    }
}

fn trim_decimal(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{}", value as u64)
    } else {
        let s = format!("{:.2}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
