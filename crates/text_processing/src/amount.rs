//! Rupee amount recognizer
//!
//! Finds amounts and ranges written with lakh/crore/thousand units, a rupee
//! marker or Indian digit grouping, and maps each onto the band ladder. A
//! range is never collapsed to its midpoint.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use udyami_core::{AmountBand, CRORE, LAKH};

/// Amount multiplier for parsing
#[derive(Debug, Clone, Copy, PartialEq)]
enum AmountMultiplier {
    Unit,     // 1
    Thousand, // 1,000
    Lakh,     // 100,000
    Crore,    // 10,000,000
}

impl AmountMultiplier {
    fn parse(unit: &str) -> Self {
        let unit = unit.to_lowercase();
        if unit.starts_with("cr") || unit.starts_with("kar") {
            AmountMultiplier::Crore
        } else if unit.starts_with('l') {
            AmountMultiplier::Lakh
        } else if unit.starts_with('k') || unit.starts_with("thousand") {
            AmountMultiplier::Thousand
        } else {
            AmountMultiplier::Unit
        }
    }

    fn value(&self) -> f64 {
        match self {
            AmountMultiplier::Unit => 1.0,
            AmountMultiplier::Thousand => 1_000.0,
            AmountMultiplier::Lakh => LAKH as f64,
            AmountMultiplier::Crore => CRORE as f64,
        }
    }
}

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?P<cur>₹|\brs\.?|\binr|\brupees?)?\s*
        (?P<a>\d+(?:,\d+)*(?:\.\d+)?)\s*
        (?P<ua>(?:lakhs?|lacs?|lac|l|crores?|cr|karod|karor|k|thousand)\b)?
        (?:
            \s*(?:-|–|—|\bto\b)\s*(?:₹|rs\.?)?\s*
            (?P<b>\d+(?:,\d+)*(?:\.\d+)?)\s*
            (?P<ub>(?:lakhs?|lacs?|lac|l|crores?|cr|karod|karor|k|thousand)\b)?
        )?",
    )
    .unwrap()
});

static UPPER_BOUND_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:up\s*to|upto|below|under|less than|within|max(?:imum)?|not more than)\s*$")
        .unwrap()
});

/// A rupee amount or range found in text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountMention {
    pub low: u64,
    pub high: u64,
    /// Byte offsets of the mention in the searched text
    pub start: usize,
    pub end: usize,
}

impl AmountMention {
    /// Coarsest ladder band containing the mention
    pub fn band(&self) -> AmountBand {
        AmountBand::from_range(self.low, self.high)
    }

    pub fn is_range(&self) -> bool {
        self.low != self.high
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

/// Smallest amount treated as rupees when written without a unit or marker
const BARE_RUPEE_MIN: f64 = 10_000.0;

fn mention_from(caps: &Captures<'_>, text: &str) -> Option<AmountMention> {
    let whole = caps.get(0)?;
    let a = parse_number(caps.name("a")?.as_str())?;
    let ua = caps.name("ua").map(|m| AmountMultiplier::parse(m.as_str()));
    let b = caps.name("b").and_then(|m| parse_number(m.as_str()));
    let ub = caps.name("ub").map(|m| AmountMultiplier::parse(m.as_str()));
    let has_currency = caps.name("cur").is_some();

    let mult_a = ua.or(ub).unwrap_or(AmountMultiplier::Unit);
    let mult_b = ub.or(ua).unwrap_or(AmountMultiplier::Unit);

    let low = a * mult_a.value();
    let high = b.map(|b| b * mult_b.value()).unwrap_or(low);

    let has_unit = ua.is_some() || ub.is_some();
    if !has_unit && !has_currency && high < BARE_RUPEE_MIN {
        return None;
    }

    let (mut low, high) = (low.round() as u64, high.round() as u64);
    if b.is_none() && UPPER_BOUND_ONLY.is_match(&text[..whole.start()]) {
        low = 0;
    }

    Some(AmountMention {
        low: low.min(high),
        high: high.max(low),
        start: whole.start(),
        end: whole.end(),
    })
}

/// Find every rupee amount in `text`, in order of appearance
pub fn find_amounts(text: &str) -> Vec<AmountMention> {
    AMOUNT
        .captures_iter(text)
        .filter_map(|caps| mention_from(&caps, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(text: &str) -> AmountMention {
        find_amounts(text)[0]
    }

    #[test]
    fn test_lakh_and_crore() {
        assert_eq!(first("turnover 80 lakh").low, 80 * LAKH);
        assert_eq!(first("need 1.5 crore").low, 15 * CRORE / 10);
        assert_eq!(first("about 2 cr").low, 2 * CRORE);
        assert_eq!(first("50k").low, 50_000);
        assert_eq!(first("₹5,00,000").low, 5 * LAKH);
    }

    #[test]
    fn test_range_shares_unit() {
        let m = first("around 50-60 lakh");
        assert_eq!((m.low, m.high), (50 * LAKH, 60 * LAKH));
        assert!(m.is_range());
        assert_eq!(m.band().label(), "₹50 lakh–₹1 crore");

        let m = first("50 lakh to 1 crore");
        assert_eq!((m.low, m.high), (50 * LAKH, CRORE));
        assert_eq!(m.band().label(), "₹50 lakh–₹1 crore");
    }

    #[test]
    fn test_point_and_range_share_band() {
        assert_eq!(first("55 lakh").band(), first("around 50–60 lakh").band());
    }

    #[test]
    fn test_range_across_boundary_widens() {
        let band = first("40 to 70 lakh").band();
        assert_eq!(band.label(), "₹10 lakh–₹1 crore");
    }

    #[test]
    fn test_years_and_small_numbers_ignored() {
        assert!(find_amounts("started 2021").is_empty());
        assert!(find_amounts("we have 2 loans").is_empty());
        assert!(find_amounts("5 years").is_empty());
    }

    #[test]
    fn test_upper_bound_only() {
        let m = first("up to 10 lakh");
        assert_eq!(m.low, 0);
        assert_eq!(m.band().label(), "Up to ₹10 lakh");
    }

    #[test]
    fn test_multiple_mentions_in_order() {
        let found = find_amounts("turnover 80 lakh, need 20 lakh");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].low, 80 * LAKH);
        assert_eq!(found[1].low, 20 * LAKH);
        assert!(found[0].end <= found[1].start);
    }
}
