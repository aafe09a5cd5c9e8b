//! Intent detection
//!
//! Maps a user utterance onto the closed set of intents. Detection is
//! keyword driven and domain agnostic: phrases, critical slots and the
//! scheme/platform vocabularies all come from [`DomainConfig`].
//!
//! # Scoring
//!
//! - a strong phrase ("am i eligible", "what documents") scores 0.9
//! - keyword hits score 0.35 for the first and 0.15 for each further hit,
//!   capped at 0.7
//! - a named scheme lifts eligibility checking to 0.8 with eligibility words,
//!   0.6 without; a named platform does the same for market access
//! - the best score below [`UNCLEAR_THRESHOLD`] is reported as `Unclear`
//!
//! The sticky, per-conversation layer lives in [`classifier`].
//!
//! # Example
//!
//! ```
//! use udyami_config::DomainConfig;
//! use udyami_core::IntentKind;
//! use udyami_text_processing::intent::IntentDetector;
//!
//! let detector = IntentDetector::new(&DomainConfig::default());
//! let result = detector.detect("am I eligible for CGTMSE?");
//!
//! assert_eq!(result.intent.kind(), IntentKind::CheckSchemeEligibility);
//! assert_eq!(result.intent.reference(), Some("CGTMSE"));
//! ```

pub mod classifier;

pub use classifier::{IntentClassifier, IntentDecision, IntentState};

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

use udyami_config::{DomainConfig, IntentDefinition};
use udyami_core::{Intent, IntentKind};

/// Scores below this are reported as `Unclear`
pub const UNCLEAR_THRESHOLD: f32 = 0.3;

const STRONG_PHRASE_SCORE: f32 = 0.9;
const KEYWORD_BASE: f32 = 0.35;
const KEYWORD_STEP: f32 = 0.15;
const KEYWORD_CAP: f32 = 0.7;
const REFERENCE_WITH_CUE: f32 = 0.8;
const SCHEME_ALONE: f32 = 0.6;
const PLATFORM_ALONE: f32 = 0.65;

/// Platform reference used when market access is asked without naming one
pub const GENERIC_PLATFORM: &str = "online marketplaces";

/// Detected intent with its score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedIntent {
    pub intent: Intent,
    /// Score in 0.0..=1.0
    pub score: f32,
    /// Other intents that scored, best first
    pub alternatives: Vec<(IntentKind, f32)>,
}

/// Named reference (scheme or platform) with its compiled pattern
struct Reference {
    name: String,
    pattern: Regex,
}

impl Reference {
    fn compile(names: &[String]) -> Vec<Reference> {
        names
            .iter()
            .filter_map(|name| {
                let body = name
                    .split(|c: char| c.is_whitespace() || c == '-')
                    .filter(|t| !t.is_empty())
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"[\s-]*");
                if body.is_empty() {
                    return None;
                }
                match Regex::new(&format!(r"(?i)\b{}\b", body)) {
                    Ok(pattern) => Some(Reference {
                        name: name.clone(),
                        pattern,
                    }),
                    Err(e) => {
                        tracing::warn!(name = %name, error = %e, "Skipping unusable reference name");
                        None
                    },
                }
            })
            .collect()
    }

    /// Earliest reference mentioned in `text`
    fn find<'r>(refs: &'r [Reference], text: &str) -> Option<&'r str> {
        refs.iter()
            .filter_map(|r| r.pattern.find(text).map(|m| (m.start(), r.name.as_str())))
            .min_by_key(|(start, _)| *start)
            .map(|(_, name)| name)
    }
}

/// Keyword-based intent detector
///
/// Tables are fixed at construction; a new domain means a new detector.
pub struct IntentDetector {
    definitions: BTreeMap<IntentKind, IntentDefinition>,
    schemes: Vec<Reference>,
    platforms: Vec<Reference>,
}

impl IntentDetector {
    pub fn new(domain: &DomainConfig) -> Self {
        Self {
            definitions: domain.intents.clone(),
            schemes: Reference::compile(&domain.scheme_names),
            platforms: Reference::compile(&domain.platform_names),
        }
    }

    /// Scheme named in `text`, by its configured name
    pub fn find_scheme(&self, text: &str) -> Option<String> {
        Reference::find(&self.schemes, text).map(str::to_string)
    }

    /// Platform named in `text`, by its configured name
    pub fn find_platform(&self, text: &str) -> Option<String> {
        Reference::find(&self.platforms, text).map(str::to_string)
    }

    /// Detect the intent of a single utterance
    pub fn detect(&self, text: &str) -> DetectedIntent {
        self.detect_with_history(&[], text)
    }

    /// Detect the intent of `text`; earlier user replies (oldest first)
    /// supply a scheme reference the latest utterance leaves implicit
    pub fn detect_with_history(&self, history: &[&str], text: &str) -> DetectedIntent {
        let lower = text.to_lowercase();
        let words: HashSet<&str> = lower.unicode_words().collect();

        let mut scores: BTreeMap<IntentKind, f32> = self
            .definitions
            .iter()
            .filter(|(kind, _)| **kind != IntentKind::Unclear)
            .map(|(kind, def)| (*kind, phrase_score(def, &lower, &words)))
            .collect();

        let scheme = self.find_scheme(text);
        if scheme.is_some() {
            let cue = scores.get(&IntentKind::CheckSchemeEligibility).copied().unwrap_or(0.0) > 0.0;
            lift(&mut scores, IntentKind::CheckSchemeEligibility, if cue { REFERENCE_WITH_CUE } else { SCHEME_ALONE });
        }

        let platform = self.find_platform(text);
        if platform.is_some() {
            let cue = scores.get(&IntentKind::MarketAccess).copied().unwrap_or(0.0) > 0.0;
            lift(&mut scores, IntentKind::MarketAccess, if cue { REFERENCE_WITH_CUE } else { PLATFORM_ALONE });
        }

        // An eligibility question needs a scheme; without one anywhere in the
        // conversation it is a discovery request
        let scheme = scheme.or_else(|| history.iter().rev().find_map(|h| self.find_scheme(h)));
        if scheme.is_none() {
            if let Some(check) = scores.remove(&IntentKind::CheckSchemeEligibility) {
                lift(&mut scores, IntentKind::DiscoverSchemes, check);
            }
        }

        let mut ranked: Vec<(IntentKind, f32)> = IntentKind::ALL
            .iter()
            .filter_map(|kind| scores.get(kind).map(|s| (*kind, *s)))
            .filter(|(_, s)| *s > 0.0)
            .collect();
        // Stable sort keeps the declaration order on ties
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let (kind, score) = match ranked.first() {
            Some(&(kind, score)) if score >= UNCLEAR_THRESHOLD => (kind, score),
            Some(&(_, score)) => (IntentKind::Unclear, score),
            None => (IntentKind::Unclear, 0.0),
        };
        let alternatives = ranked.into_iter().filter(|(k, _)| *k != kind).collect();

        let intent = match kind {
            IntentKind::DiscoverSchemes => Intent::DiscoverSchemes,
            IntentKind::CheckSchemeEligibility => Intent::CheckSchemeEligibility {
                scheme: scheme.unwrap_or_default(),
            },
            IntentKind::DocumentChecklist => Intent::DocumentChecklist,
            IntentKind::DelayedPayment => Intent::DelayedPayment,
            IntentKind::MarketAccess => Intent::MarketAccess {
                platform: platform.unwrap_or_else(|| GENERIC_PLATFORM.to_string()),
            },
            IntentKind::GeneralAdvice => Intent::GeneralAdvice,
            IntentKind::Unclear => Intent::Unclear,
        };

        tracing::debug!(intent = %kind, score, "Intent detected");

        DetectedIntent {
            intent,
            score,
            alternatives,
        }
    }
}

fn lift(scores: &mut BTreeMap<IntentKind, f32>, kind: IntentKind, score: f32) {
    let entry = scores.entry(kind).or_insert(0.0);
    *entry = entry.max(score);
}

/// Score of one intent definition against an utterance
///
/// Single-word keywords match whole words (unicode word boundaries);
/// multi-word keywords match as substrings.
fn phrase_score(def: &IntentDefinition, lower: &str, words: &HashSet<&str>) -> f32 {
    if def
        .strong_phrases
        .iter()
        .any(|p| !p.is_empty() && lower.contains(p.to_lowercase().as_str()))
    {
        return STRONG_PHRASE_SCORE;
    }

    let hits = def
        .keywords
        .iter()
        .filter(|k| {
            let k = k.to_lowercase();
            if k.contains(' ') {
                lower.contains(k.as_str())
            } else {
                words.contains(k.as_str())
            }
        })
        .count();

    if hits == 0 {
        0.0
    } else {
        (KEYWORD_BASE + KEYWORD_STEP * (hits - 1) as f32).min(KEYWORD_CAP)
    }
}
