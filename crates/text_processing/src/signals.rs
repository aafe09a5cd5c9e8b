//! Conversation-level signals carried by an utterance
//!
//! These do not fill slots; they steer the planner (speed mode), the
//! retrieval gate (latest information), the response language and the
//! extra outputs a composition carries.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use udyami_core::Language;

static SPEED_DEMAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:quick(?:ly)?|fast|jaldi|briefly|in short|just tell me|skip (?:the )?questions|no time|asap|hurry|short answer)\b",
    )
    .unwrap()
});

static LATEST_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:latest|recent(?:ly)?|newest|updated|up[\s-]to[\s-]date|new schemes|any updates|this year)\b",
    )
    .unwrap()
});

static LANGUAGE_REQUEST: Lazy<Vec<(Regex, Language)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(?:in|explain in|reply in|speak in|talk in|answer in)\s+hinglish\b").unwrap(),
            Language::Hinglish,
        ),
        (
            Regex::new(r"(?i)\b(?:(?:in|explain in|reply in|speak in|talk in|answer in)\s+hindi|hindi (?:me|mein|main))\b").unwrap(),
            Language::Hindi,
        ),
        (
            Regex::new(r"(?i)\b(?:in|explain in|reply in|speak in|talk in|answer in)\s+english|english (?:me|mein|main)\b").unwrap(),
            Language::English,
        ),
    ]
});

static PREFER_EARLIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:earlier|first|previous|original|old|older|pehle|pehla|pehli|before)\b").unwrap()
});

static PREFER_INCOMING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:new|newer|latest|second|later|updated|now|abhi|naya|nayi)\b").unwrap()
});

static COMPARE_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:compare|comparison(?:\s+(?:of|between))?|differences?\s+between)\s+(.+)$").unwrap()
});

static VERSUS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s(?:vs\.?|versus)\s").unwrap());

static COMPARE_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\b(?:which|what|for me|for my|please|kaun ?sa|konsa|better)\b.*$").unwrap()
});

static NAME_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|&|\bvs\.?|\bversus\b|\band\b|\bor\b|\bwith\b|\baur\b)\s*").unwrap());

static NAME_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:the|a|an)\s+|\s+(?:schemes?|yojana|loans?|scheme loans?)$").unwrap()
});

static PITCH_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:pitch|talk to (?:the |my )?bank|explain to (?:the |my )?(?:bank )?manager|convince (?:the |my )?bank|what (?:should|do) i (?:say|tell) (?:to )?(?:the )?(?:bank|manager)|bank (?:manager )?(?:ko|se) kya (?:bolu|bolun|kahu))\b",
    )
    .unwrap()
});

static DPR_REQUEST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:dpr|project report|detailed (?:project )?(?:plan|report)|business plan)\b").unwrap()
});

/// Extra outputs the user asked for, kept until the next composition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputRequest {
    /// Scheme names to set side by side
    pub compare: Vec<String>,
    pub bank_pitch: bool,
    pub dpr_outline: bool,
}

impl OutputRequest {
    pub fn is_empty(&self) -> bool {
        self.compare.is_empty() && !self.bank_pitch && !self.dpr_outline
    }

    /// Fold a later request in; a new comparison replaces the old one
    pub fn absorb(&mut self, later: OutputRequest) {
        if !later.compare.is_empty() {
            self.compare = later.compare;
        }
        self.bank_pitch |= later.bank_pitch;
        self.dpr_outline |= later.dpr_outline;
    }
}

/// Comparison, bank pitch and project report requests in one utterance
pub fn requested_outputs(text: &str) -> OutputRequest {
    OutputRequest {
        compare: comparison_targets(text),
        bank_pitch: PITCH_REQUEST.is_match(text),
        dpr_outline: DPR_REQUEST.is_match(text),
    }
}

/// Scheme names in "compare X vs Y" style requests; empty unless at least two
fn comparison_targets(text: &str) -> Vec<String> {
    let text = text.trim().trim_end_matches(['?', '.', '!']);
    let tail = match COMPARE_REQUEST.captures(text).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None if VERSUS.is_match(text) => text,
        None => return Vec::new(),
    };
    let tail = COMPARE_TAIL.replace(tail, "");

    let mut names: Vec<String> = Vec::new();
    for part in NAME_SPLIT.split(&tail) {
        let name = NAME_NOISE.replace_all(part.trim(), "").trim().to_string();
        if name.is_empty() || name.split_whitespace().count() > 4 {
            continue;
        }
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
            names.push(name);
        }
    }
    if names.len() < 2 {
        return Vec::new();
    }
    names
}

/// Which side of a reported contradiction the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Earlier,
    Incoming,
}

/// User asked to skip ahead ("tell me quickly")
pub fn wants_speed(text: &str) -> bool {
    SPEED_DEMAND.is_match(text)
}

/// User asked for recent or updated information
pub fn wants_latest(text: &str) -> bool {
    LATEST_REQUEST.is_match(text)
}

/// Explicit response-language request
pub fn requested_language(text: &str) -> Option<Language> {
    LANGUAGE_REQUEST
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, lang)| *lang)
}

/// Answer to "earlier you said A, now B. Which is correct?"
pub fn conflict_choice(text: &str) -> Option<ConflictChoice> {
    match (PREFER_EARLIER.is_match(text), PREFER_INCOMING.is_match(text)) {
        (true, false) => Some(ConflictChoice::Earlier),
        (false, true) => Some(ConflictChoice::Incoming),
        _ => None,
    }
}
