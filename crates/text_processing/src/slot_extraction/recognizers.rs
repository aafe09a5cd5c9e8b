//! Slot-specific recognizers
//!
//! Span recognizers look at one fact span at a time; utterance recognizers
//! need the whole reply because their cue words and values can be split
//! across spans ("Udyam yes, GST no", "Jammu and Kashmir").

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

use udyami_core::{
    BusinessNature, CollateralStatus, FinancePurpose, FinanceRequirement, Location,
    OwnershipCategory, Profile, RegistrationStatus, SlotKey, SlotUpdate, SlotValue,
};

use crate::amount::AmountMention;
use crate::geo;

/// What the recognizers know besides the text itself
pub(crate) struct Context<'a> {
    /// Slot the previous question asked about
    pub expected: Option<SlotKey>,
    pub reference_year: i32,
    pub profile: &'a Profile,
}

impl Context<'_> {
    pub fn expects(&self, key: SlotKey) -> bool {
        self.expected == Some(key)
    }
}

fn with_clarification(mut update: SlotUpdate) -> SlotUpdate {
    update.needs_clarification = true;
    update
}

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .collect()
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Polarity
// =============================================================================

const NEGATIVE_WORDS: &[&str] = &[
    "no", "not", "nahi", "nahin", "nhi", "na", "without", "dont", "don't", "never", "pending",
    "applied", "haven't", "havent", "hasn't", "isn't", "nope", "yet", "neither",
];

const POSITIVE_WORDS: &[&str] = &[
    "yes", "yeah", "yep", "haan", "han", "ha", "registered", "have", "has", "done", "hai", "got",
    "with", "available", "active", "there", "certificate", "number", "ok", "okay", "sure",
];

/// Negative words win over positive ones inside the same window
fn polarity(words: &[&str]) -> Option<bool> {
    if words.iter().any(|w| NEGATIVE_WORDS.contains(w)) {
        Some(false)
    } else if words.iter().any(|w| POSITIVE_WORDS.contains(w)) {
        Some(true)
    } else {
        None
    }
}

static BARE_YES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\W*(?:yes|yeah|yep|haan|han|ha|ji|sure|correct|right)\b").unwrap());

static BARE_NO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\W*(?:no|nope|nahi|nahin|nhi|na|not really)\b").unwrap());

fn bare_answer(lower: &str) -> Option<bool> {
    if BARE_NO.is_match(lower) {
        Some(false)
    } else if BARE_YES.is_match(lower) {
        Some(true)
    } else {
        None
    }
}

// =============================================================================
// Business nature
// =============================================================================

/// (pattern, nature, stated outright)
static NATURE_PATTERNS: Lazy<Vec<(Regex, BusinessNature, bool)>> = Lazy::new(|| {
    use BusinessNature::*;
    vec![
        (Regex::new(r"\b(?:manufactur\w*|nirmaan|utpadan)").unwrap(), Manufacturing, true),
        (
            Regex::new(r"\b(?:factory|we make|i make|we produce|i produce|production|fabricat\w*|processing unit|workshop|assembl\w*)\b").unwrap(),
            Manufacturing,
            false,
        ),
        (Regex::new(r"\b(?:service|services|service provider|consultancy|consulting)\b").unwrap(), Services, true),
        (
            Regex::new(r"\b(?:repair\w*|salon|clinic|restaurant|hotel|transport\w*|logistics|software|tailoring|catering|beauty parlou?r|coaching|travel agency|printing press|courier)\b").unwrap(),
            Services,
            false,
        ),
        (
            Regex::new(r"\b(?:trading|trader|traders|trade|wholesale\w*|retail\w*|distributor\w*|distribution|dealer\w*|reseller)\b").unwrap(),
            Trading,
            true,
        ),
        (
            Regex::new(r"\b(?:shop|store|kirana|we sell|i sell|buy and sell|resell\w*|dukaan|dukan)\b").unwrap(),
            Trading,
            false,
        ),
    ]
});

static MIXED_NATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:mix|mixed|both|all three|combination)\b").unwrap());

fn distinct_by_position(mut hits: Vec<(usize, BusinessNature)>) -> Vec<BusinessNature> {
    hits.sort_by_key(|(pos, _)| *pos);
    let mut out: Vec<BusinessNature> = Vec::new();
    for (_, nature) in hits {
        if !out.contains(&nature) {
            out.push(nature);
        }
    }
    out
}

pub(crate) fn nature(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let mut strong = Vec::new();
    let mut weak = Vec::new();
    for (re, nature, stated) in NATURE_PATTERNS.iter() {
        if let Some(m) = re.find(lower) {
            if *stated {
                strong.push((m.start(), *nature));
            } else {
                weak.push((m.start(), *nature));
            }
        }
    }
    let strong = distinct_by_position(strong);
    let weak = distinct_by_position(weak);
    let key = SlotKey::BusinessNature;

    match (strong.as_slice(), weak.as_slice()) {
        ([only], _) => Some(SlotUpdate::confirmed(key, SlotValue::Nature(*only), lower)),
        ([first, ..], _) => Some(with_clarification(SlotUpdate::inferred(
            key,
            SlotValue::Nature(*first),
            lower,
        ))),
        ([], [only]) if ctx.expects(key) => {
            Some(SlotUpdate::confirmed(key, SlotValue::Nature(*only), lower))
        },
        ([], [only]) => Some(SlotUpdate::inferred(key, SlotValue::Nature(*only), lower)),
        ([], [first, ..]) => Some(with_clarification(SlotUpdate::inferred(
            key,
            SlotValue::Nature(*first),
            lower,
        ))),
        ([], []) if ctx.expects(key) && MIXED_NATURE.is_match(lower) => Some(SlotUpdate::vague(
            key,
            SlotValue::Qualitative("mixed".to_string()),
            lower,
        )),
        _ => None,
    }
}

// =============================================================================
// Product / service description
// =============================================================================

static PRODUCT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:we|i)\s+(?:make|manufacture|produce|sell|supply|deal in|trade in|provide|offer|export)\s+(.+)").unwrap(),
        Regex::new(r"(?i)\b(?:manufacturers?|makers?|producers?|suppliers?|traders?|dealers?|exporters?)\s+of\s+(.+)").unwrap(),
        Regex::new(r"(?i)\bmanufactur(?:ing|e)\s+(?:of\s+)?(.+)").unwrap(),
        Regex::new(r"(?i)\b(?:business|unit|company|firm|shop)\s+(?:of|for|making|selling)\s+(.+)").unwrap(),
        Regex::new(r"(?i)\bproducts?\s+(?:is|are)\s+(.+)").unwrap(),
    ]
});

static PRODUCT_CUTOFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:(?:since|started|located|based|turnover)\b|(?:from|in)\s+\d).*$").unwrap()
});

const PRODUCT_STOPWORDS: &[&str] = &[
    "unit", "units", "business", "company", "sector", "industry", "and", "since", "started",
    "money", "loan", "loans", "profit", "good", "decent", "it", "that", "this",
];

fn clean_product(capture: &str) -> Option<String> {
    let cut = PRODUCT_CUTOFF.replace(capture, "");
    let words: Vec<&str> = cut
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '-'))
        .filter(|w| !w.is_empty())
        .take(8)
        .collect();
    let first = words.first()?.to_lowercase();
    if PRODUCT_STOPWORDS.contains(&first.as_str()) {
        return None;
    }
    if words.iter().any(|w| w.chars().any(|c| c.is_ascii_digit())) {
        return None;
    }
    Some(words.join(" "))
}

pub(crate) fn product(span: &str, _ctx: &Context<'_>) -> Option<SlotUpdate> {
    PRODUCT_PATTERNS
        .iter()
        .filter_map(|re| re.captures(span))
        .find_map(|caps| caps.get(1).and_then(|m| clean_product(m.as_str())))
        .map(|text| SlotUpdate::confirmed(SlotKey::ProductDescription, SlotValue::Text(text), span))
}

/// Reply to the product question taken as the description itself
pub(crate) fn product_answer(text: &str) -> Option<SlotUpdate> {
    let cleaned = text.trim().trim_end_matches(|c: char| c.is_ascii_punctuation()).trim();
    if cleaned.is_empty() || cleaned.chars().count() > 160 {
        return None;
    }
    Some(SlotUpdate::confirmed(
        SlotKey::ProductDescription,
        SlotValue::Text(cleaned.to_string()),
        text,
    ))
}

// =============================================================================
// Business age
// =============================================================================

static START_YEAR: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"\b(?:started|start|since|established|estd\.?|est\.?|began|begun|founded|set up|setup|incorporated|commenced|shuru)\s*(?:in|on|from|around|in the year|ki|kiya)?\s*((?:19|20)\d{2})\b").unwrap(),
        Regex::new(r"\b((?:19|20)\d{2})\s+(?:me|mein|se|mai)\s+(?:shuru|start)").unwrap(),
        Regex::new(r"\b(?:operating|running|operational|in business)\s+since\s+((?:19|20)\d{2})\b").unwrap(),
    ]
});

static YEARS_RUNNING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:running|operating|in business|been in business|old)\s+(?:for|since)\s+(?:the\s+)?(?:last\s+|past\s+)?(\d{1,2})\s*(?:years?|yrs?|saal)\b").unwrap()
});

static YEARS_AGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\s*(?:years?|yrs?|saal)\s+(?:ago|back|pehle)\b").unwrap());

static YEARS_OLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})\s*(?:years?|yrs?|saal)\s+(?:old|purana|purani)\b").unwrap());

static BUSINESS_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:business|company|unit|firm|shop|factory|enterprise|venture|startup|kaam|dhandha|started|began|set up|established|founded|running|operating)\b").unwrap()
});

static PERSON_CONTEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:i am|i'm|im|my age|meri umar|age)\b").unwrap());

static NOT_STARTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:just started|newly started|new business|yet to start|not (?:yet )?started|planning to start|about to start|start-?up stage|haven't started|have not started|abhi shuru)\b").unwrap()
});

static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

static BARE_YEARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\D*?(\d{1,2})\s*(?:years?|yrs?|saal)?\b").unwrap());

static RELATIVE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(last year|this year|pichle saal|is saal)\b").unwrap());

fn capture_number(re: &Regex, text: &str) -> Option<i32> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<i32>().ok())
}

fn plausible_year(year: i32, ctx: &Context<'_>) -> bool {
    (1900..=ctx.reference_year + 1).contains(&year)
}

fn start_year_update(year: i32, lower: &str, confirmed: bool) -> SlotUpdate {
    let value = SlotValue::StartYear(year);
    if confirmed {
        SlotUpdate::confirmed(SlotKey::BusinessAge, value, lower)
    } else {
        SlotUpdate::inferred(SlotKey::BusinessAge, value, lower)
    }
}

pub(crate) fn business_age(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    for re in START_YEAR.iter() {
        if let Some(year) = capture_number(re, lower).filter(|y| plausible_year(*y, ctx)) {
            return Some(start_year_update(year, lower, true));
        }
    }

    if let Some(n) = capture_number(&YEARS_RUNNING, lower) {
        return Some(start_year_update(ctx.reference_year - n, lower, true));
    }
    let business_talk = BUSINESS_CONTEXT.is_match(lower) && !PERSON_CONTEXT.is_match(lower);
    if business_talk {
        if let Some(n) = capture_number(&YEARS_AGO, lower).or_else(|| capture_number(&YEARS_OLD, lower)) {
            return Some(start_year_update(ctx.reference_year - n, lower, true));
        }
    }

    if NOT_STARTED.is_match(lower) {
        return Some(start_year_update(ctx.reference_year, lower, false));
    }

    if !ctx.expects(SlotKey::BusinessAge) {
        return None;
    }
    if let Some(year) = capture_number(&BARE_YEAR, lower).filter(|y| plausible_year(*y, ctx)) {
        return Some(start_year_update(year, lower, true));
    }
    if let Some(phrase) = RELATIVE_YEAR.captures(lower).and_then(|c| c.get(1)) {
        let year = match phrase.as_str() {
            "last year" | "pichle saal" => ctx.reference_year - 1,
            _ => ctx.reference_year,
        };
        return Some(start_year_update(year, lower, true));
    }
    capture_number(&BARE_YEARS, lower).map(|n| start_year_update(ctx.reference_year - n, lower, true))
}

// =============================================================================
// Turnover and finance amounts
// =============================================================================

static TURNOVER_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:turnover|revenue|revenues|sales|annual(?:ly)?|yearly|per annum|p\.a|a year|per year|every year|karobar|kaarobaar|income|kamai)\b").unwrap()
});

static FINANCE_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:need|needs|needed|require|required|requirement|loan|borrow|finance|financing|funding|fund|funds|chahiye|investment|invest|capital|looking for|want|credit|subsidy|for machinery)\b").unwrap()
});

/// Which slot an amount belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AmountTarget {
    Turnover,
    Finance,
}

fn last_cue(text: &str) -> Option<(usize, AmountTarget)> {
    let turnover = TURNOVER_CUE.find_iter(text).last().map(|m| (m.end(), AmountTarget::Turnover));
    let finance = FINANCE_CUE.find_iter(text).last().map(|m| (m.end(), AmountTarget::Finance));
    match (turnover, finance) {
        (Some(t), Some(f)) => Some(if t.0 >= f.0 { t } else { f }),
        (t, f) => t.or(f),
    }
}

fn first_cue(text: &str) -> Option<(usize, AmountTarget)> {
    let turnover = TURNOVER_CUE.find(text).map(|m| (m.start(), AmountTarget::Turnover));
    let finance = FINANCE_CUE.find(text).map(|m| (m.start(), AmountTarget::Finance));
    match (turnover, finance) {
        (Some(t), Some(f)) => Some(if t.0 <= f.0 { t } else { f }),
        (t, f) => t.or(f),
    }
}

/// Attribute each mention using the text between it and its neighbours:
/// the nearest cue before the mention wins, then the nearest one after it.
pub(crate) fn attribute_amounts(
    lower: &str,
    mentions: &[AmountMention],
    carry: Option<AmountTarget>,
    ctx: &Context<'_>,
) -> Vec<(AmountMention, Option<AmountTarget>)> {
    mentions
        .iter()
        .enumerate()
        .map(|(i, mention)| {
            let before_start = if i == 0 { 0 } else { mentions[i - 1].end };
            let after_end = mentions.get(i + 1).map(|m| m.start).unwrap_or(lower.len());
            let before = &lower[before_start..mention.start];
            let after = &lower[mention.end..after_end];
            let target = last_cue(before)
                .or_else(|| first_cue(after))
                .map(|(_, t)| t)
                .or(carry)
                .or(match ctx.expected {
                    Some(SlotKey::TurnoverBand) => Some(AmountTarget::Turnover),
                    Some(SlotKey::FinanceRequirement) => Some(AmountTarget::Finance),
                    _ => None,
                });
            (*mention, target)
        })
        .collect()
}

/// Cue carried into the next span when a span names a cue but no amount
/// ("my turnover is... around 80 lakh")
pub(crate) fn dangling_cue(lower: &str) -> Option<AmountTarget> {
    last_cue(lower).map(|(_, t)| t)
}

pub(crate) fn turnover(mention: &AmountMention, lower: &str) -> SlotUpdate {
    SlotUpdate::confirmed(SlotKey::TurnoverBand, SlotValue::Band(mention.band()), lower)
}

static VAGUE_TURNOVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(average|decent|okay|ok|good|small|not much|theek(?:\s*thaak)?|medium|moderate|fine|so-so|low|not bad|achha|accha|don't know|dont know|not sure|pata nahi)\b").unwrap()
});

pub(crate) fn vague_turnover(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    if !(ctx.expects(SlotKey::TurnoverBand) || TURNOVER_CUE.is_match(lower)) {
        return None;
    }
    VAGUE_TURNOVER.captures(lower).and_then(|c| c.get(1)).map(|m| {
        SlotUpdate::vague(
            SlotKey::TurnoverBand,
            SlotValue::Qualitative(m.as_str().to_string()),
            lower,
        )
    })
}

static VAGUE_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(quite a (?:while|bit|lot)|a (?:long )?while|long time|some ?time|a few years|many years|kuch saal|decent amount|(?:a )?(?:little|bit)|a lot|enough|some|average|decent|okay|ok|good|medium|moderate|fine|so-so|normal|not much|thoda|bahut|theek(?:\s*thaak)?|depends|maybe|not sure|don't know|dont know|pata nahi)\b",
    )
    .unwrap()
});

/// Stub for a reply to `expected` that only gestures at an answer
/// ("quite a while", "a decent amount", "average")
///
/// Free-text slots take any reply and never get a stub.
pub(crate) fn vague_answer(lower: &str, expected: SlotKey) -> Option<SlotUpdate> {
    if matches!(expected, SlotKey::Name | SlotKey::ProductDescription) {
        return None;
    }
    VAGUE_ANSWER.captures(lower).and_then(|c| c.get(1)).map(|m| {
        SlotUpdate::vague(expected, SlotValue::Qualitative(m.as_str().to_string()), lower)
    })
}

/// (pattern, purpose); first match wins
static PURPOSE_PATTERNS: Lazy<Vec<(Regex, FinancePurpose)>> = Lazy::new(|| {
    use FinancePurpose::*;
    vec![
        (Regex::new(r"\b(?:top[\s-]?up|additional loan|enhancement|enhance)\b").unwrap(), TopUp),
        (
            Regex::new(r"\b(?:only subsidy|subsidy only|just subsidy|just support|only support|no loan|grant|margin money)\b").unwrap(),
            SubsidyOnly,
        ),
        (
            Regex::new(r"\b(?:working capital|raw materials?|stock|inventory|cash flow|cash credit|cc limit|overdraft|od limit|salaries|daily expenses)\b").unwrap(),
            WorkingCapital,
        ),
        (
            Regex::new(r"\b(?:machinery|machines?|equipment|term loan|plant and machinery|tools)\b").unwrap(),
            MachineryTermLoan,
        ),
        (
            Regex::new(r"\b(?:new unit|set up (?:a |the )?(?:new )?unit|start(?:ing)? (?:a |my |our )?(?:new )?(?:business|unit|venture)|startup capital)\b").unwrap(),
            NewUnit,
        ),
        (
            Regex::new(r"\b(?:expand|expansion|scale up|scaling|grow capacity|new branch|second unit|increase capacity)\b").unwrap(),
            Expansion,
        ),
        (Regex::new(r"\bsubsidy\b").unwrap(), SubsidyOnly),
    ]
});

pub(crate) fn finance_purpose(lower: &str) -> Option<FinancePurpose> {
    PURPOSE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(lower))
        .map(|(_, purpose)| *purpose)
}

/// Finance requirement from one span: a purpose, a finance-attributed amount
/// or both
pub(crate) fn finance(
    lower: &str,
    amount: Option<&AmountMention>,
    ctx: &Context<'_>,
) -> Option<SlotUpdate> {
    let finance_talk = ctx.expects(SlotKey::FinanceRequirement) || FINANCE_CUE.is_match(lower);
    let purpose = if finance_talk { finance_purpose(lower) } else { None };
    if purpose.is_none() && amount.is_none() {
        return None;
    }
    let value = SlotValue::Finance(FinanceRequirement {
        purpose,
        amount: amount.map(|m| m.band()),
    });
    let mut update = SlotUpdate::confirmed(SlotKey::FinanceRequirement, value, lower);
    update.needs_clarification = update.value.is_partial();
    Some(update)
}

// =============================================================================
// Registration (utterance level)
// =============================================================================

static UDYAM_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:udyam|udyog aadhaa?r|msme registration|msme registered|msme certificate|uam)\b").unwrap()
});

static GST_KEYWORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bgst(?:in)?\b").unwrap());

static WINDOW_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,.;!?]|\b(?:but|and|aur|lekin|while)\b").unwrap());

static BOTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:both|dono|all of them)\b").unwrap());

static NEITHER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:neither|none|nothing|no registration|not registered|dono nahi|koi nahi)\b").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Registry {
    Udyam,
    Gst,
}

fn window_after<'t>(text: &'t str) -> Vec<&'t str> {
    let end = WINDOW_BREAK.find(text).map(|m| m.start()).unwrap_or(text.len());
    tokens(&text[..end]).into_iter().take(3).collect()
}

fn window_before<'t>(text: &'t str) -> Vec<&'t str> {
    let start = WINDOW_BREAK.find_iter(text).last().map(|m| m.end()).unwrap_or(0);
    let words = tokens(&text[start..]);
    let skip = words.len().saturating_sub(3);
    words.into_iter().skip(skip).collect()
}

pub(crate) fn registration(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::RegistrationStatus;
    let expected = ctx.expects(key);

    let mut mentions: Vec<(usize, usize, Registry)> = Vec::new();
    if let Some(m) = UDYAM_KEYWORD.find(lower) {
        mentions.push((m.start(), m.end(), Registry::Udyam));
    }
    if let Some(m) = GST_KEYWORD.find(lower) {
        mentions.push((m.start(), m.end(), Registry::Gst));
    }
    mentions.sort_by_key(|(start, _, _)| *start);

    if mentions.is_empty() {
        return if expected { registration_answer(lower, ctx) } else { None };
    }

    let mut status = RegistrationStatus::default();
    let mut defaulted = false;
    for (i, (start, end, registry)) in mentions.iter().enumerate() {
        let after_end = mentions.get(i + 1).map(|m| m.0).unwrap_or(lower.len());
        let before_start = if i == 0 { 0 } else { mentions[i - 1].1 };
        let stated = polarity(&window_after(&lower[*end..after_end]))
            .or_else(|| polarity(&window_before(&lower[before_start..*start])));
        let value = match stated {
            Some(v) => v,
            None => {
                defaulted = true;
                true
            },
        };
        match registry {
            Registry::Udyam => status.udyam = Some(value),
            Registry::Gst => status.gst = Some(value),
        }
    }

    let value = SlotValue::Registration(status);
    let mut update = if defaulted && !expected {
        SlotUpdate::inferred(key, value, lower)
    } else {
        SlotUpdate::confirmed(key, value, lower)
    };
    update.needs_clarification = update.value.is_partial();
    Some(update)
}

/// Reply to the registration question that names neither registry
fn registration_answer(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::RegistrationStatus;
    if NEITHER.is_match(lower) {
        let status = RegistrationStatus { udyam: Some(false), gst: Some(false) };
        return Some(SlotUpdate::confirmed(key, SlotValue::Registration(status), lower));
    }
    if BOTH.is_match(lower) {
        let status = RegistrationStatus { udyam: Some(true), gst: Some(true) };
        return Some(SlotUpdate::confirmed(key, SlotValue::Registration(status), lower));
    }
    let answer = bare_answer(lower)?;

    // A yes/no after a partial answer fills the half still open
    let known = ctx.profile.registration().unwrap_or_default();
    let status = match (known.udyam, known.gst) {
        (Some(_), None) => RegistrationStatus { udyam: known.udyam, gst: Some(answer) },
        (None, Some(_)) => RegistrationStatus { udyam: Some(answer), gst: known.gst },
        _ => RegistrationStatus { udyam: Some(answer), gst: None },
    };
    let value = SlotValue::Registration(status);
    if value.is_partial() {
        Some(SlotUpdate::vague(key, value, lower))
    } else {
        Some(SlotUpdate::confirmed(key, value, lower))
    }
}

// =============================================================================
// Collateral and existing loans (utterance level)
// =============================================================================

static NO_COLLATERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:no|without|dont have|don't have|do not have|not having)\s+(?:any\s+)?(?:collateral|property|security|mortgage|guarantor)\b|\bcollateral[\s-]?free\b|\bcollateral\s+(?:nahi|nahin|no|not available)\b").unwrap()
});

static HAS_COLLATERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:have|has|got|own|with)\s+(?:a\s+|some\s+|our\s+|my\s+|an?\s+)?(?:collateral|property|land|house|plot|flat|fd|fixed deposit|building|shed)\b|\b(?:can|will|could)\s+(?:give|offer|provide|mortgage|pledge)\b|\bcollateral\s+(?:available|yes|hai|is available)\b|\bmortgage\b").unwrap()
});

static NO_LOANS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bno\s+(?:existing\s+|other\s+|current\s+|running\s+|outstanding\s+)?(?:loans?|debts?|emis?|borrowings?)\b|\bdebt[\s-]?free\b|\bloan[\s-]?free\b|\bnever taken (?:a |any )?loans?\b|\b(?:koi|no) loan nahi\b|\bdon't have (?:any )?loans?\b").unwrap()
});

static EXISTING_LOANS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:existing|running|current|ongoing|outstanding|old)\s+(?:loans?|emis?|debts?)\b|\b(?:have|has|taken|took|paying)\s+(?:a\s+|an\s+|one\s+|two\s+|some\s+|\d+\s+)?(?:loans?|emis?)\b|\bemis?\s+(?:of|is|are|running)\b").unwrap()
});

static REPAYMENT_CLEAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:no|never|not|without)\s+(?:any\s+)?(?:npas?|defaults?|defaulted|overdues?|delays?|delayed)\b|\bemis?\s+(?:are\s+|were\s+|being\s+)?(?:paid\s+)?(?:on time|regular(?:ly)?)\b|\b(?:paying|paid|pay)\s+(?:(?:all|my|our|the)\s+)?(?:emis?\s+)?(?:on time|regularly)\b|\bclean (?:record|repayment|track record)\b").unwrap()
});

static REPAYMENT_ISSUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:npa|defaulted|default|overdue|bounced|missed\s+(?:an?\s+|some\s+|few\s+)?emis?|delayed\s+emis?|emis?\s+(?:are\s+|were\s+|got\s+)?(?:delayed|late|missed|bounced|pending))\b").unwrap()
});

pub(crate) fn collateral(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::CollateralStatus;
    let mut status = CollateralStatus::default();

    if NO_COLLATERAL.is_match(lower) {
        status.has_collateral = Some(false);
    } else if HAS_COLLATERAL.is_match(lower) {
        status.has_collateral = Some(true);
    }

    if NO_LOANS.is_match(lower) {
        status.existing_loans = Some(false);
    } else if EXISTING_LOANS.is_match(lower) {
        status.existing_loans = Some(true);
    }

    if REPAYMENT_CLEAN.is_match(lower) {
        status.repayment_issues = Some(false);
        status.existing_loans.get_or_insert(true);
    } else if REPAYMENT_ISSUES.is_match(lower) {
        status.repayment_issues = Some(true);
        status.existing_loans = Some(true);
    }

    if status.existing_loans == Some(false) {
        status.repayment_issues.get_or_insert(false);
    }

    if status == CollateralStatus::default() {
        return if ctx.expects(key) { collateral_answer(lower, ctx) } else { None };
    }

    let clarify = status.has_collateral.is_none() || status.repayment_issues.is_none();
    let mut update = SlotUpdate::confirmed(key, SlotValue::Collateral(status), lower);
    update.needs_clarification = clarify;
    Some(update)
}

fn collateral_answer(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::CollateralStatus;
    if NEITHER.is_match(lower) {
        let status = CollateralStatus {
            has_collateral: Some(false),
            existing_loans: Some(false),
            repayment_issues: Some(false),
        };
        return Some(SlotUpdate::confirmed(key, SlotValue::Collateral(status), lower));
    }
    let answer = bare_answer(lower)?;
    let mut status = ctx.profile.collateral().unwrap_or_default();
    if status.has_collateral.is_none() {
        status.has_collateral = Some(answer);
    } else if status.repayment_issues.is_none() {
        // Follow-up asks about EMI delays, so "no" is the clean answer
        status.repayment_issues = Some(answer);
        if answer {
            status.existing_loans = Some(true);
        }
    } else {
        return None;
    }
    Some(SlotUpdate::inferred(key, SlotValue::Collateral(status), lower))
}

// =============================================================================
// Location (utterance level)
// =============================================================================

static DISTRICT_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([a-z]+)\s+(?:district|zila|jila)\b|\b(?:district|zila|jila)\s+([a-z]+)\b").unwrap()
});

pub(crate) fn location(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::Location;
    let state = geo::find_state(lower);
    let city = geo::find_city(lower);
    let named_district = DISTRICT_WORD.captures(lower).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| title_case(m.as_str()))
    });

    let district = city.map(|(d, _)| d.to_string()).or(named_district);
    let resolved_state = state.or(city.map(|(_, s)| s));

    if resolved_state.is_none() && district.is_none() {
        return if ctx.expects(key) { location_answer(lower) } else { None };
    }

    let value = SlotValue::Location(Location {
        state: resolved_state.map(str::to_string),
        district,
    });
    let mut update = if state.is_some() || ctx.expects(key) {
        SlotUpdate::confirmed(key, value, lower)
    } else {
        SlotUpdate::inferred(key, value, lower)
    };
    update.needs_clarification = update.value.is_partial();
    Some(update)
}

/// Unknown place name given in reply to the location question
fn location_answer(lower: &str) -> Option<SlotUpdate> {
    if bare_answer(lower).is_some() {
        return None;
    }
    let words = tokens(lower);
    if words.is_empty() || words.len() > 4 || words.iter().any(|w| w.chars().any(|c| c.is_ascii_digit())) {
        return None;
    }
    let value = SlotValue::Location(Location {
        state: None,
        district: Some(title_case(&words.join(" "))),
    });
    Some(SlotUpdate::vague(SlotKey::Location, value, lower))
}

// =============================================================================
// Ownership category (utterance level)
// =============================================================================

static OWNERSHIP_PATTERNS: Lazy<Vec<(Regex, OwnershipCategory)>> = Lazy::new(|| {
    use OwnershipCategory::*;
    vec![
        (
            Regex::new(r"\b(?:women|woman|female|lady)[\s-]+(?:entrepreneur|owned|owner|led|founder|proprietor|category)\b|\bi(?:'m| am) a (?:woman|lady|female)\b|\bmahila\b").unwrap(),
            Women,
        ),
        (Regex::new(r"\bsc\b|\bscheduled caste\b|\bdalit\b").unwrap(), Sc),
        (Regex::new(r"\bst\b|\bscheduled tribes?\b|\btribal\b").unwrap(), St),
        (Regex::new(r"\bobc\b|\bother backward\b").unwrap(), Obc),
        (
            Regex::new(r"\bminority\b|\bmuslim\b|\bchristian\b|\bsikh\b|\bbuddhist\b|\bparsi\b").unwrap(),
            Minority,
        ),
        (
            Regex::new(r"\bex[\s-]?service\s?m[ae]n\b|\bex[\s-]?army\b|\bveteran\b|\bex[\s-]?defen[cs]e\b|\bretired (?:army|soldier|jawan)\b").unwrap(),
            ExServiceman,
        ),
        (
            Regex::new(r"\bdivyang\b|\bdisabled\b|\bdisability\b|\bpwd\b|\bhandicapped\b|\bdifferently[\s-]abled\b").unwrap(),
            Divyang,
        ),
        (
            Regex::new(r"\bgeneral (?:category|caste)\b|\bopen category\b|\bno special category\b|\bnone of (?:these|them|the above)\b").unwrap(),
            General,
        ),
    ]
});

static EXPECTED_WOMEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:women|woman|female|lady)\b").unwrap());

static EXPECTED_GENERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\W*(?:general|none|no|nope|nahi|na|not applicable|nothing|normal)\b").unwrap()
});

pub(crate) fn ownership(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::OwnershipCategory;
    let mut found: BTreeSet<OwnershipCategory> = OWNERSHIP_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(lower))
        .map(|(_, c)| *c)
        .collect();

    if ctx.expects(key) {
        if EXPECTED_WOMEN.is_match(lower) {
            found.insert(OwnershipCategory::Women);
        }
        if found.is_empty() && EXPECTED_GENERAL.is_match(lower) {
            found.insert(OwnershipCategory::General);
        }
    }

    if found.iter().any(|c| c.is_special()) {
        found.remove(&OwnershipCategory::General);
    }
    if found.is_empty() {
        return None;
    }
    Some(SlotUpdate::confirmed(key, SlotValue::Ownership(found), lower))
}

// =============================================================================
// Personalization
// =============================================================================

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:my name is|my name's|name is|i am called|call me|this is|myself)\s+([a-z]+(?:\s+[a-z]+){0,2})").unwrap(),
        Regex::new(r"(?i)\bmera naam\s+([a-z]+(?:\s+[a-z]+){0,2}?)\s+(?:hai|he)\b").unwrap(),
    ]
});

const NAME_STOPWORDS: &[&str] = &[
    "and", "i", "from", "we", "my", "aur", "here", "the", "a", "an", "is", "am", "running", "owner",
    "of", "in", "with", "mera", "hai", "speaking",
];

fn clean_name(capture: &str) -> Option<String> {
    let words: Vec<&str> = capture
        .split_whitespace()
        .take_while(|w| !NAME_STOPWORDS.contains(&w.to_lowercase().as_str()))
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(title_case(&words.join(" ")))
    }
}

static NAME_REPLY_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:it's|it is|i am|i'm|this is|myself|mera naam)\s+").unwrap());

pub(crate) fn name(text: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::Name;
    if let Some(name) = NAME_PATTERNS
        .iter()
        .filter_map(|re| re.captures(text))
        .find_map(|c| c.get(1).and_then(|m| clean_name(m.as_str())))
    {
        return Some(SlotUpdate::confirmed(key, SlotValue::Text(name), text));
    }

    if !ctx.expects(key) {
        return None;
    }
    let reply = NAME_REPLY_PREFIX.replace(text, "");
    let reply = reply.trim().trim_end_matches(|c: char| c.is_ascii_punctuation());
    let words: Vec<&str> = reply.split_whitespace().collect();
    let plausible = (1..=3).contains(&words.len())
        && words.iter().all(|w| w.chars().all(|c| c.is_alphabetic() || c == '.'));
    if !plausible || bare_answer(&reply.to_lowercase()).is_some() {
        return None;
    }
    clean_name(reply).map(|name| SlotUpdate::confirmed(key, SlotValue::Text(name), text))
}

static AGE_STATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:i am|i'm|im|my age is|age is|aged|age|meri umar|umar)\s*(?:is\s+)?(\d{2})\b").unwrap()
});

static AGE_BARE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{2})\b").unwrap());

static EXPLICIT_AGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:age|aged|umar|years old|yrs old)\b").unwrap());

fn age_value(raw: &str) -> Option<u8> {
    raw.parse::<u8>().ok().filter(|n| (18..=99).contains(n))
}

pub(crate) fn age(lower: &str, ctx: &Context<'_>) -> Option<SlotUpdate> {
    let key = SlotKey::Age;
    let business_talk = BUSINESS_CONTEXT.is_match(lower) && !EXPLICIT_AGE.is_match(lower);

    if !business_talk {
        if let Some(years) = AGE_STATED
            .captures(lower)
            .and_then(|c| c.get(1))
            .and_then(|m| age_value(m.as_str()))
        {
            return Some(SlotUpdate::confirmed(key, SlotValue::Years(years), lower));
        }
    }

    if !ctx.expects(key) || business_talk {
        return None;
    }
    AGE_BARE
        .captures(lower)
        .and_then(|c| c.get(1))
        .and_then(|m| age_value(m.as_str()))
        .map(|years| SlotUpdate::confirmed(key, SlotValue::Years(years), lower))
}
