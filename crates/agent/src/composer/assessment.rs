//! Eligibility assessment
//!
//! Deterministic scoring of a profile: user segment, a 0–100 eligibility
//! score with strengths and weaknesses, red flags, a bankability grade,
//! per-scheme fit and what-if comparisons between two profiles.

use serde::Serialize;

use udyami_config::constants::lending;
use udyami_core::{
    format_inr, BankabilityGrade, BusinessNature, ClaimConfidence, Confidence, EligibilityAssessment,
    FinancePurpose, Profile, SchemeRecord, SlotKey, SlotUpdate,
};

/// Slots the score is computed from
const SCORED_SLOTS: [SlotKey; 5] = [
    SlotKey::BusinessNature,
    SlotKey::BusinessAge,
    SlotKey::TurnoverBand,
    SlotKey::RegistrationStatus,
    SlotKey::CollateralStatus,
];

/// Broad kind of user, used to shift the emphasis of guidance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserSegment {
    NewEntrepreneur,
    ExpandingMsme,
    WorkingCapitalTrader,
}

impl UserSegment {
    pub fn describe(&self) -> &'static str {
        match self {
            UserSegment::NewEntrepreneur => "a new entrepreneur in the first years of your business",
            UserSegment::ExpandingMsme => "an existing MSME looking to grow or upgrade",
            UserSegment::WorkingCapitalTrader => "a trader focused mainly on working capital",
        }
    }

    pub fn statement(&self) -> String {
        format!("From your details, I understand you are {}.", self.describe())
    }
}

pub(crate) fn is_new_business(profile: &Profile, reference_year: i32) -> bool {
    profile.start_year().is_some_and(|y| y >= reference_year - 1)
}

fn purpose(profile: &Profile) -> Option<FinancePurpose> {
    profile.finance().and_then(|f| f.purpose)
}

/// Infer the user segment; `None` until nature or business age is known
pub fn infer_segment(profile: &Profile, reference_year: i32) -> Option<UserSegment> {
    if is_new_business(profile, reference_year) || purpose(profile) == Some(FinancePurpose::NewUnit) {
        return Some(UserSegment::NewEntrepreneur);
    }
    match (profile.nature(), purpose(profile)) {
        (Some(BusinessNature::Trading), None | Some(FinancePurpose::WorkingCapital)) => {
            Some(UserSegment::WorkingCapitalTrader)
        },
        (Some(_), _) => Some(UserSegment::ExpandingMsme),
        (None, _) if profile.start_year().is_some() => Some(UserSegment::ExpandingMsme),
        _ => None,
    }
}

// =============================================================================
// Score
// =============================================================================

struct Tally {
    points: i32,
    strengths: Vec<String>,
    weaknesses: Vec<String>,
}

impl Tally {
    fn strength(&mut self, points: i32, text: String) {
        self.points += points;
        self.strengths.push(text);
    }

    fn weakness(&mut self, points: i32, text: String) {
        self.points -= points;
        self.weaknesses.push(text);
    }
}

fn tally(profile: &Profile, reference_year: i32) -> Tally {
    let mut t = Tally {
        points: 40,
        strengths: Vec::new(),
        weaknesses: Vec::new(),
    };

    if let Some(c) = profile.collateral() {
        match c.has_collateral {
            Some(true) => t.strength(10, "Collateral available to offer".to_string()),
            Some(false) => t.weakness(0, "No collateral, so only collateral-free limits apply".to_string()),
            None => {},
        }
        match (c.repayment_issues, c.existing_loans) {
            (Some(true), _) => t.weakness(25, "EMI delays or NPA on existing loans".to_string()),
            (Some(false), Some(true)) => t.strength(10, "Existing loans repaid on time".to_string()),
            (Some(false), _) => t.strength(5, "No existing debt burden".to_string()),
            _ => {},
        }
    }

    if let Some(band) = profile.turnover() {
        match band.from_step {
            0 => t.weakness(0, format!("Turnover {} is small for larger loans", band.label().to_lowercase())),
            1 => t.strength(5, format!("Turnover of {}", band.label())),
            2 => t.strength(10, format!("Healthy turnover of {}", band.label())),
            _ => t.strength(15, format!("Strong turnover of {}", band.label())),
        }
    }

    match profile.nature() {
        Some(BusinessNature::Manufacturing) => {
            t.strength(10, "Manufacturing is a priority sector for most schemes".to_string())
        },
        Some(BusinessNature::Services) => t.strength(5, "Services units qualify for most credit schemes".to_string()),
        Some(BusinessNature::Trading) => {
            t.weakness(0, "Several subsidy schemes exclude pure trading".to_string())
        },
        None => {},
    }

    if let Some(r) = profile.registration() {
        match r.udyam {
            Some(true) => t.strength(10, "Udyam registered".to_string()),
            Some(false) => t.weakness(10, "No Udyam registration yet".to_string()),
            None => {},
        }
        if r.gst == Some(true) {
            t.strength(5, "GST registered, so turnover is documented".to_string());
        }
    }

    if let Some(year) = profile.start_year() {
        match reference_year - year {
            age if age >= 3 => t.strength(10, format!("Operating since {}", year)),
            1 | 2 => t.strength(5, format!("In business since {}", year)),
            _ => t.weakness(0, "New business without a repayment track record".to_string()),
        }
    }

    if let Some(categories) = profile.ownership() {
        let special: Vec<&str> = categories.iter().filter(|c| c.is_special()).map(|c| c.label()).collect();
        if !special.is_empty() {
            t.strength(5, format!("{} category gets preference in several schemes", special.join(", ")));
        }
    }

    if over_leveraged(profile) {
        t.weakness(10, "Finance ask is large relative to turnover".to_string());
    }
    t
}

fn over_leveraged(profile: &Profile) -> bool {
    let ask = profile.finance().and_then(|f| f.amount);
    let ceiling = profile.turnover().and_then(|b| b.max_inr());
    match (ask, ceiling) {
        (Some(ask), Some(max)) => ask.min_inr() > max.saturating_mul(lending::LOAN_TO_TURNOVER_MAX_RATIO),
        _ => false,
    }
}

/// Eligibility score from 0 to 100
pub fn eligibility_score(profile: &Profile, reference_year: i32) -> u8 {
    tally(profile, reference_year).points.clamp(0, 100) as u8
}

/// Grade from score; repayment issues cap the grade at B
pub fn bankability(score: u8, profile: &Profile) -> BankabilityGrade {
    let grade = match score {
        80..=100 => BankabilityGrade::APlus,
        65..=79 => BankabilityGrade::A,
        50..=64 => BankabilityGrade::BPlus,
        35..=49 => BankabilityGrade::B,
        _ => BankabilityGrade::C,
    };
    let troubled = profile.collateral().and_then(|c| c.repayment_issues) == Some(true);
    if troubled {
        grade.min(BankabilityGrade::B)
    } else {
        grade
    }
}

/// Things a lender or scheme office is likely to object to
pub fn red_flags(profile: &Profile, reference_year: i32) -> Vec<String> {
    let mut flags = Vec::new();
    let collateral = profile.collateral().unwrap_or_default();
    let registration = profile.registration().unwrap_or_default();
    let nature = profile.nature();
    let ask = profile.finance().and_then(|f| f.amount);

    if collateral.repayment_issues == Some(true) {
        flags.push("EMI delays or NPA reported: lenders will usually want the account regularised before a new loan.".to_string());
    }
    if registration.udyam == Some(false) {
        flags.push("No Udyam registration: most MSME schemes require it, and it is free at udyamregistration.gov.in.".to_string());
    }
    let goods = matches!(nature, Some(BusinessNature::Trading | BusinessNature::Manufacturing));
    if let Some(band) = profile.turnover() {
        if registration.gst == Some(false) && goods && band.min_inr() >= lending::GST_THRESHOLD_GOODS_INR {
            flags.push(format!(
                "No GST registration although a goods business with turnover of {} is usually expected to have it.",
                band.label()
            ));
        }
    }
    if nature == Some(BusinessNature::Trading) && purpose(profile) == Some(FinancePurpose::SubsidyOnly) {
        flags.push("PMEGP-type capital subsidies do not cover pure retail trading.".to_string());
    }
    if let Some(ask) = ask {
        if is_new_business(profile, reference_year) && ask.min_inr() >= lending::NEW_BUSINESS_HIGH_LOAN_INR {
            flags.push(format!(
                "A business this new asking for {} will face close scrutiny; consider a smaller first loan.",
                ask.label()
            ));
        }
    }
    if over_leveraged(profile) {
        if let (Some(ask), Some(turnover)) = (ask, profile.turnover()) {
            flags.push(format!(
                "Finance ask of {} is more than twice the turnover band ({}).",
                ask.label(),
                turnover.label()
            ));
        }
    }
    flags
}

fn assessment_confidence(profile: &Profile) -> ClaimConfidence {
    let slots: Vec<_> = SCORED_SLOTS.iter().map(|k| profile.get(*k)).collect();
    if slots.iter().any(|s| !s.is_filled()) {
        return ClaimConfidence::Low;
    }
    let solid = slots.iter().all(|s| {
        s.confidence == Confidence::Confirmed
            && !s.needs_reconfirmation
            && s.value.as_ref().is_some_and(|v| !v.is_partial())
    });
    if solid {
        ClaimConfidence::High
    } else {
        ClaimConfidence::Medium
    }
}

/// Full assessment of a profile
pub fn assess(profile: &Profile, reference_year: i32) -> EligibilityAssessment {
    let tally = tally(profile, reference_year);
    let score = tally.points.clamp(0, 100) as u8;
    EligibilityAssessment {
        score,
        strengths: tally.strengths,
        weaknesses: tally.weaknesses,
        red_flags: red_flags(profile, reference_year),
        bankability: bankability(score, profile),
        confidence: assessment_confidence(profile),
    }
}

// =============================================================================
// Scheme fit
// =============================================================================

/// How one scheme record fits a profile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemeFit {
    /// No hard condition is violated by a known slot value
    pub eligible: bool,
    pub reasons: Vec<String>,
    pub concerns: Vec<String>,
}

/// Check a record's eligibility hints against the profile
pub fn scheme_fit(profile: &Profile, record: &SchemeRecord, reference_year: i32) -> SchemeFit {
    let hints = &record.eligibility;
    let mut fit = SchemeFit {
        eligible: true,
        ..Default::default()
    };

    if let Some(nature) = profile.nature() {
        if !hints.natures.is_empty() {
            if hints.natures.contains(&nature) {
                fit.reasons.push(format!("covers {} units", nature.label().to_lowercase()));
            } else {
                fit.eligible = false;
                fit.concerns.push(format!("does not cover {} units", nature.label().to_lowercase()));
            }
        }
        if hints.excludes_retail_trading && nature == BusinessNature::Trading {
            fit.eligible = false;
            fit.concerns.push("excludes pure trading".to_string());
        }
    }

    if let (Some(state), false) = (profile.location().and_then(|l| l.state.as_ref()), hints.states.is_empty()) {
        if hints.states.iter().any(|s| s.eq_ignore_ascii_case(state)) {
            fit.reasons.push(format!("available in {}", state));
        } else {
            fit.eligible = false;
            fit.concerns.push(format!("not offered in {}", state));
        }
    }

    if let (Some(band), Some(max)) = (profile.turnover(), hints.max_turnover_inr) {
        if band.min_inr() > max {
            fit.eligible = false;
            fit.concerns.push(format!("turnover of {} is above the {} ceiling", band.label(), format_inr(max)));
        }
    }

    let finance = profile.finance().unwrap_or_default();
    if let Some(purpose) = finance.purpose {
        if hints.purposes.contains(&purpose) {
            fit.reasons.push(format!("supports {}", purpose.label()));
        }
    }

    if hints.collateral_free && profile.collateral().and_then(|c| c.has_collateral) == Some(false) {
        fit.reasons.push("is collateral-free, which suits your no-collateral position".to_string());
    }

    if let (Some(ask), Some(max)) = (finance.amount, hints.max_loan_inr) {
        if ask.min_inr() > max {
            fit.concerns.push(format!("your ask of {} is above its {} limit", ask.label(), format_inr(max)));
        } else if ask.max_inr().is_some_and(|top| top <= max) {
            fit.reasons.push(format!("your ask of {} is within its {} limit", ask.label(), format_inr(max)));
        }
    }

    if hints.requires_udyam {
        match profile.registration().and_then(|r| r.udyam) {
            Some(true) => fit.reasons.push("you already have Udyam registration".to_string()),
            Some(false) => fit.concerns.push("needs Udyam registration first".to_string()),
            None => fit.concerns.push("requires Udyam registration".to_string()),
        }
    }

    if hints.new_units_only {
        let new = is_new_business(profile, reference_year) || finance.purpose == Some(FinancePurpose::NewUnit);
        match profile.start_year() {
            _ if new => fit.reasons.push("is meant for new units like yours".to_string()),
            Some(year) => fit.concerns.push(format!("is meant for new units, and yours started in {}", year)),
            None => {},
        }
    }

    if let Some(categories) = profile.ownership() {
        if let Some(preferred) = hints.preferred_categories.iter().find(|c| categories.contains(c)) {
            fit.reasons.push(format!("gives preference to the {} category", preferred.label()));
        }
    }

    fit
}

// =============================================================================
// What-if
// =============================================================================

/// Side-by-side outcome of changing one slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub slot: SlotKey,
    pub before: String,
    pub after: String,
    pub score_a: u8,
    pub score_b: u8,
    pub grade_a: BankabilityGrade,
    pub grade_b: BankabilityGrade,
    /// Schemes that only fit after the change
    pub unlocked: Vec<String>,
    /// Schemes that fit both ways but better after the change
    pub strengthened: Vec<String>,
    pub resolved_flags: Vec<String>,
    pub new_flags: Vec<String>,
}

/// Compare the profile as it is (scenario A) with the profile after
/// `change` (scenario B)
pub fn compare_scenarios(
    base: &Profile,
    change: &SlotUpdate,
    records: &[SchemeRecord],
    reference_year: i32,
) -> ScenarioComparison {
    let mut changed = base.clone();
    let slot = changed.get_mut(change.key);
    slot.value = Some(change.value.clone());
    slot.confidence = Confidence::Confirmed;
    slot.needs_reconfirmation = false;
    slot.pending = None;

    let score_a = eligibility_score(base, reference_year);
    let score_b = eligibility_score(&changed, reference_year);

    let mut unlocked = Vec::new();
    let mut strengthened = Vec::new();
    for record in records {
        let a = scheme_fit(base, record, reference_year);
        let b = scheme_fit(&changed, record, reference_year);
        if b.eligible && !a.eligible {
            unlocked.push(record.name.clone());
        } else if a.eligible && b.eligible && (b.concerns.len() < a.concerns.len() || b.reasons.len() > a.reasons.len()) {
            strengthened.push(record.name.clone());
        }
    }
    unlocked.dedup();
    strengthened.dedup();

    let flags_a = red_flags(base, reference_year);
    let flags_b = red_flags(&changed, reference_year);

    ScenarioComparison {
        slot: change.key,
        before: base.get(change.key).describe(),
        after: change.value.describe(),
        score_a,
        score_b,
        grade_a: bankability(score_a, base),
        grade_b: bankability(score_b, &changed),
        unlocked,
        strengthened,
        resolved_flags: flags_a.iter().filter(|f| !flags_b.contains(f)).cloned().collect(),
        new_flags: flags_b.iter().filter(|f| !flags_a.contains(f)).cloned().collect(),
    }
}
