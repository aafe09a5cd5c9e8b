//! Outputs composed only when asked for: a side-by-side scheme comparison,
//! a bank pitch in the user's own words and a project report (DPR) outline

use udyami_core::{
    BankPitch, BusinessNature, ComparisonRow, DprSection, FinancePurpose, Profile, SchemeCategory,
    SchemeComparison, SchemeRecord,
};

use super::assessment::{is_new_business, scheme_fit};
use super::guidance::soften_outcome_claims;

pub const PITCH_TITLE: &str = "Bank Pitch (You can say this)";

fn compact(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Loose scheme-name match: "Standup India" finds "Stand-Up India"
pub fn names_match(record: &str, wanted: &str) -> bool {
    let (record, wanted) = (compact(record), compact(wanted));
    !record.is_empty() && !wanted.is_empty() && (record.starts_with(&wanted) || wanted.starts_with(&record))
}

// =============================================================================
// Comparison
// =============================================================================

fn first_sentence(text: &str) -> &str {
    match text.find(". ") {
        Some(end) => &text[..=end],
        None => text,
    }
}

fn support(record: &SchemeRecord) -> String {
    let summary = record.summary.to_lowercase();
    if summary.contains("guarantee") {
        "Credit guarantee on the bank loan".to_string()
    } else if summary.contains("subsidy") {
        "Subsidy on project cost, released through the bank".to_string()
    } else if record.resolved_category() == SchemeCategory::CreditLinked {
        "Bank credit on scheme terms".to_string()
    } else {
        record.resolved_category().label().to_string()
    }
}

fn suited_for(record: &SchemeRecord) -> String {
    let hints = &record.eligibility;
    let mut who = if hints.natures.is_empty() {
        "Micro and small units of any kind".to_string()
    } else {
        let natures: Vec<&str> = hints.natures.iter().map(BusinessNature::label).collect();
        format!("{} units", natures.join(" and "))
    };
    if hints.new_units_only {
        who.push_str(", new (first-time) projects only");
    }
    if !hints.preferred_categories.is_empty() {
        let categories: Vec<&str> = hints.preferred_categories.iter().map(|c| c.label()).collect();
        who.push_str(&format!("; extra benefit for {}", categories.join(", ")));
    }
    who
}

fn complexity(record: &SchemeRecord) -> &'static str {
    let hints = &record.eligibility;
    if hints.new_units_only || record.resolved_category() == SchemeCategory::SubsidyCapital {
        "Higher: project report, sponsoring agency review and bank appraisal"
    } else if hints.collateral_free && record.resolved_category() == SchemeCategory::CreditLinked {
        "Moderate: applied through your bank like a normal loan"
    } else if record.conditions.len() > 3 {
        "Higher: several conditions to document"
    } else {
        "Moderate"
    }
}

fn comparison_row(record: &SchemeRecord, profile: &Profile, reference_year: i32) -> ComparisonRow {
    let fit = scheme_fit(profile, record, reference_year);
    let fits = fit.eligible && fit.concerns.is_empty();
    let notes = if fits { fit.reasons } else { fit.concerns };
    ComparisonRow {
        scheme: record.name.clone(),
        purpose: format!(
            "{}: {}",
            record.resolved_category().label(),
            soften_outcome_claims(first_sentence(&record.summary))
        ),
        amount_range: record
            .amount_range
            .as_deref()
            .map(soften_outcome_claims)
            .unwrap_or_else(|| "Not stated".to_string()),
        collateral: if record.eligibility.collateral_free {
            "Not required".to_string()
        } else {
            "As per bank norms; may be asked".to_string()
        },
        support: support(record),
        suited_for: suited_for(record),
        complexity: complexity(record).to_string(),
        fits,
        notes,
    }
}

/// Set the named schemes side by side against the profile
///
/// Names are matched loosely against `records`; a name with no record is
/// listed in `not_found` rather than guessed at.
pub fn compare_schemes(
    names: &[String],
    records: &[SchemeRecord],
    profile: &Profile,
    reference_year: i32,
) -> SchemeComparison {
    let mut rows: Vec<ComparisonRow> = Vec::new();
    let mut not_found = Vec::new();
    for name in names {
        match records.iter().find(|r| names_match(&r.name, name)) {
            Some(record) if !rows.iter().any(|row| row.scheme == record.name) => {
                rows.push(comparison_row(record, profile, reference_year));
            },
            Some(_) => {},
            None => not_found.push(name.clone()),
        }
    }

    let fitting: Vec<&ComparisonRow> = rows.iter().filter(|r| r.fits).collect();
    let verdict = if rows.is_empty() {
        "I could not find scheme data for these names, so I cannot compare them yet.".to_string()
    } else {
        match fitting.as_slice() {
            [] => "From your details, none of these clearly fits; the notes show what holds each one back.".to_string(),
            [only] => format!("From your details, {} is the one that fits.", only.scheme),
            _ => {
                // Most profile-backed reasons wins; ties go to the earlier name
                let best = fitting
                    .iter()
                    .rev()
                    .max_by_key(|r| r.notes.len())
                    .map(|r| r.scheme.as_str())
                    .unwrap_or_default();
                format!(
                    "From your details, more than one could work; {} looks the stronger fit. Confirm terms with your bank before choosing.",
                    best
                )
            },
        }
    };
    tracing::debug!(rows = rows.len(), missing = not_found.len(), "Compared schemes");

    SchemeComparison {
        rows,
        verdict,
        not_found,
    }
}

// =============================================================================
// Bank pitch
// =============================================================================

fn use_of_funds(purpose: Option<FinancePurpose>) -> &'static str {
    match purpose {
        Some(FinancePurpose::MachineryTermLoan) => "buying machinery",
        Some(FinancePurpose::WorkingCapital) => "raw material and running expenses",
        Some(FinancePurpose::Expansion) => "expanding the unit",
        Some(FinancePurpose::NewUnit) => "setting up the unit",
        Some(FinancePurpose::TopUp) => "completing ongoing work",
        Some(FinancePurpose::SubsidyOnly) => "the project, alongside scheme subsidy",
        Some(FinancePurpose::Other) | None => "running and growing the business",
    }
}

fn benefit(purpose: Option<FinancePurpose>) -> &'static str {
    match purpose {
        Some(FinancePurpose::MachineryTermLoan) => "This will help us raise capacity and bring down the cost per unit.",
        Some(FinancePurpose::WorkingCapital) => "This will help us buy raw material on time and take larger orders.",
        Some(FinancePurpose::Expansion) => "This will help us grow output and serve more customers.",
        Some(FinancePurpose::NewUnit) => "This will help us start operations and build a steady order book.",
        Some(FinancePurpose::TopUp) => "This will help us complete work that is already under way.",
        _ => "This will help us grow the business.",
    }
}

/// A short pitch built from the profile, one sentence per line
///
/// Only slots the user actually shared are used; nothing is assumed.
pub fn bank_pitch(profile: &Profile, records: &[SchemeRecord], reference_year: i32) -> BankPitch {
    let mut lines = Vec::new();

    let mut opener = match profile.nature() {
        Some(nature) => format!("I run a {} unit", nature.label().to_lowercase()),
        None => "I run a small business".to_string(),
    };
    if let Some(product) = profile.product() {
        opener.push_str(&format!(" ({})", product));
    }
    if let Some(location) = profile.location() {
        if let Some(place) = location.district.as_ref().or(location.state.as_ref()) {
            opener.push_str(&format!(" in {}", place));
        }
    }
    match profile.start_year() {
        Some(year) if year >= reference_year => opener.push_str(" that is starting operations this year"),
        Some(year) => opener.push_str(&format!(" since {}", year)),
        None => {},
    }
    opener.push('.');
    lines.push(opener);

    match profile.turnover() {
        Some(band) => lines.push(format!("Our approximate annual turnover is {}.", band.label())),
        None if is_new_business(profile, reference_year) => {
            lines.push("We are a new unit, so there is no turnover history yet.".to_string())
        },
        None => {},
    }
    if let Some(registration) = profile.registration() {
        match (registration.udyam, registration.gst) {
            (Some(true), Some(true)) => lines.push("The unit is Udyam and GST registered.".to_string()),
            (Some(true), _) => lines.push("The unit is Udyam registered.".to_string()),
            _ => {},
        }
    }

    let finance = profile.finance();
    let purpose = finance.and_then(|f| f.purpose);
    let facility = match purpose {
        Some(FinancePurpose::WorkingCapital) => "working capital limit",
        Some(p) if p.is_term_loan() => "term loan",
        _ => "loan",
    };
    let amount = finance
        .and_then(|f| f.amount)
        .map(|band| format!("{} ", band.label()))
        .unwrap_or_default();
    lines.push(format!("I am seeking a {}{} mainly for {}.", amount, facility, use_of_funds(purpose)));
    lines.push(benefit(purpose).to_string());

    let collateral = profile.collateral();
    match collateral.and_then(|c| c.has_collateral) {
        Some(true) => lines.push("I can offer collateral (property or machinery) as security.".to_string()),
        Some(false) => {
            let cover = records
                .iter()
                .find(|r| r.eligibility.collateral_free && scheme_fit(profile, r, reference_year).eligible)
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "CGTMSE".to_string());
            lines.push(format!(
                "I do not have collateral, so I request the loan under {} cover without collateral.",
                cover
            ));
        },
        None => {},
    }

    let repayment = match collateral.map(|c| (c.existing_loans, c.repayment_issues)) {
        Some((_, Some(true))) => {
            "I will explain the earlier EMI delays openly and show how business cash flow now covers the new EMI."
        },
        Some((Some(true), Some(false))) => {
            "My current EMIs are paid on time, and the new EMI will be serviced from regular business cash flow."
        },
        _ => "EMIs will be serviced from regular business cash flow.",
    };
    lines.push(repayment.to_string());

    BankPitch {
        title: PITCH_TITLE.to_string(),
        lines,
    }
}

// =============================================================================
// Project report outline
// =============================================================================

fn section(heading: &str, points: Vec<String>) -> DprSection {
    DprSection {
        heading: heading.to_string(),
        points,
    }
}

/// DPR headings with pointers drawn from the profile; an outline to expand,
/// not a financial model
pub fn dpr_outline(profile: &Profile, reference_year: i32) -> Vec<DprSection> {
    let new_unit = is_new_business(profile, reference_year);
    let nature = profile.nature();
    let finance = profile.finance();

    let mut overview = Vec::new();
    if let Some(nature) = nature {
        overview.push(format!("Nature of business: {}", nature.label()));
    }
    if let Some(location) = profile.location() {
        let place = [location.district.as_deref(), location.state.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        if !place.is_empty() {
            overview.push(format!("Location: {}", place));
        }
    }
    overview.push(match profile.start_year() {
        Some(year) if !new_unit => format!("Operating since {}; summarise the track record so far", year),
        _ => "New project: explain why now and why this location".to_string(),
    });

    let mut means = vec![
        "Project cost: land and building, machinery, pre-operative expenses and margin for working capital".to_string(),
    ];
    means.push(match finance.and_then(|f| f.amount) {
        Some(band) => format!(
            "Means of finance: your own contribution, the bank loan ({}) and any subsidy",
            band.label()
        ),
        None => "Means of finance: your own contribution, the bank loan and any subsidy".to_string(),
    });

    let mut revenue = vec!["Projected sales for 3 to 5 years, with the price and capacity use they assume".to_string()];
    if let Some(band) = profile.turnover() {
        revenue.push(format!("Start from the current turnover of {}", band.label()));
    }
    revenue.push("Costs, margins and the year the project breaks even".to_string());

    let technical = match nature {
        Some(BusinessNature::Manufacturing) | None => {
            "Machinery list with supplier quotations, installed capacity, power and water needs"
        },
        Some(BusinessNature::Services) => "Equipment, software and premises needed to deliver the service",
        Some(BusinessNature::Trading) => "Storage, stock turnover and supplier arrangements",
    };

    let mut summary = vec!["What the unit does, what the project is, its total cost and the loan asked for".to_string()];
    if let Some(f) = finance {
        if let Some(purpose) = f.purpose {
            summary.push(format!("Purpose of finance: {}", purpose.label()));
        }
    }

    let promoter = match profile.ownership() {
        Some(categories) => {
            let labels: Vec<&str> = categories.iter().map(|c| c.label()).collect();
            format!("Promoter background and experience in this line; category: {}", labels.join(", "))
        },
        None => "Promoter background and experience in this line".to_string(),
    };

    vec![
        section("Executive summary", summary),
        section("Promoter profile", vec![promoter]),
        section("Business overview", overview),
        section(
            "Market opportunity",
            vec!["Target customers, demand in your area and the main competitors".to_string()],
        ),
        section(
            "Product / service details",
            vec![match profile.product() {
                Some(product) => format!("{}: specifications, quality standards and pricing", product),
                None => "What you make or provide, with specifications and pricing".to_string(),
            }],
        ),
        section("Technical details / machinery", vec![technical.to_string()]),
        section("Project cost & means of finance", means),
        section("Revenue model & profitability logic", revenue),
        section(
            "Risk factors and mitigations",
            vec!["Demand, input prices, delays in payment from buyers, and how each is handled".to_string()],
        ),
        section(
            "Repayment capacity",
            vec![
                "Year-wise cash available for debt service against the EMI (DSCR); banks usually look for about 1.25 or more".to_string(),
                "Moratorium asked for, if any, and the repayment period".to_string(),
            ],
        ),
        section(
            "Conclusion",
            vec!["Why the project is viable and what the loan will achieve".to_string()],
        ),
    ]
}
