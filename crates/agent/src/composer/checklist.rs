//! Document checklist built from the profile

use udyami_config::constants::lending;
use udyami_core::{BusinessNature, DocumentGroup, Intent, IntentKind, Profile};

/// Whether the checklist belongs in a response for this intent
pub fn applies_to(intent: &Intent) -> bool {
    matches!(
        intent.kind(),
        IntentKind::DocumentChecklist | IntentKind::DiscoverSchemes | IntentKind::CheckSchemeEligibility
    )
}

fn group(title: &str, items: Vec<&str>) -> DocumentGroup {
    DocumentGroup {
        title: title.to_string(),
        items: items.into_iter().map(str::to_string).collect(),
    }
}

/// Collateral papers are needed when collateral is offered or the term
/// loan asked for is above the collateral-free limit
fn needs_collateral_documents(profile: &Profile) -> bool {
    if profile.collateral().and_then(|c| c.has_collateral) == Some(true) {
        return true;
    }
    profile.finance().is_some_and(|f| {
        f.purpose.is_some_and(|p| p.is_term_loan())
            && f.amount.is_some_and(|a| a.min_inr() >= lending::COLLATERAL_FREE_LIMIT_INR)
    })
}

pub fn document_checklist(profile: &Profile) -> Vec<DocumentGroup> {
    let mut groups = vec![group(
        "Identity & KYC",
        vec![
            "PAN card of the business and the proprietor/partners/directors",
            "Aadhaar card of the proprietor/partners/directors",
            "Passport-size photographs",
            "Address proof of the business premises (rent agreement or ownership papers)",
        ],
    )];

    let registration = profile.registration().unwrap_or_default();
    let mut licenses = Vec::new();
    if registration.udyam == Some(true) {
        licenses.push("Udyam registration certificate".to_string());
    } else {
        licenses.push("Udyam registration certificate (register free at udyamregistration.gov.in)".to_string());
    }
    match registration.gst {
        Some(false) => {},
        _ => licenses.push("GST registration certificate".to_string()),
    }
    licenses.push("Shop & Establishment licence or trade licence".to_string());
    if profile.nature() == Some(BusinessNature::Manufacturing) {
        licenses.push("Factory licence and pollution control consent, if applicable".to_string());
    }
    if let Some(categories) = profile.ownership() {
        if categories.iter().any(|c| c.is_special()) {
            licenses.push("Category certificate (caste, minority, ex-serviceman or disability) for preferential benefits".to_string());
        }
    }
    groups.push(DocumentGroup {
        title: "Business registration & licenses".to_string(),
        items: licenses,
    });

    let mut financials = vec![
        "Bank statements for the last 12 months".to_string(),
        "Income tax returns for the last 2–3 years".to_string(),
    ];
    if registration.gst == Some(true) {
        financials.push("GST returns for the last 12 months".to_string());
    }
    let established = profile.start_year().is_some() && profile.turnover().is_some_and(|b| b.from_step > 0);
    if established {
        financials.push("Audited or CA-certified balance sheet and P&L".to_string());
    }
    if profile.collateral().and_then(|c| c.existing_loans) == Some(true) {
        financials.push("Sanction letters and repayment statements of existing loans".to_string());
    }
    groups.push(DocumentGroup {
        title: "Financials & banking".to_string(),
        items: financials,
    });

    if needs_collateral_documents(profile) {
        groups.push(group(
            "Collateral documents",
            vec![
                "Title deeds of the property offered as security",
                "Valuation report from a bank-approved valuer",
                "Encumbrance certificate",
            ],
        ));
    }

    let mut other = vec!["Project report or business plan".to_string()];
    if profile.finance().and_then(|f| f.purpose).is_some_and(|p| p.is_term_loan()) {
        other.push("Quotations for machinery or equipment".to_string());
    }
    groups.push(DocumentGroup {
        title: "Other supporting documents".to_string(),
        items: other,
    });
    groups
}
