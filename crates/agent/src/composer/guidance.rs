//! Intent-specific guidance and the outcome-language guard

use once_cell::sync::Lazy;
use regex::Regex;

use udyami_core::{Intent, Profile};

use super::assessment::UserSegment;

/// Approval guarantees rewritten to likelihood language
static OUTCOME_CLAIMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)\b(?:is|are)\s+guaranteed\s+to\s+be\s+approved\b").unwrap(),
            "may be approved",
        ),
        (Regex::new(r"(?i)\bwill\s+(?:surely\s+|definitely\s+)?be\s+approved\b").unwrap(), "may be approved"),
        (Regex::new(r"(?i)\bguaranteed\s+approvals?\b").unwrap(), "a good chance of approval"),
        (Regex::new(r"(?i)\b100\s*%\s+approvals?\b").unwrap(), "a good chance of approval"),
        (Regex::new(r"(?i)\bapproval\s+is\s+guaranteed\b").unwrap(), "approval is likely"),
    ]
});

/// Rewrite approval guarantees in retrieved text
pub fn soften_outcome_claims(text: &str) -> String {
    OUTCOME_CLAIMS
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            pattern.replace_all(&acc, *replacement).into_owned()
        })
}

fn udyam_missing(profile: &Profile) -> bool {
    profile.registration().and_then(|r| r.udyam) != Some(true)
}

fn delayed_payment(profile: &Profile) -> Vec<String> {
    let mut steps = vec![
        "Buyers must pay MSME suppliers within the agreed period, and never later than 45 days from acceptance of goods or services.".to_string(),
        "Delayed amounts attract compound interest at three times the RBI bank rate.".to_string(),
        "File a case on the MSME Samadhaan portal (samadhaan.msme.gov.in) with invoices, purchase orders and proof of delivery; the Micro and Small Enterprises Facilitation Council takes it up.".to_string(),
    ];
    if udyam_missing(profile) {
        steps.insert(
            0,
            "Udyam registration is a prerequisite for MSME Samadhaan, so complete it first (free at udyamregistration.gov.in).".to_string(),
        );
    } else {
        steps.push("Keep your Udyam registration number handy for the application.".to_string());
    }
    steps
}

fn market_access(platform: &str, profile: &Profile) -> Vec<String> {
    let lower = platform.to_lowercase();
    let mut steps = if lower.contains("gem") {
        vec![
            "Register as a seller on GeM (gem.gov.in) using your PAN, Aadhaar-linked mobile and bank details.".to_string(),
            "Complete the vendor assessment and list your products or services under the right category.".to_string(),
            "MSEs are exempt from earnest money deposits and get purchase preference in many government tenders.".to_string(),
        ]
    } else if lower.contains("ondc") {
        vec![
            "Join ONDC through a seller-side network participant app of your choice.".to_string(),
            "Complete KYC and the catalogue listing with prices, images and delivery terms.".to_string(),
            "Set up logistics and settlement so orders from any buyer app reach you.".to_string(),
        ]
    } else {
        vec![
            format!("Check the seller requirements of {} and prepare KYC and bank details.", platform),
            "List a small catalogue first and track which products convert.".to_string(),
            "Compare commissions and payment cycles across platforms before scaling up.".to_string(),
        ]
    };
    if profile.registration().and_then(|r| r.gst) != Some(true) {
        steps.push("Most marketplaces ask for GST registration, so keep it ready.".to_string());
    }
    steps
}

fn general_advice(segment: Option<UserSegment>) -> Vec<String> {
    let mut steps = vec![
        "Get Udyam registration if you have not already; it unlocks most MSME benefits.".to_string(),
        "Keep clean books and route business receipts through one bank account.".to_string(),
        "Talk to your District Industries Centre (DIC) about schemes active in your district.".to_string(),
    ];
    match segment {
        Some(UserSegment::NewEntrepreneur) => {
            steps.push("Prepare a simple project report before approaching a bank; it shapes the loan size you are offered.".to_string())
        },
        Some(UserSegment::WorkingCapitalTrader) => {
            steps.push("Ask your bank about a cash credit or overdraft limit sized to your monthly purchases.".to_string())
        },
        Some(UserSegment::ExpandingMsme) => {
            steps.push("Use your repayment track record to negotiate rates and collateral-free limits.".to_string())
        },
        None => {},
    }
    steps
}

fn scheme_next_steps(profile: &Profile, segment: Option<UserSegment>) -> Vec<String> {
    let mut steps = Vec::new();
    if udyam_missing(profile) {
        steps.push("Complete Udyam registration first; most of these schemes ask for it.".to_string());
    }
    steps.push("Shortlist one or two schemes and confirm the current terms with your bank branch or DIC.".to_string());
    if segment == Some(UserSegment::NewEntrepreneur) {
        steps.push("Keep a project report and machinery quotations ready before applying.".to_string());
    } else {
        steps.push("Keep the last 12 months of bank statements and your latest ITR ready.".to_string());
    }
    steps
}

/// Guidance lines for the working intent
pub fn intent_guidance(intent: &Intent, profile: &Profile, segment: Option<UserSegment>) -> Vec<String> {
    match intent {
        Intent::DelayedPayment => delayed_payment(profile),
        Intent::MarketAccess { platform } => market_access(platform, profile),
        Intent::GeneralAdvice => general_advice(segment),
        Intent::DiscoverSchemes | Intent::CheckSchemeEligibility { .. } | Intent::Unclear => {
            scheme_next_steps(profile, segment)
        },
        Intent::DocumentChecklist => vec![
            "Keep self-attested copies of every document and the originals for verification.".to_string(),
        ],
    }
}
