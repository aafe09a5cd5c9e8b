//! Centralized constants for the navigator
//!
//! Single source of truth for default policy values and fixed user-facing
//! text. Settings fall back to these when a field is not configured.

/// Assistant name used in greetings
pub const AI_NAME: &str = "Udyami";

/// Retrieval defaults
pub mod retrieval {
    /// Records requested from the knowledge service
    pub const DEFAULT_TOP_K: usize = 20;

    /// Records scoring below this are dropped
    pub const DEFAULT_MIN_SCORE: f32 = 0.05;

    /// Upper bound on one knowledge service call
    pub const TIMEOUT_MS: u64 = 8_000;

    /// Corpus age after which a fresh lookup is allowed
    pub const STALENESS_DAYS: i64 = 180;
}

/// Question planner defaults
pub mod planner {
    /// Slots quick mode may still ask before answering
    pub const SPEED_MODE_CAP: usize = 3;

    /// Factor applied to the active intent's confidence after a composition
    pub const POST_COMPOSE_DECAY: f32 = 0.5;
}

/// Response composer defaults
pub mod composer {
    /// Schemes shown per category
    pub const MAX_SCHEMES_PER_CATEGORY: usize = 3;

    /// Retrieval score at or above which a record counts as a strong match
    pub const STRONG_MATCH_SCORE: f32 = 0.6;

    /// Retrieval score at or above which a record counts as a fair match
    pub const FAIR_MATCH_SCORE: f32 = 0.3;
}

/// Contradiction policy defaults
pub mod policy {
    pub const BAND_TOLERANCE: u8 = 0;
    pub const START_YEAR_TOLERANCE: u16 = 1;
    pub const AGE_TOLERANCE: u8 = 1;
}

/// Lending thresholds used by the eligibility assessment (INR)
pub mod lending {
    /// Loans up to this amount to micro and small enterprises are collateral-free
    pub const COLLATERAL_FREE_LIMIT_INR: u64 = 10 * 100_000;

    /// Credit guarantee cover ceiling
    pub const GUARANTEE_COVER_LIMIT_INR: u64 = 5 * 10_000_000;

    /// Asks above this from a business started this or last year are flagged
    pub const NEW_BUSINESS_HIGH_LOAN_INR: u64 = 50 * 100_000;

    /// Asks above this multiple of the turnover ceiling are flagged
    pub const LOAN_TO_TURNOVER_MAX_RATIO: u64 = 2;

    /// Turnover above which GST registration is normally expected for goods
    pub const GST_THRESHOLD_GOODS_INR: u64 = 40 * 100_000;
}

/// Server defaults
pub mod endpoints {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;
}

/// Session defaults
pub mod session {
    pub const TTL_SECS: u64 = 3_600;
    pub const MAX_SESSIONS: usize = 10_000;
}

/// Fixed user-facing text
pub mod text {
    pub const SCAM_ALERT: &str = "Important: Government schemes do not require payment to private agents for approval. Be cautious of scams.";

    pub const PROFILE_TITLE: &str = "MSME Profile (As Understood)";

    pub const KEY_DETAILS_TITLE: &str = "Key details used";

    pub const DISCLAIMER: &str = "Scheme details change often. Please verify the final terms with your bank, the DIC or the official scheme portal before applying.";
}
