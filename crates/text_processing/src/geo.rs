//! Indian states, union territories and major cities
//!
//! Used by the location recognizer to resolve "Pune Maharashtra" into a
//! district and a state, and to infer the state from a well-known city.

use once_cell::sync::Lazy;
use regex::Regex;

const STATES: &[(&str, &[&str])] = &[
    ("Andhra Pradesh", &["andhra pradesh", "andhra"]),
    ("Arunachal Pradesh", &["arunachal pradesh", "arunachal"]),
    ("Assam", &["assam"]),
    ("Bihar", &["bihar"]),
    ("Chhattisgarh", &["chhattisgarh", "chattisgarh"]),
    ("Goa", &["goa"]),
    ("Gujarat", &["gujarat"]),
    ("Haryana", &["haryana"]),
    ("Himachal Pradesh", &["himachal pradesh", "himachal"]),
    ("Jharkhand", &["jharkhand"]),
    ("Karnataka", &["karnataka"]),
    ("Kerala", &["kerala"]),
    ("Madhya Pradesh", &["madhya pradesh"]),
    ("Maharashtra", &["maharashtra"]),
    ("Manipur", &["manipur"]),
    ("Meghalaya", &["meghalaya"]),
    ("Mizoram", &["mizoram"]),
    ("Nagaland", &["nagaland"]),
    ("Odisha", &["odisha", "orissa"]),
    ("Punjab", &["punjab"]),
    ("Rajasthan", &["rajasthan"]),
    ("Sikkim", &["sikkim"]),
    ("Tamil Nadu", &["tamil nadu", "tamilnadu"]),
    ("Telangana", &["telangana"]),
    ("Tripura", &["tripura"]),
    ("Uttar Pradesh", &["uttar pradesh"]),
    ("Uttarakhand", &["uttarakhand", "uttaranchal"]),
    ("West Bengal", &["west bengal", "bengal"]),
    ("Andaman and Nicobar Islands", &["andaman and nicobar", "andaman"]),
    ("Chandigarh", &["chandigarh"]),
    (
        "Dadra and Nagar Haveli and Daman and Diu",
        &["dadra and nagar haveli", "daman and diu", "daman", "silvassa"],
    ),
    ("Delhi", &["delhi", "ncr"]),
    ("Jammu and Kashmir", &["jammu and kashmir", "jammu", "kashmir"]),
    ("Ladakh", &["ladakh"]),
    ("Lakshadweep", &["lakshadweep"]),
    ("Puducherry", &["puducherry", "pondicherry"]),
];

/// (spoken name, district, state)
const CITIES: &[(&str, &str, &str)] = &[
    ("mumbai", "Mumbai", "Maharashtra"),
    ("bombay", "Mumbai", "Maharashtra"),
    ("pune", "Pune", "Maharashtra"),
    ("nagpur", "Nagpur", "Maharashtra"),
    ("nashik", "Nashik", "Maharashtra"),
    ("thane", "Thane", "Maharashtra"),
    ("aurangabad", "Aurangabad", "Maharashtra"),
    ("kolhapur", "Kolhapur", "Maharashtra"),
    ("ahmedabad", "Ahmedabad", "Gujarat"),
    ("surat", "Surat", "Gujarat"),
    ("vadodara", "Vadodara", "Gujarat"),
    ("baroda", "Vadodara", "Gujarat"),
    ("rajkot", "Rajkot", "Gujarat"),
    ("bengaluru", "Bengaluru", "Karnataka"),
    ("bangalore", "Bengaluru", "Karnataka"),
    ("mysuru", "Mysuru", "Karnataka"),
    ("mysore", "Mysuru", "Karnataka"),
    ("hubli", "Hubballi", "Karnataka"),
    ("chennai", "Chennai", "Tamil Nadu"),
    ("coimbatore", "Coimbatore", "Tamil Nadu"),
    ("madurai", "Madurai", "Tamil Nadu"),
    ("tiruppur", "Tiruppur", "Tamil Nadu"),
    ("hyderabad", "Hyderabad", "Telangana"),
    ("warangal", "Warangal", "Telangana"),
    ("kolkata", "Kolkata", "West Bengal"),
    ("calcutta", "Kolkata", "West Bengal"),
    ("howrah", "Howrah", "West Bengal"),
    ("lucknow", "Lucknow", "Uttar Pradesh"),
    ("kanpur", "Kanpur", "Uttar Pradesh"),
    ("noida", "Gautam Buddh Nagar", "Uttar Pradesh"),
    ("ghaziabad", "Ghaziabad", "Uttar Pradesh"),
    ("varanasi", "Varanasi", "Uttar Pradesh"),
    ("agra", "Agra", "Uttar Pradesh"),
    ("meerut", "Meerut", "Uttar Pradesh"),
    ("jaipur", "Jaipur", "Rajasthan"),
    ("jodhpur", "Jodhpur", "Rajasthan"),
    ("udaipur", "Udaipur", "Rajasthan"),
    ("indore", "Indore", "Madhya Pradesh"),
    ("bhopal", "Bhopal", "Madhya Pradesh"),
    ("patna", "Patna", "Bihar"),
    ("ludhiana", "Ludhiana", "Punjab"),
    ("amritsar", "Amritsar", "Punjab"),
    ("jalandhar", "Jalandhar", "Punjab"),
    ("gurugram", "Gurugram", "Haryana"),
    ("gurgaon", "Gurugram", "Haryana"),
    ("faridabad", "Faridabad", "Haryana"),
    ("panipat", "Panipat", "Haryana"),
    ("kochi", "Ernakulam", "Kerala"),
    ("cochin", "Ernakulam", "Kerala"),
    ("thiruvananthapuram", "Thiruvananthapuram", "Kerala"),
    ("bhubaneswar", "Khordha", "Odisha"),
    ("cuttack", "Cuttack", "Odisha"),
    ("guwahati", "Kamrup Metropolitan", "Assam"),
    ("ranchi", "Ranchi", "Jharkhand"),
    ("jamshedpur", "East Singhbhum", "Jharkhand"),
    ("raipur", "Raipur", "Chhattisgarh"),
    ("dehradun", "Dehradun", "Uttarakhand"),
    ("visakhapatnam", "Visakhapatnam", "Andhra Pradesh"),
    ("vizag", "Visakhapatnam", "Andhra Pradesh"),
    ("vijayawada", "NTR", "Andhra Pradesh"),
    ("new delhi", "New Delhi", "Delhi"),
];

fn word_pattern(name: &str) -> Regex {
    let body = name
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    Regex::new(&format!(r"(?i)\b{}\b", body)).unwrap()
}

static STATE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    let mut patterns: Vec<(&str, &'static str)> = STATES
        .iter()
        .flat_map(|(state, aliases)| aliases.iter().map(move |a| (*a, *state)))
        .collect();
    // Longest alias first so "west bengal" wins over "bengal"
    patterns.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));
    patterns
        .into_iter()
        .map(|(alias, state)| (word_pattern(alias), state))
        .collect()
});

static CITY_PATTERNS: Lazy<Vec<(Regex, &'static str, &'static str)>> = Lazy::new(|| {
    let mut cities: Vec<_> = CITIES.to_vec();
    cities.sort_by_key(|(name, _, _)| std::cmp::Reverse(name.len()));
    cities
        .into_iter()
        .map(|(name, district, state)| (word_pattern(name), district, state))
        .collect()
});

/// A state mentioned in `text`, by its official name
pub fn find_state(text: &str) -> Option<&'static str> {
    STATE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map(|(_, state)| *state)
}

/// A known city in `text`, as (district, state)
pub fn find_city(text: &str) -> Option<(&'static str, &'static str)> {
    CITY_PATTERNS
        .iter()
        .find(|(re, _, _)| re.is_match(text))
        .map(|(_, district, state)| (*district, *state))
}

/// Official name of a state, accepting the aliases above
pub fn canonical_state(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_lowercase();
    STATES
        .iter()
        .find(|(state, aliases)| state.to_lowercase() == lower || aliases.iter().any(|a| *a == lower))
        .map(|(state, _)| *state)
}
