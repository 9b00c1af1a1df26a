//! Pluscode (Open Location Code) utilities.
//!
//! A pluscode is a string `PPPPPPPP+SS` over the base-20 alphabet
//! [`BASE20`]: an 8-character prefix, a `+` separator, and a 0–2
//! character suffix. The character `0` is a *padding* marker, not a
//! base-20 digit — it stands for dropped precision toward a coarser
//! block (`6FG22200+` covers everything under `6FG222`).
//!
//! The cache uses these functions for two things:
//!
//! - **Indexing** — [`parents`] expands a code into the prefix
//!   hierarchy so a message tagged with a fine code is discoverable
//!   under every coarser block up to the whole world (`00000000+`).
//! - **Scoring** — [`proximity`] turns the shared prefix length of
//!   two codes into a 0..=500 score.
//!
//! Invalid inputs return empty results or zero; nothing in this
//! module fails loudly.

use std::sync::OnceLock;

use regex::Regex;

/// Base-20 charset used in pluscodes.
pub const BASE20: &str = "23456789CFGHJMPQRVWX";

/// Maximum proximity score (identical 8-character prefixes).
pub const MAX_PROXIMITY: i64 = 500;

/// Fixed length of a pluscode prefix.
const PREFIX_LEN: usize = 8;

fn direct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[23456789CFGHJMPQRVWX]{8}\+[23456789CFGHJMPQRVWX]{0,2}")
            .expect("direct pluscode pattern is valid")
    })
}

fn geo_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"#geo([23456789CFGHJMPQRVWX]{8})")
            .expect("geo hashtag pattern is valid")
    })
}

/// Whether `c` is a base-20 digit or the `0` padding marker.
fn is_code_char(c: char) -> bool {
    c == '0' || BASE20.contains(c)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks whether a string is a well-formed pluscode.
///
/// Exactly one `+`; prefix of exactly 8 characters; suffix of at most
/// 2 characters; every non-`0` character drawn from [`BASE20`]. The
/// padding marker `0` is accepted in either half.
pub fn validate(code: &str) -> bool {
    let code = code.trim();

    let mut parts = code.split('+');
    let (prefix, suffix) = match (parts.next(), parts.next(), parts.next()) {
        (Some(p), Some(s), None) => (p, s),
        _ => return false,
    };

    if prefix.chars().count() != PREFIX_LEN || suffix.chars().count() > 2 {
        return false;
    }

    prefix.chars().chain(suffix.chars()).all(is_code_char)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Finds all pluscodes written directly in free text.
///
/// Scans for maximal `XXXXXXXX+SS` runs, re-validates each match, and
/// deduplicates preserving first occurrence.
pub fn extract_direct(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    for m in direct_re().find_iter(text) {
        let code = m.as_str();
        if validate(code) && !result.iter().any(|c| c == code) {
            result.push(code.to_string());
        }
    }
    result
}

/// Converts `#geoXXXXXXXX` hashtags into pluscodes.
///
/// `#geo6FG22222` becomes `6FG22222+`. Deduplicated, first occurrence
/// preserved.
pub fn extract_geo(text: &str) -> Vec<String> {
    let mut result = Vec::new();
    for caps in geo_re().captures_iter(text) {
        if let Some(prefix) = caps.get(1) {
            let code = format!("{}+", prefix.as_str());
            if !result.iter().any(|c| c == &code) {
                result.push(code);
            }
        }
    }
    result
}

/// Extracts every plustag from text: direct pluscodes first, then
/// codes derived from `#geo` hashtags, deduplicated.
pub fn all_plustags(text: &str) -> Vec<String> {
    let mut result = extract_direct(text);
    for code in extract_geo(text) {
        if !result.contains(&code) {
            result.push(code);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Produces the ordered prefix hierarchy used for indexing.
///
/// The first element is always the code itself and the last is the
/// whole-world code `00000000+`. Intermediate steps drop the suffix,
/// then pad the prefix two characters at a time. A step may coincide
/// with an earlier one; index insertion is set-like, so duplicates
/// are harmless.
///
/// Returns an empty vector for invalid input.
pub fn parents(code: &str) -> Vec<String> {
    if !validate(code) {
        return Vec::new();
    }

    let code = code.trim();
    let (prefix, suffix) = match code.split_once('+') {
        Some(pair) => pair,
        None => return Vec::new(),
    };

    let mut result = vec![code.to_string()];

    if !suffix.is_empty() {
        result.push(format!("{prefix}+"));
    }

    if suffix.len() == 2 {
        result.push(format!("{prefix}+{}", &suffix[..1]));
    }

    // Pad the prefix two characters (one pair) at a time.
    result.push(format!("{}00+", &prefix[..6]));
    result.push(format!("{}0000+", &prefix[..4]));
    result.push(format!("{}000000+", &prefix[..2]));
    result.push("00000000+".to_string());

    result
}

// ---------------------------------------------------------------------------
// Proximity
// ---------------------------------------------------------------------------

/// Scores how close two pluscodes are, 0..=[`MAX_PROXIMITY`].
///
/// Counts the shared character prefix `k` of the two 8-character
/// prefixes and returns `⌊k × 500 / 8⌋`. Either code being invalid
/// yields 0.
pub fn proximity(a: &str, b: &str) -> i64 {
    if !validate(a) || !validate(b) {
        return 0;
    }

    let prefix_a = a.trim().split('+').next().unwrap_or("");
    let prefix_b = b.trim().split('+').next().unwrap_or("");

    let matching = prefix_a
        .bytes()
        .zip(prefix_b.bytes())
        .take_while(|(x, y)| x == y)
        .count() as i64;

    matching * MAX_PROXIMITY / PREFIX_LEN as i64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
