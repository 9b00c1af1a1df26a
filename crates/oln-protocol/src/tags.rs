//! Textual hashtag extraction.

use std::sync::OnceLock;

use regex::Regex;

fn hashtag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern is valid"))
}

/// Extracts `#word` hashtags from text, case preserved, deduplicated
/// in order of first occurrence.
///
/// `#geo...` hashtags are plain hashtags here; their pluscode meaning
/// is handled by the location extraction separately.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    for m in hashtag_re().find_iter(text) {
        let tag = m.as_str();
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_in_order_of_first_occurrence() {
        let tags = extract_hashtags("Hello #OLN world! #test and #OLN again");
        assert_eq!(tags, vec!["#OLN".to_string(), "#test".to_string()]);
    }

    #[test]
    fn preserves_case() {
        let tags = extract_hashtags("#OLN #oln");
        assert_eq!(tags, vec!["#OLN".to_string(), "#oln".to_string()]);
    }

    #[test]
    fn empty_for_plain_text() {
        assert!(extract_hashtags("no tags here").is_empty());
    }

    #[test]
    fn geo_hashtags_are_plain_tags_here() {
        let tags = extract_hashtags("at #geo6FG22222 now");
        assert_eq!(tags, vec!["#geo6FG22222".to_string()]);
    }
}
