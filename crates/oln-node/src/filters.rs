//! Operator filters: hashtags and locations.
//!
//! Matching semantics are deliberately asymmetric and must stay that
//! way: hashtags match by case-insensitive equality against a
//! message's tags, locations match by case-sensitive substring
//! against the raw text. With both sets empty no message matches.

use oln_types::Message;

/// Operator-mutable filter sets. Both lists hold distinct elements in
/// insertion order.
#[derive(Clone, Debug, Default)]
pub struct Filters {
    /// Hashtags to star, matched case-insensitively.
    pub hashtags: Vec<String>,
    /// Pluscode strings to star and score proximity against.
    pub locations: Vec<String>,
}

impl Filters {
    /// Adds a hashtag filter. Returns `false` if an equal (case-
    /// insensitive) tag was already present.
    pub fn add_hashtag(&mut self, tag: &str) -> bool {
        if self.hashtags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return false;
        }
        self.hashtags.push(tag.to_string());
        true
    }

    /// Removes a hashtag filter (case-insensitive). Returns whether
    /// anything was removed.
    pub fn remove_hashtag(&mut self, tag: &str) -> bool {
        let before = self.hashtags.len();
        self.hashtags.retain(|t| !t.eq_ignore_ascii_case(tag));
        self.hashtags.len() != before
    }

    /// Adds a location filter. Returns `false` if already present.
    pub fn add_location(&mut self, code: &str) -> bool {
        if self.locations.iter().any(|c| c == code) {
            return false;
        }
        self.locations.push(code.to_string());
        true
    }

    /// Removes a location filter (exact match). Returns whether
    /// anything was removed.
    pub fn remove_location(&mut self, code: &str) -> bool {
        let before = self.locations.len();
        self.locations.retain(|c| c != code);
        self.locations.len() != before
    }

    /// Drops every filter.
    pub fn clear(&mut self) {
        self.hashtags.clear();
        self.locations.clear();
    }

    /// Whether no filters are set at all.
    pub fn is_empty(&self) -> bool {
        self.hashtags.is_empty() && self.locations.is_empty()
    }

    /// The filter match predicate.
    ///
    /// True iff any filter hashtag equals (case-insensitively) one of
    /// the message's tags, or any filter location occurs as a
    /// substring of the raw text. False when both sets are empty.
    pub fn matches(&self, message: &Message) -> bool {
        if self.is_empty() {
            return false;
        }

        for filter_tag in &self.hashtags {
            if message
                .tags
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(filter_tag))
            {
                return true;
            }
        }

        self.locations
            .iter()
            .any(|loc| message.raw.contains(loc.as_str()))
    }

    /// Best proximity of any message plustag against any filter
    /// location, 0..=500. Zero when either side is empty or no pair
    /// of codes shares a prefix.
    pub fn proximity_for(&self, plustags: &[String]) -> i64 {
        if self.locations.is_empty() || plustags.is_empty() {
            return 0;
        }

        let mut best = 0;
        for msg_loc in plustags {
            for user_loc in &self.locations {
                let score = oln_location::proximity(msg_loc, user_loc);
                if score > best {
                    best = score;
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use oln_types::Origin;

    fn message_with(raw: &str, tags: &[&str]) -> Message {
        Message {
            raw: raw.to_string(),
            origin: Origin::default(),
            sig: String::new(),
            timestamp: Utc::now(),
            ttl_days: 7,
            hops: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn empty_filters_match_nothing() {
        let filters = Filters::default();
        let msg = message_with("anything #oln 6FG22222+", &["#oln"]);
        assert!(!filters.matches(&msg));
    }

    #[test]
    fn hashtag_match_is_case_insensitive() {
        let mut filters = Filters::default();
        filters.add_hashtag("#OLN");
        let msg = message_with("hi", &["#oln"]);
        assert!(filters.matches(&msg));
    }

    #[test]
    fn location_match_is_case_sensitive_substring() {
        let mut filters = Filters::default();
        filters.add_location("6FG22222+");

        let hit = message_with("meet at 6FG22222+22", &[]);
        assert!(filters.matches(&hit));

        // Lowercased text no longer contains the filter string.
        let miss = message_with("meet at 6fg22222+22", &[]);
        assert!(!filters.matches(&miss));
    }

    #[test]
    fn add_deduplicates_case_insensitively() {
        let mut filters = Filters::default();
        assert!(filters.add_hashtag("#oln"));
        assert!(!filters.add_hashtag("#OLN"));
        assert_eq!(filters.hashtags, vec!["#oln".to_string()]);
    }

    #[test]
    fn remove_and_clear() {
        let mut filters = Filters::default();
        filters.add_hashtag("#a");
        filters.add_location("6FG22222+");

        assert!(filters.remove_hashtag("#A"));
        assert!(!filters.remove_hashtag("#A"));
        assert!(filters.remove_location("6FG22222+"));
        assert!(filters.is_empty());

        filters.add_hashtag("#b");
        filters.clear();
        assert!(filters.is_empty());
    }

    #[test]
    fn proximity_takes_best_pair() {
        let mut filters = Filters::default();
        filters.add_location("6FG22222+");
        filters.add_location("8CW33333+");

        let plustags = vec!["6FG22299+".to_string(), "XXXXXXXX+".to_string()];
        // Best pair shares 6 characters → 375.
        assert_eq!(filters.proximity_for(&plustags), 375);
    }

    #[test]
    fn proximity_zero_without_locations_or_plustags() {
        let mut filters = Filters::default();
        assert_eq!(filters.proximity_for(&["6FG22222+".to_string()]), 0);

        filters.add_location("6FG22222+");
        assert_eq!(filters.proximity_for(&[]), 0);
    }

    #[test]
    fn invalid_filter_location_scores_zero_but_still_substring_matches() {
        let mut filters = Filters::default();
        filters.add_location("not-a-pluscode");

        let msg = message_with("contains not-a-pluscode inside", &[]);
        assert!(filters.matches(&msg));
        assert_eq!(filters.proximity_for(&["6FG22222+".to_string()]), 0);
    }
}
