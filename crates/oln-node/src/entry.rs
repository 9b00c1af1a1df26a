//! Cache entries and the priority formula.
//!
//! A [`MessageEntry`] is the cache's annotated record of one message:
//! the wire message plus everything the node computed about it on
//! arrival (proof-of-work bits, extracted plustags, proximity and
//! priority scores, bookkeeping instants).
//!
//! Entries are owned exclusively by the cache. Query APIs hand out
//! clones, never references.

use chrono::{DateTime, Utc};

use oln_types::Message;

/// Messages are no longer forwarded once they have passed through
/// this many nodes.
pub const MAX_HOPS: u32 = 3;

/// TTL in days applied to outbound messages.
pub const DEFAULT_TTL_DAYS: u32 = 7;

/// Score floor every cached message starts from.
const BASE_SCORE: i64 = 100;

/// Bonus for matching the operator's filters.
const FILTER_BONUS: i64 = 1000;

/// Maximum recency contribution (a message with its whole TTL ahead).
const RECENCY_MAX: i64 = 100;

/// Priority per leading zero bit of attached proof-of-work.
const POW_WEIGHT: i64 = 50;

/// Priority lost per hop travelled.
const HOP_PENALTY: i64 = 10;

// ---------------------------------------------------------------------------
// MessageEntry
// ---------------------------------------------------------------------------

/// A message annotated with everything the cache ranks it by.
#[derive(Clone, Debug)]
pub struct MessageEntry {
    /// Content hash — 16 lowercase hex chars, the primary key.
    pub hash: String,
    /// The wire message.
    pub message: Message,
    /// Current rank; recomputed whenever filters change.
    pub priority: i64,
    /// Leading zero bits of SHA-1 over `raw`, or 0 when `raw` is not
    /// a proof-of-work envelope.
    pub pow_bits: u32,
    /// Pluscodes extracted from `raw` at ingest; never re-extracted.
    pub plustags: Vec<String>,
    /// Best proximity against the location filters, 0..=500.
    pub proximity_score: i64,
    /// When this node first saw the message.
    pub first_seen: DateTime<Utc>,
    /// When this node last rebroadcast the message.
    pub last_sent: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Computes a message's priority.
///
/// ```text
/// priority = 100
///          + 1000 if the message matches the operator's filters
///          + proximity_score                   (0..=500)
///          + ⌊100 × (1 − age/ttl)⌋ while age < ttl, else 0
///          + 50 × pow_bits
///          − 10 × hops
/// ```
///
/// Deterministic for a given `now`, so rankings are stable and can be
/// recomputed coherently when filters change.
pub fn priority_score(
    message: &Message,
    is_filter_match: bool,
    proximity_score: i64,
    pow_bits: u32,
    now: DateTime<Utc>,
) -> i64 {
    let mut priority = BASE_SCORE;

    if is_filter_match {
        priority += FILTER_BONUS;
    }

    priority += proximity_score;
    priority += recency_score(message, now);
    priority += POW_WEIGHT * i64::from(pow_bits);
    priority -= HOP_PENALTY * i64::from(message.hops);

    priority
}

/// Remaining-TTL contribution: the fraction of TTL still ahead,
/// scaled to 0..=100 and floored. Zero once the message has expired.
fn recency_score(message: &Message, now: DateTime<Utc>) -> i64 {
    let age_ms = message.age(now).num_milliseconds();
    let ttl_ms = message.ttl().num_milliseconds();

    if ttl_ms <= 0 || age_ms >= ttl_ms {
        return 0;
    }

    (ttl_ms - age_ms) * RECENCY_MAX / ttl_ms
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use oln_types::Origin;

    fn message_at(ts: DateTime<Utc>, hops: u32) -> Message {
        Message {
            raw: "test".to_string(),
            origin: Origin::default(),
            sig: String::new(),
            timestamp: ts,
            ttl_days: 7,
            hops,
            tags: Vec::new(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_unmatched_message_scores_200() {
        // 100 base + 100 full recency, nothing else.
        let msg = message_at(t0(), 0);
        assert_eq!(priority_score(&msg, false, 0, 0, t0()), 200);
    }

    #[test]
    fn filter_match_adds_1000() {
        let msg = message_at(t0(), 0);
        assert_eq!(priority_score(&msg, true, 0, 0, t0()), 1200);
    }

    #[test]
    fn proximity_adds_directly() {
        let msg = message_at(t0(), 0);
        assert_eq!(priority_score(&msg, false, 312, 0, t0()), 512);
    }

    #[test]
    fn pow_bits_weighted_50() {
        let msg = message_at(t0(), 0);
        assert_eq!(priority_score(&msg, false, 0, 8, t0()), 600);
    }

    #[test]
    fn hops_penalised_10_each() {
        let msg = message_at(t0(), 3);
        assert_eq!(priority_score(&msg, false, 0, 0, t0()), 170);
    }

    #[test]
    fn recency_decays_linearly() {
        let msg = message_at(t0(), 0);
        // Half the TTL gone → 50 recency.
        let halfway = t0() + Duration::hours(7 * 12);
        assert_eq!(priority_score(&msg, false, 0, 0, halfway), 150);
    }

    #[test]
    fn expired_message_has_no_recency() {
        let msg = message_at(t0(), 0);
        let late = t0() + Duration::days(8);
        assert_eq!(priority_score(&msg, false, 0, 0, late), 100);
    }

    #[test]
    fn combined_formula() {
        // 100 + 1000 + 312 + 100 + 50×4 − 10×2 = 1692.
        let msg = message_at(t0(), 2);
        assert_eq!(priority_score(&msg, true, 312, 4, t0()), 1692);
    }
}
