//! The prioritised message cache.
//!
//! A [`MessageCache`] owns every cached entry together with the
//! operator's filters, behind a single readers–writer lock. One lock
//! for both halves keeps scoring coherent: a filter mutation and the
//! rescore it triggers are a single write section, so no query ever
//! observes new filters with stale priorities.
//!
//! Writers: ingest (with overflow eviction), the TTL sweep, filter
//! mutation, and the rebroadcast commit. Readers: every operator
//! query. The lock is never held across I/O — the rebroadcast path
//! collects candidate hashes under the read lock, commits hop/
//! last-sent mutations under the write lock, and leaves publishing
//! to the caller.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use oln_types::Message;

use crate::entry::{priority_score, MessageEntry, MAX_HOPS};
use crate::filters::Filters;

// ---------------------------------------------------------------------------
// Snapshots and reports
// ---------------------------------------------------------------------------

/// A cloned entry handed to the operator surface, with its star state
/// against the filters that were current at snapshot time.
#[derive(Clone, Debug)]
pub struct EntrySnapshot {
    /// Copy of the cached entry.
    pub entry: MessageEntry,
    /// Whether the entry matches the current filters.
    pub starred: bool,
}

/// Outcome of ingesting one inbound message.
#[derive(Clone, Debug)]
pub struct IngestReport {
    /// Snapshot of the freshly inserted entry.
    pub snapshot: EntrySnapshot,
    /// Hash evicted to make room, if the insert overflowed the cache.
    /// May equal the inserted hash when the newcomer ranked lowest.
    pub evicted: Option<String>,
}

/// A message cleared for rebroadcast, with its hop count already
/// incremented.
#[derive(Clone, Debug)]
pub struct RebroadcastItem {
    /// Content hash of the message.
    pub hash: String,
    /// The message as it should go out (hops incremented).
    pub message: Message,
    /// Stored plustags, for index hierarchy construction.
    pub plustags: Vec<String>,
}

/// Aggregate statistics for the `!stats` command.
#[derive(Clone, Debug)]
pub struct CacheStats {
    /// Number of cached entries.
    pub size: usize,
    /// Configured cache bound.
    pub max_size: usize,
    /// Current hashtag filters.
    pub hashtag_filters: Vec<String>,
    /// Current location filters.
    pub location_filters: Vec<String>,
    /// Mean message age in seconds, if the cache is non-empty.
    pub mean_age_secs: Option<i64>,
    /// Lowest priority present, if the cache is non-empty.
    pub min_priority: Option<i64>,
    /// Highest priority present, if the cache is non-empty.
    pub max_priority: Option<i64>,
}

/// Search modes for the `!search` command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchMode {
    /// Case-insensitive substring over raw text, tags, and plustags.
    Any,
    /// Exact case-insensitive tag match.
    Tag,
    /// Positive proximity of the query code against any plustag.
    Location,
    /// Case-insensitive substring over raw text only.
    Text,
}

// ---------------------------------------------------------------------------
// MessageCache
// ---------------------------------------------------------------------------

/// Entries plus filters under one lock.
struct CacheInner {
    entries: HashMap<String, MessageEntry>,
    filters: Filters,
}

/// The concurrent prioritised store at the centre of the node.
pub struct MessageCache {
    inner: RwLock<CacheInner>,
    max_size: usize,
}

impl MessageCache {
    /// Creates a cache bounded at `max_size` entries, with the given
    /// initial filters.
    pub fn new(max_size: usize, filters: Filters) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                filters,
            }),
            max_size,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CacheInner> {
        // A poisoned lock means a panic mid-write; propagating the
        // panic here is the only sound option for an in-memory store.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // -----------------------------------------------------------------------
    // Ingest
    // -----------------------------------------------------------------------

    /// Ingests one `(hash, message)` pair from an inbound bundle.
    ///
    /// Returns `None` when the hash is already cached (idempotent:
    /// echoes of our own publishes and gossip duplicates are no-ops).
    /// Otherwise annotates, scores, inserts, and — if the cache
    /// overflowed — evicts one minimum-priority entry.
    pub fn ingest(&self, hash: &str, message: Message, now: DateTime<Utc>) -> Option<IngestReport> {
        let mut inner = self.write();

        if inner.entries.contains_key(hash) {
            return None;
        }

        let pow_bits = oln_protocol::pow::validate(&message.raw);
        let plustags = oln_location::all_plustags(&message.raw);
        let proximity_score = inner.filters.proximity_for(&plustags);
        let starred = inner.filters.matches(&message);
        let priority = priority_score(&message, starred, proximity_score, pow_bits, now);

        let entry = MessageEntry {
            hash: hash.to_string(),
            message,
            priority,
            pow_bits,
            plustags,
            proximity_score,
            first_seen: now,
            last_sent: now,
        };

        let snapshot = EntrySnapshot {
            entry: entry.clone(),
            starred,
        };

        inner.entries.insert(hash.to_string(), entry);

        let evicted = if inner.entries.len() > self.max_size {
            evict_lowest(&mut inner)
        } else {
            None
        };

        Some(IngestReport { snapshot, evicted })
    }

    // -----------------------------------------------------------------------
    // Expiry
    // -----------------------------------------------------------------------

    /// Removes every entry whose message has outlived its TTL.
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.write();
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.message.is_expired(now));
        before - inner.entries.len()
    }

    // -----------------------------------------------------------------------
    // Rebroadcast
    // -----------------------------------------------------------------------

    /// Collects the hashes eligible for rebroadcast: under the hop
    /// limit, unexpired, and with at least half their TTL remaining.
    pub fn collect_rebroadcast(&self, now: DateTime<Utc>) -> Vec<String> {
        let inner = self.read();
        inner
            .entries
            .values()
            .filter(|entry| rebroadcast_eligible(entry, now))
            .map(|entry| entry.hash.clone())
            .collect()
    }

    /// Commits a rebroadcast: re-checks eligibility for each hash,
    /// increments hops, refreshes `last_sent`, and returns the
    /// messages to publish. Hashes that became ineligible between
    /// collect and commit are skipped.
    pub fn commit_rebroadcast(
        &self,
        hashes: &[String],
        now: DateTime<Utc>,
    ) -> Vec<RebroadcastItem> {
        let mut inner = self.write();
        let mut items = Vec::with_capacity(hashes.len());

        for hash in hashes {
            let Some(entry) = inner.entries.get_mut(hash) else {
                continue;
            };
            if !rebroadcast_eligible(entry, now) {
                continue;
            }

            entry.message.hops += 1;
            entry.last_sent = now;

            items.push(RebroadcastItem {
                hash: hash.clone(),
                message: entry.message.clone(),
                plustags: entry.plustags.clone(),
            });
        }

        items
    }

    // -----------------------------------------------------------------------
    // Filter mutation
    // -----------------------------------------------------------------------

    /// Adds a hashtag filter and rescores every entry.
    pub fn add_filter_hashtag(&self, tag: &str, now: DateTime<Utc>) -> bool {
        self.mutate_filters(now, |filters| filters.add_hashtag(tag))
    }

    /// Removes a hashtag filter and rescores every entry.
    pub fn remove_filter_hashtag(&self, tag: &str, now: DateTime<Utc>) -> bool {
        self.mutate_filters(now, |filters| filters.remove_hashtag(tag))
    }

    /// Adds a location filter and rescores every entry.
    pub fn add_filter_location(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.mutate_filters(now, |filters| filters.add_location(code))
    }

    /// Removes a location filter and rescores every entry.
    pub fn remove_filter_location(&self, code: &str, now: DateTime<Utc>) -> bool {
        self.mutate_filters(now, |filters| filters.remove_location(code))
    }

    /// Clears all filters and rescores every entry.
    pub fn clear_filters(&self, now: DateTime<Utc>) {
        self.mutate_filters(now, |filters| {
            filters.clear();
            true
        });
    }

    /// Clears only the hashtag filters and rescores every entry.
    pub fn clear_filter_hashtags(&self, now: DateTime<Utc>) -> bool {
        self.mutate_filters(now, |filters| {
            let had = !filters.hashtags.is_empty();
            filters.hashtags.clear();
            had
        })
    }

    /// Clears only the location filters and rescores every entry.
    pub fn clear_filter_locations(&self, now: DateTime<Utc>) -> bool {
        self.mutate_filters(now, |filters| {
            let had = !filters.locations.is_empty();
            filters.locations.clear();
            had
        })
    }

    /// Snapshot of the current filters.
    pub fn filters(&self) -> Filters {
        self.read().filters.clone()
    }

    /// Applies a filter mutation and, if it changed anything, rescores
    /// all entries from their stored plustags within the same write
    /// section. Entries are never evicted here — only re-ranked.
    fn mutate_filters<F>(&self, now: DateTime<Utc>, mutation: F) -> bool
    where
        F: FnOnce(&mut Filters) -> bool,
    {
        let mut inner = self.write();
        let changed = mutation(&mut inner.filters);
        if changed {
            rescore(&mut inner, now);
        }
        changed
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// All entries ranked by priority descending, truncated to `limit`
    /// if given.
    pub fn list(&self, limit: Option<usize>) -> Vec<EntrySnapshot> {
        let inner = self.read();
        let mut snapshots = snapshot_all(&inner);
        sort_by_priority(&mut snapshots);
        if let Some(n) = limit {
            snapshots.truncate(n);
        }
        snapshots
    }

    /// Searches the cache; results ranked by priority descending.
    pub fn search(&self, mode: SearchMode, query: &str) -> Vec<EntrySnapshot> {
        let inner = self.read();
        let needle = query.to_lowercase();

        let mut snapshots: Vec<EntrySnapshot> = inner
            .entries
            .values()
            .filter(|entry| search_matches(entry, mode, query, &needle))
            .map(|entry| EntrySnapshot {
                entry: entry.clone(),
                starred: inner.filters.matches(&entry.message),
            })
            .collect();

        sort_by_priority(&mut snapshots);
        snapshots
    }

    /// Entries whose hash starts with `prefix`, ranked by priority.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<EntrySnapshot> {
        let inner = self.read();
        let mut snapshots: Vec<EntrySnapshot> = inner
            .entries
            .values()
            .filter(|entry| entry.hash.starts_with(prefix))
            .map(|entry| EntrySnapshot {
                entry: entry.clone(),
                starred: inner.filters.matches(&entry.message),
            })
            .collect();
        sort_by_priority(&mut snapshots);
        snapshots
    }

    /// Aggregate statistics.
    pub fn stats(&self, now: DateTime<Utc>) -> CacheStats {
        let inner = self.read();

        let size = inner.entries.len();
        let mean_age_secs = if size > 0 {
            let total: i64 = inner
                .entries
                .values()
                .map(|e| e.message.age(now).num_seconds())
                .sum();
            Some(total / size as i64)
        } else {
            None
        };

        CacheStats {
            size,
            max_size: self.max_size,
            hashtag_filters: inner.filters.hashtags.clone(),
            location_filters: inner.filters.locations.clone(),
            mean_age_secs,
            min_priority: inner.entries.values().map(|e| e.priority).min(),
            max_priority: inner.entries.values().map(|e| e.priority).max(),
        }
    }

    /// Empties the cache, leaving filters untouched. Returns the
    /// number of entries dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.write();
        let n = inner.entries.len();
        inner.entries.clear();
        n
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a hash is currently cached.
    pub fn contains(&self, hash: &str) -> bool {
        self.read().entries.contains_key(hash)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Removes one minimum-priority entry. Ties are broken by map
/// iteration order; the contract is only that *some* minimum goes.
fn evict_lowest(inner: &mut CacheInner) -> Option<String> {
    let lowest = inner
        .entries
        .values()
        .min_by_key(|entry| entry.priority)
        .map(|entry| entry.hash.clone())?;
    inner.entries.remove(&lowest);
    Some(lowest)
}

/// Recomputes proximity and priority for every entry against the
/// current filters, using stored plustags.
fn rescore(inner: &mut CacheInner, now: DateTime<Utc>) {
    let filters = inner.filters.clone();
    for entry in inner.entries.values_mut() {
        entry.proximity_score = filters.proximity_for(&entry.plustags);
        let starred = filters.matches(&entry.message);
        entry.priority = priority_score(
            &entry.message,
            starred,
            entry.proximity_score,
            entry.pow_bits,
            now,
        );
    }
}

fn rebroadcast_eligible(entry: &MessageEntry, now: DateTime<Utc>) -> bool {
    let message = &entry.message;
    if message.hops >= MAX_HOPS {
        return false;
    }

    let age = message.age(now);
    let ttl = message.ttl();
    if age > ttl {
        return false;
    }

    // Suppress late-life rebroadcasts to reduce stale chatter.
    age <= ttl / 2
}

fn snapshot_all(inner: &CacheInner) -> Vec<EntrySnapshot> {
    inner
        .entries
        .values()
        .map(|entry| EntrySnapshot {
            entry: entry.clone(),
            starred: inner.filters.matches(&entry.message),
        })
        .collect()
}

fn sort_by_priority(snapshots: &mut [EntrySnapshot]) {
    snapshots.sort_by(|a, b| {
        b.entry
            .priority
            .cmp(&a.entry.priority)
            .then_with(|| a.entry.hash.cmp(&b.entry.hash))
    });
}

fn search_matches(entry: &MessageEntry, mode: SearchMode, query: &str, needle: &str) -> bool {
    match mode {
        SearchMode::Any => {
            entry.message.raw.to_lowercase().contains(needle)
                || entry
                    .message
                    .tags
                    .iter()
                    .any(|t| t.to_lowercase().contains(needle))
                || entry
                    .plustags
                    .iter()
                    .any(|t| t.to_lowercase().contains(needle))
        }
        SearchMode::Tag => entry
            .message
            .tags
            .iter()
            .any(|t| t.eq_ignore_ascii_case(query)),
        SearchMode::Location => entry
            .plustags
            .iter()
            .any(|t| oln_location::proximity(t, query) > 0),
        SearchMode::Text => entry.message.raw.to_lowercase().contains(needle),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use oln_types::Origin;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn message(raw: &str, tags: &[&str], ts: DateTime<Utc>) -> Message {
        Message {
            raw: raw.to_string(),
            origin: Origin {
                display: "anonymous".to_string(),
                ..Origin::default()
            },
            sig: String::new(),
            timestamp: ts,
            ttl_days: 7,
            hops: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn ingest(cache: &MessageCache, hash: &str, msg: Message) -> IngestReport {
        cache
            .ingest(hash, msg, t0())
            .expect("first ingest should insert")
    }

    #[test]
    fn ingest_is_idempotent() {
        let cache = MessageCache::new(10, Filters::default());
        let msg = message("hello", &[], t0());

        assert!(cache.ingest("aaaa", msg.clone(), t0()).is_some());
        assert!(cache.ingest("aaaa", msg, t0()).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn ingest_annotates_pow_and_plustags() -> oln_types::Result<()> {
        let cache = MessageCache::new(10, Filters::default());
        let envelope = oln_protocol::pow::encode(4, "oln", "at 6FG22222+22")?;
        let msg = message(&envelope, &[], t0());

        let report = ingest(&cache, "bbbb", msg);
        assert!(report.snapshot.entry.pow_bits >= 4);
        // The pluscode is inside the base64 payload, not the envelope
        // text, so no plustags are extracted from this raw.
        assert!(report.snapshot.entry.plustags.is_empty());

        // A plain message carries its pluscode in the clear.
        let plain = message("at 6FG22222+22", &[], t0());
        let report = ingest(&cache, "cccc", plain);
        assert_eq!(report.snapshot.entry.pow_bits, 0);
        assert_eq!(report.snapshot.entry.plustags, vec!["6FG22222+22".to_string()]);
        Ok(())
    }

    #[test]
    fn filter_match_scores_1200_and_ranks_first() {
        let mut filters = Filters::default();
        filters.add_hashtag("#oln");
        let cache = MessageCache::new(10, filters);

        let a = message("on topic #oln", &["#oln"], t0());
        let b = message("off topic #other", &["#other"], t0());

        let ra = ingest(&cache, "aaaa", a);
        let rb = ingest(&cache, "bbbb", b);

        assert_eq!(ra.snapshot.entry.priority, 1200);
        assert!(ra.snapshot.starred);
        assert_eq!(rb.snapshot.entry.priority, 200);
        assert!(!rb.snapshot.starred);

        let listed = cache.list(None);
        assert_eq!(listed[0].entry.hash, "aaaa");
        assert_eq!(listed[1].entry.hash, "bbbb");
    }

    #[test]
    fn overflow_evicts_a_minimum_priority_entry() {
        let mut filters = Filters::default();
        filters.add_hashtag("#oln");
        let cache = MessageCache::new(2, filters);

        // A: 1200 (match), B: 180 (two hops), C: 200.
        ingest(&cache, "aaaa", message("#oln", &["#oln"], t0()));
        let mut b = message("#other", &["#other"], t0());
        b.hops = 2;
        ingest(&cache, "bbbb", b);
        let report = ingest(&cache, "cccc", message("plain", &[], t0()));

        assert_eq!(report.evicted.as_deref(), Some("bbbb"));
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("aaaa"));
        assert!(cache.contains("cccc"));
        assert!(!cache.contains("bbbb"));
    }

    #[test]
    fn cache_never_exceeds_bound() {
        let cache = MessageCache::new(3, Filters::default());
        for i in 0..20 {
            let msg = message(&format!("msg {i}"), &[], t0());
            cache.ingest(&format!("h{i:04}"), msg, t0());
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn sweep_removes_only_expired() {
        let cache = MessageCache::new(10, Filters::default());

        let mut stale = message("old", &[], t0() - Duration::hours(25));
        stale.ttl_days = 1;
        ingest(&cache, "aaaa", stale);
        ingest(&cache, "bbbb", message("fresh", &[], t0()));

        assert_eq!(cache.sweep_expired(t0()), 1);
        assert!(!cache.contains("aaaa"));
        assert!(cache.contains("bbbb"));
    }

    #[test]
    fn rebroadcast_gating_by_hops_and_age() {
        let cache = MessageCache::new(10, Filters::default());

        // Eligible: hops 2, age 0.3 × TTL.
        let mut young = message("young", &[], t0() - Duration::hours(50));
        young.hops = 2;
        ingest(&cache, "aaaa", young);

        // Ineligible: past half TTL (0.6 × 7 days ≈ 100h).
        let old = message("old", &[], t0() - Duration::hours(100));
        ingest(&cache, "bbbb", old);

        // Ineligible: at the hop limit.
        let mut travelled = message("travelled", &[], t0());
        travelled.hops = MAX_HOPS;
        ingest(&cache, "cccc", travelled);

        let hashes = cache.collect_rebroadcast(t0());
        assert_eq!(hashes, vec!["aaaa".to_string()]);

        let items = cache.commit_rebroadcast(&hashes, t0());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message.hops, 3);

        // Hop limit reached: no further rebroadcasts.
        assert!(cache.collect_rebroadcast(t0()).is_empty());
    }

    #[test]
    fn commit_skips_hashes_gone_ineligible() {
        let cache = MessageCache::new(10, Filters::default());
        ingest(&cache, "aaaa", message("hi", &[], t0()));

        let hashes = cache.collect_rebroadcast(t0());
        cache.clear();
        assert!(cache.commit_rebroadcast(&hashes, t0()).is_empty());
    }

    #[test]
    fn filter_change_rescores_from_stored_plustags() {
        let cache = MessageCache::new(10, Filters::default());
        let report = ingest(&cache, "aaaa", message("at 6FG22222+22", &[], t0()));
        assert_eq!(report.snapshot.entry.proximity_score, 0);

        cache.add_filter_location("6FG22299+", t0());
        let listed = cache.list(None);
        // 6 shared prefix chars → 375; the raw text contains no
        // filter substring, so no star, but proximity counts.
        assert_eq!(listed[0].entry.proximity_score, 375);
        assert_eq!(listed[0].entry.priority, 100 + 375 + 100);

        cache.clear_filters(t0());
        let listed = cache.list(None);
        assert_eq!(listed[0].entry.proximity_score, 0);
        assert_eq!(listed[0].entry.priority, 200);
        assert!(!listed[0].starred);
    }

    #[test]
    fn filter_change_never_evicts() {
        let cache = MessageCache::new(2, Filters::default());
        ingest(&cache, "aaaa", message("one", &[], t0()));
        ingest(&cache, "bbbb", message("two", &[], t0()));

        cache.add_filter_hashtag("#whatever", t0());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn search_modes() {
        let cache = MessageCache::new(10, Filters::default());
        ingest(&cache, "aaaa", message("pizza night #Food", &["#Food"], t0()));
        ingest(&cache, "bbbb", message("at 6FG22222+22 now", &[], t0()));

        // Default: substring across text, tags, plustags.
        assert_eq!(cache.search(SearchMode::Any, "food").len(), 1);
        assert_eq!(cache.search(SearchMode::Any, "6fg22222").len(), 1);

        // Tag: exact case-insensitive.
        assert_eq!(cache.search(SearchMode::Tag, "#food").len(), 1);
        assert!(cache.search(SearchMode::Tag, "#foo").is_empty());

        // Location: any positive proximity.
        assert_eq!(cache.search(SearchMode::Location, "6FG22299+").len(), 1);
        assert!(cache.search(SearchMode::Location, "XCXCXCXC+").is_empty());

        // Text: substring in raw only.
        assert_eq!(cache.search(SearchMode::Text, "pizza").len(), 1);
        assert!(cache.search(SearchMode::Text, "#food2").is_empty());
    }

    #[test]
    fn find_by_prefix() {
        let cache = MessageCache::new(10, Filters::default());
        ingest(&cache, "abc123", message("one", &[], t0()));
        ingest(&cache, "abd456", message("two", &[], t0()));

        assert_eq!(cache.find_by_prefix("ab").len(), 2);
        assert_eq!(cache.find_by_prefix("abc").len(), 1);
        assert!(cache.find_by_prefix("zz").is_empty());
    }

    #[test]
    fn stats_report() {
        let mut filters = Filters::default();
        filters.add_hashtag("#oln");
        let cache = MessageCache::new(5, filters);

        let stats = cache.stats(t0());
        assert_eq!(stats.size, 0);
        assert!(stats.mean_age_secs.is_none());
        assert!(stats.min_priority.is_none());

        ingest(&cache, "aaaa", message("#oln", &["#oln"], t0()));
        ingest(&cache, "bbbb", message("plain", &[], t0() - Duration::hours(2)));

        let stats = cache.stats(t0());
        assert_eq!(stats.size, 2);
        assert_eq!(stats.max_size, 5);
        assert_eq!(stats.hashtag_filters, vec!["#oln".to_string()]);
        assert_eq!(stats.mean_age_secs, Some(3600));
        assert_eq!(stats.max_priority, Some(1200));
        assert!(stats.min_priority < stats.max_priority);
    }

    #[test]
    fn clear_empties_entries_but_keeps_filters() {
        let mut filters = Filters::default();
        filters.add_hashtag("#keep");
        let cache = MessageCache::new(10, filters);
        ingest(&cache, "aaaa", message("hi", &[], t0()));

        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.filters().hashtags, vec!["#keep".to_string()]);
    }

    #[test]
    fn proximity_bounds_invariant() {
        let mut filters = Filters::default();
        filters.add_location("6FG22222+");
        let cache = MessageCache::new(10, filters);

        for (i, raw) in ["6FG22222+ here", "8CW33333+ there", "no code"]
            .iter()
            .enumerate()
        {
            let report = ingest(&cache, &format!("h{i:04}"), message(raw, &[], t0()));
            let p = report.snapshot.entry.proximity_score;
            assert!((0..=500).contains(&p), "proximity {p} out of bounds");
        }
    }
}
