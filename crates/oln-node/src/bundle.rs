//! Outbound bundle construction.
//!
//! Every bundle this node emits — fresh publish or rebroadcast —
//! carries exactly one message and an index covering its textual tags
//! plus the full parent hierarchy of every extracted pluscode, so
//! consumers can file the message under any precision level.

use oln_types::{Bundle, Message, ServerInfo};

/// Builds the bundle for a single outbound message.
///
/// `plustags` are the pluscodes extracted from the message's raw text;
/// each is expanded through [`oln_location::parents`] into the index.
/// Index insertion is set-like: a hash is recorded at most once per
/// key even when hierarchy steps coincide.
pub fn message_bundle(
    server: ServerInfo,
    hash: &str,
    message: &Message,
    plustags: &[String],
) -> Bundle {
    let mut bundle = Bundle::empty(server);
    bundle.messages.insert(hash.to_string(), message.clone());

    for tag in &message.tags {
        if tag.starts_with('#') {
            index_insert(&mut bundle, tag, hash);
        }
    }

    for code in plustags {
        for parent in oln_location::parents(code) {
            index_insert(&mut bundle, &parent, hash);
        }
    }

    bundle
}

fn index_insert(bundle: &mut Bundle, key: &str, hash: &str) {
    let hashes = bundle.index.entry(key.to_string()).or_default();
    if !hashes.iter().any(|h| h == hash) {
        hashes.push(hash.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
