//! Outbound message composition.
//!
//! Turns operator text into a wire-ready `(hash, message, bundle)`
//! triple: optional proof-of-work wrapping, hashtag and plustag
//! extraction, hashing, and bundle construction.
//!
//! Composition is synchronous and CPU-bound when PoW is requested;
//! the engine runs it under `tokio::task::spawn_blocking`.

use chrono::{DateTime, Utc};

use oln_protocol::hash::content_hash;
use oln_protocol::tags::extract_hashtags;
use oln_protocol::pow;
use oln_types::{Bundle, Message, Origin, Result, ServerInfo};

use crate::bundle::message_bundle;
use crate::entry::DEFAULT_TTL_DAYS;

/// Keyword stamped into every PoW envelope this node mines.
pub const POW_KEYWORD: &str = "oln";

/// A composed outbound message, ready to publish.
#[derive(Clone, Debug)]
pub struct Outbound {
    /// Content hash of the final raw text.
    pub hash: String,
    /// The message as it will appear on the wire.
    pub message: Message,
    /// Pluscodes extracted from the final raw text.
    pub plustags: Vec<String>,
    /// The single-message bundle to publish.
    pub bundle: Bundle,
}

/// Composes an outbound message from operator text.
///
/// If `pow_bits > 0` the text is replaced by a mined PoW envelope
/// before anything else happens — tags and plustags are extracted
/// from the final raw text, so work-wrapped messages carry the tags
/// visible in the envelope, not in the hidden payload.
///
/// Textual hashtags come first in `tags`, followed by plustags.
///
/// # Errors
///
/// Returns [`oln_types::OlnError::Input`] if PoW mining fails
/// (excessive bits or exhausted search).
pub fn compose(
    server: ServerInfo,
    text: &str,
    pow_bits: u32,
    now: DateTime<Utc>,
) -> Result<Outbound> {
    let raw = if pow_bits > 0 {
        pow::encode(pow_bits, POW_KEYWORD, text)?
    } else {
        text.to_string()
    };

    let mut tags = extract_hashtags(&raw);
    let plustags = oln_location::all_plustags(&raw);
    for code in &plustags {
        if !tags.contains(code) {
            tags.push(code.clone());
        }
    }

    let message = Message {
        raw: raw.clone(),
        origin: Origin {
            display: "anonymous".to_string(),
            pubkey: String::new(),
            servername: String::new(),
        },
        sig: String::new(),
        timestamp: now,
        ttl_days: DEFAULT_TTL_DAYS,
        hops: 0,
        tags,
    };

    let hash = content_hash(&raw);
    let bundle = message_bundle(server, &hash, &message, &plustags);

    Ok(Outbound {
        hash,
        message,
        plustags,
        bundle,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn compose_plain(text: &str) -> Outbound {
        compose(ServerInfo::default(), text, 0, Utc::now()).expect("compose without pow")
    }

    #[test]
    fn plain_publish_keeps_text() {
        let out = compose_plain("Hello #OLN world! #test");
        assert_eq!(out.message.raw, "Hello #OLN world! #test");
        assert_eq!(out.message.hops, 0);
        assert_eq!(out.message.ttl_days, DEFAULT_TTL_DAYS);
        assert_eq!(out.message.origin.display, "anonymous");
        assert!(out.message.sig.is_empty());
    }

    #[test]
    fn hashtags_extracted_case_preserved() {
        let out = compose_plain("Hello #OLN world! #test");
        assert!(out.message.tags.contains(&"#OLN".to_string()));
        assert!(out.message.tags.contains(&"#test".to_string()));
        assert_eq!(
            out.bundle.index.get("#OLN"),
            Some(&vec![out.hash.clone()])
        );
        assert_eq!(
            out.bundle.index.get("#test"),
            Some(&vec![out.hash.clone()])
        );
    }

    #[test]
    fn plustags_appended_after_hashtags() {
        let out = compose_plain("#party at 6FG22222+22");
        let tag_pos = out.message.tags.iter().position(|t| t == "#party");
        let code_pos = out.message.tags.iter().position(|t| t == "6FG22222+22");
        assert!(tag_pos.is_some() && code_pos.is_some());
        assert!(tag_pos < code_pos, "textual tags must precede plustags");
        assert_eq!(out.plustags, vec!["6FG22222+22".to_string()]);
    }

    #[test]
    fn hash_is_over_final_raw() {
        let out = compose_plain("some text");
        assert_eq!(out.hash, content_hash("some text"));
        assert_eq!(out.hash.len(), 16);
        assert!(out.bundle.messages.contains_key(&out.hash));
    }

    #[test]
    fn pow_publish_wraps_text() -> Result<()> {
        let out = compose(ServerInfo::default(), "hidden #tag", 4, Utc::now())?;
        assert_ne!(out.message.raw, "hidden #tag");
        assert!(pow::validate(&out.message.raw) >= 4);
        // The hashtag lives inside the base64 payload now — it is no
        // longer extractable from the envelope.
        assert!(out.message.tags.is_empty());
        assert_eq!(out.hash, content_hash(&out.message.raw));
        Ok(())
    }

    #[test]
    fn compose_is_deterministic_per_instant() {
        let now = Utc::now();
        let a = compose(ServerInfo::default(), "same", 0, now).expect("compose");
        let b = compose(ServerInfo::default(), "same", 0, now).expect("compose");
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.message.timestamp, b.message.timestamp);
    }
}
