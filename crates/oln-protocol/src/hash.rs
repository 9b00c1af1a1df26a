//! Content-addressed message hashing.
//!
//! A message's identity on the wire is the first 16 lowercase hex
//! characters (64 bits) of SHA-256 over its raw text. The truncation
//! is part of the wire format — collision-resistant enough for
//! ephemeral gossip, and short enough to read aloud.

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the full SHA-256 digest.
pub const HASH_LEN: usize = 16;

/// Computes the content hash of a raw message text.
///
/// Deterministic — identical input always produces identical output.
pub fn content_hash(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_LEN);
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_16_lowercase_hex() {
        let h = content_hash("Hello #OLN world");
        assert_eq!(h.len(), HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(content_hash("same input"), content_hash("same input"));
    }

    #[test]
    fn hash_differs_for_different_input() {
        assert_ne!(content_hash("one"), content_hash("two"));
    }

    #[test]
    fn hash_matches_known_prefix() {
        // SHA-256("abc") = ba7816bf8f01cfea414140de5dae2223...
        assert_eq!(content_hash("abc"), "ba7816bf8f01cfea");
    }
}
