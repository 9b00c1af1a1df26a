//! Message protocol for the OLN node.
//!
//! Defines the proof-of-work envelope codec, content-addressed
//! hashing, and hashtag extraction.
//!
//! # Modules
//!
//! - [`pow`] — `nonce;date;b64msg;keyword` envelope mining, parsing,
//!   and leading-zero-bit validation over SHA-1.
//! - [`hash`] — truncated SHA-256 content hashes used as message
//!   identity on the wire.
//! - [`tags`] — textual hashtag extraction.

pub mod hash;
pub mod pow;
pub mod tags;
