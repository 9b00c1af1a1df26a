//! Proof-of-work envelope codec.
//!
//! Work is attached to a message by wrapping it in an envelope:
//!
//! ```text
//! <nonce>;<yyyyMMddHHmmss>;<urlsafe-base64(payload)>;<keyword>
//! ```
//!
//! The nonce is the smallest integer such that SHA-1 of the whole
//! envelope string begins with the requested number of zero bits.
//! Given the captured date and the payload, the search is fully
//! deterministic.
//!
//! The keyword may itself contain `;` — the first three separators
//! are authoritative, everything after them belongs to the keyword.
//!
//! PoW is advisory: any text is a valid message, and a string that
//! does not parse as an envelope simply scores zero bits.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::Utc;
use sha1::{Digest, Sha1};

use oln_types::config::MAX_POW_BITS;
use oln_types::{OlnError, Result};

/// Iteration cap for the nonce search. At the [`MAX_POW_BITS`]
/// difficulty cap the expected search is ~16M attempts; this bound
/// only trips on pathological luck.
const MAX_ITERATIONS: u64 = 1 << 26;

/// Date format embedded in envelopes (`yyyyMMddHHmmss`, UTC).
const DATE_FORMAT: &str = "%Y%m%d%H%M%S";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Parsed fields of a proof-of-work envelope.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Envelope {
    /// Nonce field as written by the miner.
    pub nonce: String,
    /// Datestamp captured when the envelope was mined.
    pub date: String,
    /// Decoded payload text.
    pub payload: String,
    /// Trailing keyword (may contain `;`).
    pub keyword: String,
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Mines an envelope whose SHA-1 starts with at least `bits` zero bits.
///
/// Nonces are tried in order from 0; the first satisfying nonce wins.
/// The datestamp is captured once at call time, so repeated calls
/// within the same second produce identical output.
///
/// This function is CPU-intensive for non-trivial `bits`. Callers in
/// async contexts should run it via `tokio::task::spawn_blocking`.
///
/// # Errors
///
/// - [`OlnError::Input`] if `bits` exceeds [`MAX_POW_BITS`].
/// - [`OlnError::Input`] if no satisfying nonce is found within the
///   iteration cap.
pub fn encode(bits: u32, keyword: &str, payload: &str) -> Result<String> {
    if bits > MAX_POW_BITS {
        return Err(OlnError::Input {
            reason: format!("pow bits {bits} exceeds maximum {MAX_POW_BITS}"),
        });
    }

    let payload_b64 = URL_SAFE.encode(payload.as_bytes());
    let date = Utc::now().format(DATE_FORMAT).to_string();

    for nonce in 0..MAX_ITERATIONS {
        let envelope = format!("{nonce};{date};{payload_b64};{keyword}");
        if leading_zero_bits(&envelope) >= bits {
            return Ok(envelope);
        }
    }

    Err(OlnError::Input {
        reason: format!(
            "pow search exhausted after {MAX_ITERATIONS} nonces at {bits} bits"
        ),
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses an envelope into its four fields.
///
/// The first three `;` separators are authoritative; the keyword keeps
/// any further `;` characters verbatim.
///
/// # Errors
///
/// Returns [`OlnError::Parse`] if there are fewer than four fields or
/// the payload is not valid URL-safe base64 of UTF-8 text.
pub fn parse(envelope: &str) -> Result<Envelope> {
    let mut fields = envelope.splitn(4, ';');
    let (nonce, date, payload_b64, keyword) =
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(n), Some(d), Some(p), Some(k)) => (n, d, p, k),
            _ => {
                return Err(OlnError::Parse {
                    reason: "pow envelope has fewer than 4 fields".into(),
                })
            }
        };

    let payload_bytes = URL_SAFE.decode(payload_b64).map_err(|e| OlnError::Parse {
        reason: format!("pow payload is not valid base64: {e}"),
    })?;

    let payload = String::from_utf8(payload_bytes).map_err(|e| OlnError::Parse {
        reason: format!("pow payload is not valid UTF-8: {e}"),
    })?;

    Ok(Envelope {
        nonce: nonce.to_string(),
        date: date.to_string(),
        payload,
        keyword: keyword.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Counts the leading zero bits of SHA-1(`s`), MSB first.
pub fn leading_zero_bits(s: &str) -> u32 {
    let digest = Sha1::digest(s.as_bytes());

    let mut count = 0u32;
    for &byte in digest.iter() {
        if byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

/// Scores an envelope: its leading zero bits if it parses, else 0.
///
/// Any valid-grammar envelope with at least one leading zero bit is
/// considered signed with work.
pub fn validate(envelope: &str) -> u32 {
    if parse(envelope).is_err() {
        return 0;
    }
    leading_zero_bits(envelope)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
