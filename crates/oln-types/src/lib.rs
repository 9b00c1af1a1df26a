//! Core shared types for the OLN node.
//!
//! This crate defines the wire-level data model exchanged on the OLN
//! message bus and the central error type used across the workspace.
//! No other crate should define shared types — everything lives here.

pub mod config;

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// Identifies the source of a message.
///
/// All fields may be empty — origin data is self-reported and carries
/// no cryptographic weight (`sig` on [`Message`] is reserved for a
/// future signing scheme).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    /// Human-readable display name chosen by the sender.
    pub display: String,
    /// Sender public key (reserved; currently unused).
    pub pubkey: String,
    /// Name of the server the message entered the network through.
    pub servername: String,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single OLN message — the atomic unit of communication.
///
/// `raw` holds the free text as published; if the sender attached
/// proof-of-work it is the full PoW envelope. `tags` carries both
/// textual hashtags (`#...`) and raw pluscodes, deduplicated by the
/// producer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// Free text, or a PoW envelope wrapping the text.
    pub raw: String,
    /// Self-reported sender identity.
    pub origin: Origin,
    /// Signature (reserved; currently empty).
    pub sig: String,
    /// Wall-clock creation instant at the originating node.
    pub timestamp: DateTime<Utc>,
    /// Time-to-live in days from `timestamp`.
    #[serde(rename = "ttl")]
    pub ttl_days: u32,
    /// Number of forwarders this message has passed through.
    pub hops: u32,
    /// Textual hashtags followed by pluscodes, no duplicates.
    pub tags: Vec<String>,
}

impl Message {
    /// Elapsed time since the message was created, relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
    }

    /// The message's TTL as a duration (`ttl_days × 24h`).
    pub fn ttl(&self) -> Duration {
        Duration::days(i64::from(self.ttl_days))
    }

    /// Whether the message has outlived its TTL at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age(now) > self.ttl()
    }
}

// ---------------------------------------------------------------------------
// ServerInfo
// ---------------------------------------------------------------------------

/// Identity block a node attaches to every bundle it emits.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// URL or symbolic link for this node.
    pub link: String,
    /// Display name of the node.
    pub name: String,
    /// Node public key (may be empty).
    pub pubkey: String,
    /// Whether this node accepts pushed feeds.
    pub acceptpush: bool,
}

impl Default for ServerInfo {
    /// The identity an anonymous node advertises.
    fn default() -> Self {
        Self {
            link: "oln.local".to_string(),
            name: "OLN Node".to_string(),
            pubkey: String::new(),
            acceptpush: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// The JSON object exchanged on the pub/sub bus.
///
/// `messages` maps content hashes (16 lowercase hex chars) to messages;
/// `index` maps tags and pluscodes (including hierarchy parents) to the
/// hashes they apply to. `feeds` and `push` are advisory and currently
/// always empty on the producing side.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bundle {
    /// Identity of the emitting node.
    #[serde(default)]
    pub server: ServerInfo,
    /// Content hash → message. May contain 0, 1, or many entries.
    #[serde(default)]
    pub messages: HashMap<String, Message>,
    /// Tag or pluscode → hashes it indexes.
    #[serde(default)]
    pub index: HashMap<String, Vec<String>>,
    /// Advisory feed list.
    #[serde(default)]
    pub feeds: Vec<String>,
    /// Advisory push list.
    #[serde(default)]
    pub push: Vec<String>,
}

impl Bundle {
    /// An empty bundle carrying only the node's identity.
    pub fn empty(server: ServerInfo) -> Self {
        Self {
            server,
            messages: HashMap::new(),
            index: HashMap::new(),
            feeds: Vec::new(),
            push: Vec::new(),
        }
    }

    /// Parses a bundle from raw bus bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Parse`] if the bytes are not valid UTF-8
    /// JSON of the bundle shape.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| OlnError::Parse {
            reason: format!("malformed bundle: {e}"),
        })
    }

    /// Serializes the bundle to bus bytes.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Parse`] if serialization fails (should not
    /// happen for well-formed bundles).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| OlnError::Parse {
            reason: format!("failed to serialize bundle: {e}"),
        })
    }
}

// ---------------------------------------------------------------------------
// OlnError
// ---------------------------------------------------------------------------

/// Central error type for the OLN node.
///
/// All crates in the workspace convert their internal errors into
/// variants of this enum, ensuring a unified error handling surface.
#[derive(Debug, Error)]
pub enum OlnError {
    /// The bus connection, publish, or subscribe operation failed.
    #[error("transport error: {reason}")]
    Transport {
        /// Human-readable description of the transport failure.
        reason: String,
    },

    /// Inbound or outbound data did not match the expected shape.
    #[error("parse error: {reason}")]
    Parse {
        /// Human-readable description of what failed to parse.
        reason: String,
    },

    /// An operator command was malformed.
    #[error("input error: {reason}")]
    Input {
        /// Human-readable description of the bad input.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    Config {
        /// Human-readable description of the configuration problem.
        reason: String,
    },
}

/// Convenience result type using [`OlnError`].
pub type Result<T> = std::result::Result<T, OlnError>;

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display.is_empty() {
            write!(f, "(unknown)")
        } else {
            write!(f, "{}", self.display)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
