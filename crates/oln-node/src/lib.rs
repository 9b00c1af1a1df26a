//! OLN node runtime: the prioritised message cache and gossip engine.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                ChatEngine                   │
//! │   ┌──────────────┐      ┌──────────────┐   │
//! │   │ MessageCache │      │  Bus (NATS)  │   │
//! │   │ entries +    │      └──────┬───────┘   │
//! │   │ filters      │             │           │
//! │   └──────┬───────┘             │           │
//! │          │                     │           │
//! │   ┌──────┴─────────────────────┴──────┐   │
//! │   │  Receiver   Rebroadcaster  Sweeper │   │
//! │   │  (bus rx)   (interval)     (60 s)  │   │
//! │   └──────────────────┬────────────────┘   │
//! └──────────────────────┼────────────────────┘
//!                        │ EntrySnapshot events
//!                        ▼
//!                 Operator surface
//! ```
//!
//! # Modules
//!
//! - [`entry`] — `MessageEntry` and the priority formula.
//! - [`filters`] — operator hashtag/location filters and matching.
//! - [`cache`] — the locked store: ingest, evict, sweep, rescore,
//!   queries.
//! - [`bundle`] — outbound bundle construction with index hierarchy.
//! - [`publish`] — operator text → wire-ready message composition.
//! - [`bus`] — the transport seam (`Bus` trait, NATS and in-memory).
//! - [`engine`] — `ChatEngine` tying cache, bus, and tickers
//!   together.

pub mod bundle;
pub mod bus;
pub mod cache;
pub mod engine;
pub mod entry;
pub mod filters;
pub mod publish;

// Re-exports for the CLI and tests.
pub use bus::{Bus, MemoryBus, NatsBus, DEFAULT_SERVER, DEFAULT_SUBJECT};
pub use cache::{CacheStats, EntrySnapshot, IngestReport, MessageCache, SearchMode};
pub use engine::ChatEngine;
pub use entry::{MessageEntry, DEFAULT_TTL_DAYS, MAX_HOPS};
pub use filters::Filters;
pub use publish::Outbound;
