//! The gossip engine.
//!
//! [`ChatEngine`] owns the cache and the bus connection and drives
//! three background tasks:
//!
//! 1. **Receiver** — drains the bus subscription, parses bundles,
//!    and ingests each contained message.
//! 2. **Rebroadcaster** — every rebroadcast interval, re-publishes
//!    eligible cached messages (hop and TTL gated).
//! 3. **Sweeper** — every 60 s, drops expired entries.
//!
//! All three observe a `watch` shutdown channel and exit on their
//! next wakeup once it fires. The operator surface talks to the
//! engine through [`ChatEngine::cache`] for queries and filter
//! mutations, [`ChatEngine::publish`] for outbound messages, and the
//! event receiver for inbound display.
//!
//! The state lock is never held across bus I/O: the rebroadcast scan
//! snapshots eligible hashes under the read lock, commits mutations
//! under the write lock, and publishes afterwards.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use oln_types::config::ChatConfig;
use oln_types::{Bundle, OlnError, Result, ServerInfo};

use crate::bundle::message_bundle;
use crate::bus::Bus;
use crate::cache::{EntrySnapshot, MessageCache};
use crate::filters::Filters;
use crate::publish::{compose, Outbound};

/// Seconds between TTL sweeps.
const SWEEP_INTERVAL_SECS: u64 = 60;

/// Bounded display event channel capacity. A slow operator surface
/// loses display events rather than stalling ingest.
const EVENT_CHANNEL_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// ChatEngine
// ---------------------------------------------------------------------------

/// Cache plus gossip tasks over one bus connection.
pub struct ChatEngine {
    bus: Arc<dyn Bus>,
    cache: Arc<MessageCache>,
    config: ChatConfig,
    server: ServerInfo,

    event_tx: mpsc::Sender<EntrySnapshot>,
    /// `None` after taken by the consumer.
    event_rx: Option<mpsc::Receiver<EntrySnapshot>>,

    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,

    /// Handles of the spawned tasks. Empty before `start()`.
    tasks: Vec<JoinHandle<()>>,
}

impl ChatEngine {
    /// Creates an engine over the given bus.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Config`] if the configuration is invalid.
    pub fn new(
        bus: Arc<dyn Bus>,
        config: ChatConfig,
        filters: Filters,
        server: ServerInfo,
    ) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(MessageCache::new(config.max_cache_size, filters));
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            bus,
            cache,
            config,
            server,
            event_tx,
            event_rx: Some(event_rx),
            shutdown_tx,
            shutdown_rx,
            tasks: Vec::new(),
        })
    }

    /// The shared cache, for operator queries and filter mutations.
    pub fn cache(&self) -> Arc<MessageCache> {
        Arc::clone(&self.cache)
    }

    /// Takes the display event receiver (can only be taken once).
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<EntrySnapshot>> {
        self.event_rx.take()
    }

    /// Subscribes to the bus and spawns the receiver, rebroadcast,
    /// and sweeper tasks.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Transport`] if the bus subscription fails.
    /// Startup transport errors are fatal to the caller.
    pub async fn start(&mut self) -> Result<()> {
        let inbound = self.bus.subscribe().await?;

        self.tasks.push(tokio::spawn(run_receiver(
            inbound,
            Arc::clone(&self.cache),
            self.event_tx.clone(),
            self.shutdown_rx.clone(),
        )));

        self.tasks.push(tokio::spawn(run_rebroadcaster(
            Arc::clone(&self.bus),
            Arc::clone(&self.cache),
            self.server.clone(),
            self.config.rebroadcast_interval(),
            self.shutdown_rx.clone(),
        )));

        self.tasks.push(tokio::spawn(run_sweeper(
            Arc::clone(&self.cache),
            self.shutdown_rx.clone(),
        )));

        tracing::info!(
            max_cache = self.config.max_cache_size,
            rebroadcast_secs = self.config.rebroadcast_secs,
            auto_pow = self.config.auto_pow_bits,
            "chat engine started"
        );

        Ok(())
    }

    /// Composes and publishes operator text.
    ///
    /// `explicit_bits > 0` forces that much proof-of-work; otherwise
    /// the configured auto-PoW (possibly zero) applies. Mining runs on
    /// a blocking thread so the async runtime stays responsive.
    ///
    /// The node's own cache is not touched — the message comes back
    /// through the bus echo and ingests idempotently like any other.
    ///
    /// # Errors
    ///
    /// - [`OlnError::Input`] if PoW mining fails.
    /// - [`OlnError::Transport`] if the bus publish fails.
    pub async fn publish(&self, text: &str, explicit_bits: u32) -> Result<Outbound> {
        let bits = if explicit_bits > 0 {
            explicit_bits
        } else {
            self.config.auto_pow_bits
        };

        let server = self.server.clone();
        let text = text.to_string();
        let now = Utc::now();

        let outbound = tokio::task::spawn_blocking(move || compose(server, &text, bits, now))
            .await
            .map_err(|e| OlnError::Input {
                reason: format!("pow task failed: {e}"),
            })??;

        let bytes = outbound.bundle.to_bytes()?;
        self.bus.publish(bytes).await?;

        tracing::debug!(hash = %outbound.hash, pow_bits = bits, "published message");
        Ok(outbound)
    }

    /// Signals every task to stop and waits for them to exit.
    pub async fn shutdown(&mut self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.tasks.drain(..) {
            let _ = handle.await;
        }
        tracing::info!("chat engine stopped");
    }
}

// ---------------------------------------------------------------------------
// Receiver task
// ---------------------------------------------------------------------------

/// Drains the bus subscription until shutdown or the bus closes.
async fn run_receiver(
    mut inbound: mpsc::Receiver<Vec<u8>>,
    cache: Arc<MessageCache>,
    event_tx: mpsc::Sender<EntrySnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            maybe = inbound.recv() => {
                match maybe {
                    Some(bytes) => ingest_bundle(&bytes, &cache, &event_tx),
                    None => {
                        tracing::warn!("bus subscription closed — receiver exiting");
                        break;
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// Parses one inbound payload and ingests its messages.
///
/// Malformed payloads are dropped silently — a garbage publisher
/// must not crash the node.
fn ingest_bundle(
    bytes: &[u8],
    cache: &MessageCache,
    event_tx: &mpsc::Sender<EntrySnapshot>,
) {
    let bundle = match Bundle::from_bytes(bytes) {
        Ok(bundle) => bundle,
        Err(e) => {
            tracing::debug!(%e, "dropping malformed bundle");
            return;
        }
    };

    let now = Utc::now();
    for (hash, message) in bundle.messages {
        if let Some(report) = cache.ingest(&hash, message, now) {
            if let Some(evicted) = &report.evicted {
                tracing::debug!(%evicted, "cache overflow eviction");
            }
            // Display is best-effort; a stalled surface drops events.
            let _ = event_tx.try_send(report.snapshot);
        }
    }
}

// ---------------------------------------------------------------------------
// Rebroadcast task
// ---------------------------------------------------------------------------

/// Re-publishes eligible cached messages on every interval tick.
async fn run_rebroadcaster(
    bus: Arc<dyn Bus>,
    cache: Arc<MessageCache>,
    server: ServerInfo,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                rebroadcast_once(&bus, &cache, &server).await;
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}

/// One rebroadcast cycle: snapshot eligible hashes, commit hop
/// increments, then publish outside the lock. Publish failures are
/// swallowed — rebroadcast is best-effort.
async fn rebroadcast_once(bus: &Arc<dyn Bus>, cache: &MessageCache, server: &ServerInfo) {
    let now = Utc::now();
    let hashes = cache.collect_rebroadcast(now);
    if hashes.is_empty() {
        return;
    }

    let items = cache.commit_rebroadcast(&hashes, now);
    let count = items.len();

    for item in items {
        let bundle = message_bundle(server.clone(), &item.hash, &item.message, &item.plustags);
        let bytes = match bundle.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%e, hash = %item.hash, "failed to serialize rebroadcast");
                continue;
            }
        };

        if let Err(e) = bus.publish(bytes).await {
            tracing::warn!(%e, hash = %item.hash, "rebroadcast publish failed");
        }
    }

    tracing::debug!(count, "rebroadcast cycle complete");
}

// ---------------------------------------------------------------------------
// Sweeper task
// ---------------------------------------------------------------------------

/// Removes expired entries once a minute.
async fn run_sweeper(cache: Arc<MessageCache>, mut shutdown_rx: watch::Receiver<bool>) {
    let interval = Duration::from_secs(SWEEP_INTERVAL_SECS);
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = cache.sweep_expired(Utc::now());
                if removed > 0 {
                    tracing::debug!(removed, "ttl sweep removed expired messages");
                }
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
