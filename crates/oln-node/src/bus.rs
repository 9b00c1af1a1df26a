//! The message bus seam.
//!
//! The engine treats the transport as an opaque broadcast bus: one
//! topic, at-least-once delivery, echoes of our own publishes
//! included. Everything transport-specific hides behind [`Bus`].
//!
//! Two implementations:
//!
//! - [`NatsBus`] — the production transport, one NATS subject.
//! - [`MemoryBus`] — a process-local loopback over a broadcast
//!   channel, used by tests and offline operation. It mirrors the
//!   echo behaviour of the real bus: every subscriber, including the
//!   publisher's own node, receives every publish.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};

use oln_types::{OlnError, Result};

/// Default bus subject for OLN traffic.
pub const DEFAULT_SUBJECT: &str = "oln.messages.v1";

/// Default public NATS server.
pub const DEFAULT_SERVER: &str = "nats://demo.nats.io:4222";

/// Buffer size for subscriber delivery channels.
const SUBSCRIBE_BUFFER: usize = 1024;

// ---------------------------------------------------------------------------
// Bus trait
// ---------------------------------------------------------------------------

/// An opaque broadcast bus carrying byte payloads on one topic.
#[async_trait]
pub trait Bus: Send + Sync {
    /// Publishes a payload to the shared topic.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Transport`] if the send fails. Callers in
    /// steady state log and drop; only startup treats this as fatal.
    async fn publish(&self, payload: Vec<u8>) -> Result<()>;

    /// Opens a subscription to the shared topic.
    ///
    /// Payloads arrive on the returned channel until the bus
    /// connection closes or the receiver is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Transport`] if the subscription cannot be
    /// established.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>>;
}

// ---------------------------------------------------------------------------
// NatsBus
// ---------------------------------------------------------------------------

/// NATS-backed bus: one subject on one server.
pub struct NatsBus {
    client: async_nats::Client,
    subject: String,
}

impl NatsBus {
    /// Connects to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`OlnError::Transport`] if the connection fails.
    pub async fn connect(url: &str, subject: &str) -> Result<Self> {
        let client = async_nats::connect(url).await.map_err(|e| OlnError::Transport {
            reason: format!("failed to connect to {url}: {e}"),
        })?;

        Ok(Self {
            client,
            subject: subject.to_string(),
        })
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| OlnError::Transport {
                reason: format!("publish failed: {e}"),
            })
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>> {
        let mut subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .map_err(|e| OlnError::Transport {
                reason: format!("subscribe failed: {e}"),
            })?;

        let (tx, rx) = mpsc::channel(SUBSCRIBE_BUFFER);
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                if tx.send(message.payload.to_vec()).await.is_err() {
                    // Receiver dropped — subscription no longer wanted.
                    break;
                }
            }
        });

        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// MemoryBus
// ---------------------------------------------------------------------------

/// Process-local loopback bus over a broadcast channel.
pub struct MemoryBus {
    tx: broadcast::Sender<Vec<u8>>,
}

impl MemoryBus {
    /// Creates a loopback bus.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SUBSCRIBE_BUFFER);
        Self { tx }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, payload: Vec<u8>) -> Result<()> {
        // No subscribers is not an error on a broadcast bus.
        let _ = self.tx.send(payload);
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Vec<u8>>> {
        let mut source = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIBE_BUFFER);

        tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(payload) => {
                        if tx.send(payload).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "memory bus subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(rx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_bus_delivers_to_all_subscribers() -> Result<()> {
        let bus = MemoryBus::new();
        let mut rx_a = bus.subscribe().await?;
        let mut rx_b = bus.subscribe().await?;

        bus.publish(b"hello".to_vec()).await?;

        assert_eq!(rx_a.recv().await, Some(b"hello".to_vec()));
        assert_eq!(rx_b.recv().await, Some(b"hello".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn memory_bus_echoes_to_publisher_side_subscription() -> Result<()> {
        let bus = MemoryBus::new();
        let mut rx = bus.subscribe().await?;

        bus.publish(b"echo".to_vec()).await?;
        assert_eq!(rx.recv().await, Some(b"echo".to_vec()));
        Ok(())
    }

    #[tokio::test]
    async fn memory_bus_publish_without_subscribers_is_ok() -> Result<()> {
        let bus = MemoryBus::new();
        bus.publish(b"into the void".to_vec()).await?;
        Ok(())
    }
}
