//! End-to-end engine tests over the in-memory bus.
//!
//! Two engines share one loopback bus, mirroring two nodes on one
//! NATS subject: every publish is echoed to everyone, including the
//! publishing node itself.

use std::sync::Arc;
use std::time::Duration;

use oln_node::{Bus, ChatEngine, Filters, MemoryBus, MessageCache};
use oln_types::config::ChatConfig;
use oln_types::{Result, ServerInfo};

fn test_config() -> ChatConfig {
    ChatConfig {
        max_cache_size: 10,
        rebroadcast_secs: 3600,
        auto_pow_bits: 0,
    }
}

async fn engine_on(bus: &Arc<MemoryBus>, filters: Filters) -> Result<ChatEngine> {
    let bus: Arc<dyn Bus> = Arc::clone(bus) as Arc<dyn Bus>;
    let mut engine = ChatEngine::new(bus, test_config(), filters, ServerInfo::default())?;
    engine.start().await?;
    Ok(engine)
}

/// Polls until `predicate` holds or two seconds pass.
async fn wait_until<F>(predicate: F) -> bool
where
    F: Fn() -> bool,
{
    for _ in 0..200 {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn cache_contains(cache: &Arc<MessageCache>, hash: &str) -> bool {
    cache.contains(hash)
}

#[tokio::test]
async fn publish_reaches_every_node_including_self() -> Result<()> {
    let bus = Arc::new(MemoryBus::new());
    let mut alice = engine_on(&bus, Filters::default()).await?;
    let mut bob = engine_on(&bus, Filters::default()).await?;

    let out = alice.publish("hello network #oln", 0).await?;

    let alice_cache = alice.cache();
    let bob_cache = bob.cache();
    assert!(
        wait_until(|| cache_contains(&alice_cache, &out.hash)
            && cache_contains(&bob_cache, &out.hash))
            .await,
        "message did not propagate to both caches"
    );

    alice.shutdown().await;
    bob.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn duplicate_publishes_ingest_once() -> Result<()> {
    let bus = Arc::new(MemoryBus::new());
    let mut node = engine_on(&bus, Filters::default()).await?;

    let first = node.publish("same text", 0).await?;
    let second = node.publish("same text", 0).await?;
    assert_eq!(first.hash, second.hash);

    let cache = node.cache();
    assert!(wait_until(|| cache_contains(&cache, &first.hash)).await);

    // Give the second echo time to arrive; it must be a no-op.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(cache.len(), 1);

    node.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn garbage_on_the_bus_is_ignored() -> Result<()> {
    let bus = Arc::new(MemoryBus::new());
    let mut node = engine_on(&bus, Filters::default()).await?;

    bus.publish(b"definitely not json".to_vec()).await?;
    bus.publish(b"{\"messages\": \"wrong shape\"}".to_vec()).await?;

    // The receiver must survive and keep ingesting real traffic.
    let out = node.publish("still alive", 0).await?;
    let cache = node.cache();
    assert!(wait_until(|| cache_contains(&cache, &out.hash)).await);

    node.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn matching_message_arrives_starred() -> Result<()> {
    let bus = Arc::new(MemoryBus::new());

    let mut filters = Filters::default();
    filters.add_hashtag("#oln");
    let mut watcher = engine_on(&bus, filters).await?;
    let mut events = watcher
        .take_event_receiver()
        .expect("event receiver available once");

    let mut sender = engine_on(&bus, Filters::default()).await?;
    sender.publish("on topic #OLN", 0).await?;

    let snapshot = tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("display event within deadline")
        .expect("event channel open");

    assert!(snapshot.starred, "filter match should star the entry");
    assert!(
        snapshot.entry.priority > 1000,
        "starred entries carry the filter bonus"
    );

    watcher.shutdown().await;
    sender.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn pow_publish_scores_at_peer() -> Result<()> {
    let bus = Arc::new(MemoryBus::new());
    let mut sender = engine_on(&bus, Filters::default()).await?;
    let mut peer = engine_on(&bus, Filters::default()).await?;

    let out = sender.publish("heavy message", 4).await?;

    let peer_cache = peer.cache();
    assert!(wait_until(|| cache_contains(&peer_cache, &out.hash)).await);

    let found = peer_cache.find_by_prefix(&out.hash);
    assert_eq!(found.len(), 1);
    assert!(found[0].entry.pow_bits >= 4);

    sender.shutdown().await;
    peer.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn shutdown_stops_cleanly() -> Result<()> {
    let bus = Arc::new(MemoryBus::new());
    let mut node = engine_on(&bus, Filters::default()).await?;

    // Must return promptly rather than hang on any task.
    tokio::time::timeout(Duration::from_secs(2), node.shutdown())
        .await
        .expect("shutdown within deadline");
    Ok(())
}
