//! In-process pub/sub hub for order event feeds.
//!
//! One broadcast channel per topic. Topics are opaque strings; the hub has no
//! knowledge of what is being streamed.
//!
//! # Usage
//!
//! Producers (domain actions):
//!   hub.publish("order.0190...", json!({"type": "accepted", ...})).await;
//!
//! Consumers (SSE endpoints):
//!   let rx = hub.subscribe("order.0190...").await;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use crate::kernel::{BaseEventBus, EventFeed, FeedItem};

/// Thread-safe, cloneable. Payloads are `serde_json::Value`; domains
/// serialize their own types.
#[derive(Clone)]
pub struct StreamHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl StreamHub {
    /// Create a new StreamHub with default capacity (256 messages per channel).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish a JSON value to a topic. No-op if no subscribers.
    pub async fn publish(&self, topic: &str, value: serde_json::Value) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            // Err only means every receiver is gone
            let _ = tx.send(value);
        }
    }

    /// Subscribe to a topic. Creates the channel if it doesn't exist.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Remove channels with zero subscribers (housekeeping).
    pub async fn cleanup(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }

    pub async fn topic_count(&self) -> usize {
        self.channels.read().await.len()
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseEventBus for StreamHub {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        StreamHub::publish(self, topic, payload).await;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<EventFeed> {
        let rx = StreamHub::subscribe(self, topic).await;
        let feed = BroadcastStream::new(rx).map(|item| match item {
            Ok(value) => FeedItem::Event(value),
            Err(BroadcastStreamRecvError::Lagged(n)) => FeedItem::Lagged(n),
        });
        Ok(feed.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_subscribe_roundtrip() {
        let hub = StreamHub::new();
        let mut rx = hub.subscribe("order.a").await;

        let value = json!({"type": "accepted"});
        hub.publish("order.a", value.clone()).await;

        assert_eq!(rx.recv().await.unwrap(), value);
    }

    #[tokio::test]
    async fn test_publish_no_subscribers_is_noop() {
        let hub = StreamHub::new();
        hub.publish("order.nobody", json!({"type": "status"})).await;
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let hub = StreamHub::new();
        let mut a = hub.subscribe("order.a").await;
        let mut b = hub.subscribe("order.b").await;

        hub.publish("order.a", json!({"n": 1})).await;
        hub.publish("order.b", json!({"n": 2})).await;

        assert_eq!(a.recv().await.unwrap(), json!({"n": 1}));
        assert_eq!(b.recv().await.unwrap(), json!({"n": 2}));
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cleanup_removes_empty_channels() {
        let hub = StreamHub::new();
        let rx = hub.subscribe("order.ephemeral").await;
        assert_eq!(hub.topic_count().await, 1);

        drop(rx);
        assert_eq!(hub.cleanup().await, 1);
        assert_eq!(hub.topic_count().await, 0);
    }

    #[tokio::test]
    async fn test_feed_preserves_publish_order() {
        let hub = StreamHub::new();
        let mut feed = BaseEventBus::subscribe(&hub, "order.seq").await.unwrap();

        for n in 0..5 {
            BaseEventBus::publish(&hub, "order.seq", json!({ "n": n }))
                .await
                .unwrap();
        }

        for n in 0..5 {
            assert_eq!(feed.next().await, Some(FeedItem::Event(json!({ "n": n }))));
        }
    }

    #[tokio::test]
    async fn test_slow_subscriber_sees_lag_notice() {
        let hub = StreamHub::with_capacity(2);
        let mut feed = BaseEventBus::subscribe(&hub, "order.slow").await.unwrap();

        for n in 0..5 {
            hub.publish("order.slow", json!({ "n": n })).await;
        }

        assert_eq!(feed.next().await, Some(FeedItem::Lagged(3)));
        assert_eq!(feed.next().await, Some(FeedItem::Event(json!({ "n": 3 }))));
        assert_eq!(feed.next().await, Some(FeedItem::Event(json!({ "n": 4 }))));
    }
}
