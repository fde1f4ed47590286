//! NATS-backed event bus.
//!
//! Lets several server instances share order feeds: a courier's location ping
//! handled by one instance reaches an SSE subscriber connected to another.
//! Subjects are the bus topics as-is (`order.<uuid>`), payloads are JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tracing::warn;

use crate::kernel::{BaseEventBus, EventFeed, FeedItem};

pub struct NatsEventBus {
    client: async_nats::Client,
}

impl NatsEventBus {
    pub fn new(client: async_nats::Client) -> Self {
        Self { client }
    }

    pub async fn connect(url: &str) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .with_context(|| format!("Failed to connect to NATS at {}", url))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl BaseEventBus for NatsEventBus {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let bytes = Bytes::from(serde_json::to_vec(&payload)?);
        self.client.publish(topic.to_string(), bytes).await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<EventFeed> {
        let subscriber = self.client.subscribe(topic.to_string()).await?;
        let feed = subscriber.filter_map(|message| async move {
            match serde_json::from_slice::<serde_json::Value>(&message.payload) {
                Ok(value) => Some(FeedItem::Event(value)),
                Err(e) => {
                    warn!(subject = %message.subject, error = %e, "Dropping non-JSON NATS message");
                    None
                }
            }
        });
        Ok(feed.boxed())
    }
}
