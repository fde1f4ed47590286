// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Domain rules (who may move an order where) live in domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseEventBus, BasePaymentGateway)

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::common::{OrderId, UserId};

// =============================================================================
// Event Bus Trait (Infrastructure - topic fan-out)
// =============================================================================

/// One item delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    Event(serde_json::Value),
    /// The subscriber fell behind and this many events were dropped for it.
    Lagged(u64),
}

/// Live subscription. Dropping it unsubscribes.
pub type EventFeed = BoxStream<'static, FeedItem>;

#[async_trait]
pub trait BaseEventBus: Send + Sync {
    /// Deliver `payload` to every current subscriber of `topic`.
    ///
    /// Best effort: no replay for later subscribers, no retry.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()>;

    /// Open a live feed on `topic`.
    async fn subscribe(&self, topic: &str) -> Result<EventFeed>;
}

// =============================================================================
// Payment Gateway Trait (Infrastructure - card processor)
// =============================================================================

/// What to charge for one order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub client_id: UserId,
    /// Amount in minor currency units (cents).
    pub amount_minor: i64,
    pub currency: String,
}

/// A processor-side payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Opaque processor id, stored on the order as its payment reference.
    pub reference: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[async_trait]
pub trait BasePaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentSession>;

    async fn retrieve_payment(&self, reference: &str) -> Result<PaymentSession>;
}
