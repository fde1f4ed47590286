//! Order-domain events pushed to per-order subscriber feeds.
//!
//! Events are transient facts published after a mutation commits. Publishing
//! is best effort: failures are logged and never undo the mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::models::{Order, OrderStatus};
use crate::common::{OrderId, UserId};
use crate::kernel::BaseEventBus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created {
        order_id: OrderId,
        order: serde_json::Value,
    },
    Accepted {
        order_id: OrderId,
        courier_id: UserId,
    },
    InTransit {
        order_id: OrderId,
    },
    Status {
        order_id: OrderId,
        status: OrderStatus,
    },
    CourierLocation {
        order_id: OrderId,
        lat: f64,
        lon: f64,
        ts: DateTime<Utc>,
    },
    PaymentCreated {
        order_id: OrderId,
    },
    Paid {
        order_id: OrderId,
    },
    PaymentFailed {
        order_id: OrderId,
    },
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        Self::Created {
            order_id: order.id,
            order: serde_json::to_value(order).unwrap_or(serde_json::Value::Null),
        }
    }

    pub fn order_id(&self) -> OrderId {
        match self {
            Self::Created { order_id, .. }
            | Self::Accepted { order_id, .. }
            | Self::InTransit { order_id }
            | Self::Status { order_id, .. }
            | Self::CourierLocation { order_id, .. }
            | Self::PaymentCreated { order_id }
            | Self::Paid { order_id }
            | Self::PaymentFailed { order_id } => *order_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Accepted { .. } => "accepted",
            Self::InTransit { .. } => "in_transit",
            Self::Status { .. } => "status",
            Self::CourierLocation { .. } => "courier_location",
            Self::PaymentCreated { .. } => "payment_created",
            Self::Paid { .. } => "paid",
            Self::PaymentFailed { .. } => "payment_failed",
        }
    }
}

/// Bus topic carrying one order's events.
pub fn order_topic(order_id: OrderId) -> String {
    format!("order.{}", order_id)
}

/// Publishes an event to its order's topic, logging instead of failing.
pub async fn publish_order_event(bus: &dyn BaseEventBus, event: OrderEvent) {
    let order_id = event.order_id();
    let kind = event.kind();
    let payload = match serde_json::to_value(&event) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(order_id = %order_id, kind, error = %e, "Failed to serialize order event");
            return;
        }
    };

    match bus.publish(&order_topic(order_id), payload).await {
        Ok(()) => debug!(order_id = %order_id, kind, "Published order event"),
        Err(e) => warn!(order_id = %order_id, kind, error = %e, "Failed to publish order event"),
    }
}
