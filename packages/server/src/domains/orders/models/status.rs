use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::DomainError;

/// Order lifecycle state.
///
/// ```text
/// created -> pending_payment -> paid -> restaurant_confirmed -> ready_for_pickup
///         -> accepted -> in_transit -> delivered
/// created | pending_payment -> canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    PendingPayment,
    Paid,
    RestaurantConfirmed,
    ReadyForPickup,
    Accepted,
    InTransit,
    Delivered,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Created,
        OrderStatus::PendingPayment,
        OrderStatus::Paid,
        OrderStatus::RestaurantConfirmed,
        OrderStatus::ReadyForPickup,
        OrderStatus::Accepted,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    /// Statuses a courier may claim from.
    pub const CLAIMABLE: [OrderStatus; 2] =
        [OrderStatus::ReadyForPickup, OrderStatus::RestaurantConfirmed];

    /// Statuses during which a courier is attached.
    pub const COURIER_PHASE: [OrderStatus; 3] = [
        OrderStatus::Accepted,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
    ];

    /// Statuses in which a courier's position is streamed to subscribers.
    pub const EN_ROUTE: [OrderStatus; 2] = [OrderStatus::Accepted, OrderStatus::InTransit];

    /// Statuses in which the client may still cancel, edit or pay.
    pub const CLIENT_EDITABLE: [OrderStatus; 2] =
        [OrderStatus::Created, OrderStatus::PendingPayment];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::RestaurantConfirmed => "restaurant_confirmed",
            OrderStatus::ReadyForPickup => "ready_for_pickup",
            OrderStatus::Accepted => "accepted",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn has_courier(&self) -> bool {
        Self::COURIER_PHASE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| DomainError::invalid(format!("unknown order status: {}", s)))
    }
}
