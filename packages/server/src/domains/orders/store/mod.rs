//! Order persistence.
//!
//! Every contended mutation is a single compare-and-set: the store applies an
//! `OrderUpdate` only if the row still satisfies an `OrderGuard`, and reports
//! `None` otherwise. Callers never read-modify-write.

mod memory;
mod postgres;

pub use memory::MemoryOrderStore;
pub use postgres::PgOrderStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::models::{NewOrder, NewOrderItem, Order, OrderStatus};
use crate::common::{OrderId, PageParams, UserId};

/// Condition on the order's courier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CourierGuard {
    #[default]
    Any,
    Unassigned,
    AssignedTo(UserId),
}

/// Preconditions a compare-and-set must observe on the stored row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderGuard {
    pub statuses: Option<Vec<OrderStatus>>,
    pub courier: CourierGuard,
    pub client: Option<UserId>,
    pub payment_reference: Option<String>,
}

impl OrderGuard {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn in_statuses(statuses: &[OrderStatus]) -> Self {
        Self {
            statuses: Some(statuses.to_vec()),
            ..Self::default()
        }
    }

    pub fn unassigned(mut self) -> Self {
        self.courier = CourierGuard::Unassigned;
        self
    }

    pub fn assigned_to(mut self, courier: UserId) -> Self {
        self.courier = CourierGuard::AssignedTo(courier);
        self
    }

    pub fn owned_by(mut self, client: UserId) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn admits(&self, order: &Order) -> bool {
        let status_ok = self
            .statuses
            .as_ref()
            .map_or(true, |statuses| statuses.contains(&order.status));
        let courier_ok = match self.courier {
            CourierGuard::Any => true,
            CourierGuard::Unassigned => order.courier_id.is_none(),
            CourierGuard::AssignedTo(courier) => order.courier_id == Some(courier),
        };
        let client_ok = self.client.map_or(true, |client| order.client_id == client);
        let reference_ok = self
            .payment_reference
            .as_deref()
            .map_or(true, |reference| order.payment_reference == reference);

        status_ok && courier_ok && client_ok && reference_ok
    }
}

/// Column changes applied by a successful compare-and-set.
///
/// The courier column follows the target status: it is kept (or set from
/// `assign_courier`) for courier-phase statuses and cleared otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderUpdate {
    pub status: OrderStatus,
    pub assign_courier: Option<UserId>,
    pub payment_reference: Option<String>,
}

impl OrderUpdate {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status,
            assign_courier: None,
            payment_reference: None,
        }
    }

    pub fn claim(courier: UserId) -> Self {
        Self {
            status: OrderStatus::Accepted,
            assign_courier: Some(courier),
            payment_reference: None,
        }
    }

    pub fn payment_started(reference: impl Into<String>) -> Self {
        Self {
            status: OrderStatus::PendingPayment,
            assign_courier: None,
            payment_reference: Some(reference.into()),
        }
    }

    /// Applies the update in place, refusing changes that would leave a
    /// courier-phase order without a courier.
    pub(crate) fn apply(&self, order: &mut Order, now: DateTime<Utc>) -> Result<()> {
        let courier = if self.status.has_courier() {
            self.assign_courier.or(order.courier_id)
        } else {
            None
        };
        if self.status.has_courier() && courier.is_none() {
            anyhow::bail!(
                "order {} cannot enter {} without a courier",
                order.id,
                self.status
            );
        }

        order.status = self.status;
        order.courier_id = courier;
        if let Some(reference) = &self.payment_reference {
            order.payment_reference = reference.clone();
        }
        order.updated_at = now;
        Ok(())
    }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order in `created` with its items and computed total.
    async fn insert(&self, order: NewOrder) -> Result<Order>;

    async fn find(&self, id: OrderId) -> Result<Option<Order>>;

    /// Client's orders, newest first, with the total match count.
    async fn list_for_client(
        &self,
        client_id: UserId,
        status: Option<OrderStatus>,
        page: PageParams,
    ) -> Result<(Vec<Order>, i64)>;

    /// Unassigned orders in a claimable status, newest first.
    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>>;

    async fn list_for_courier(
        &self,
        courier_id: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>>;

    /// Applies `update` iff the stored order satisfies `guard`.
    ///
    /// Returns the updated order, or `None` if the order is missing or the
    /// guard did not hold.
    async fn compare_and_set(
        &self,
        id: OrderId,
        guard: &OrderGuard,
        update: &OrderUpdate,
    ) -> Result<Option<Order>>;

    /// Replaces all items and recomputes the total iff `guard` holds.
    async fn replace_items(
        &self,
        id: OrderId,
        guard: &OrderGuard,
        items: Vec<NewOrderItem>,
    ) -> Result<Option<Order>>;
}
