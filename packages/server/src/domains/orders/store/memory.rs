use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::{OrderGuard, OrderStore, OrderUpdate};
use crate::common::{OrderId, PageParams, UserId};
use crate::domains::orders::models::{items_total, NewOrder, NewOrderItem, Order, OrderStatus};

/// Order store held in process memory.
///
/// The mutex is held only for the check-and-set itself; nothing awaits while
/// holding it.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: Mutex<HashMap<OrderId, Order>>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_orders<R>(&self, f: impl FnOnce(&mut HashMap<OrderId, Order>) -> R) -> R {
        let mut orders = self.orders.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut orders)
    }
}

fn newest_first(orders: &mut [Order]) {
    orders.sort_by_key(|o| Reverse((o.created_at, o.id)));
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();
        let id = OrderId::new();
        let created = Order {
            id,
            client_id: order.client_id,
            restaurant_id: order.restaurant_id,
            courier_id: None,
            status: OrderStatus::Created,
            total: items_total(&order.items),
            payment_reference: String::new(),
            created_at: now,
            updated_at: now,
            items: order
                .items
                .into_iter()
                .map(|item| item.into_item(id))
                .collect(),
        };
        self.with_orders(|orders| orders.insert(id, created.clone()));
        Ok(created)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.with_orders(|orders| orders.get(&id).cloned()))
    }

    async fn list_for_client(
        &self,
        client_id: UserId,
        status: Option<OrderStatus>,
        page: PageParams,
    ) -> Result<(Vec<Order>, i64)> {
        let mut matching: Vec<Order> = self.with_orders(|orders| {
            orders
                .values()
                .filter(|o| o.client_id == client_id)
                .filter(|o| status.map_or(true, |s| o.status == s))
                .cloned()
                .collect()
        });
        newest_first(&mut matching);

        let count = matching.len() as i64;
        let results = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((results, count))
    }

    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>> {
        let mut claimable: Vec<Order> = self.with_orders(|orders| {
            orders
                .values()
                .filter(|o| o.courier_id.is_none() && OrderStatus::CLAIMABLE.contains(&o.status))
                .cloned()
                .collect()
        });
        newest_first(&mut claimable);
        claimable.truncate(limit.max(0) as usize);
        Ok(claimable)
    }

    async fn list_for_courier(
        &self,
        courier_id: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>> {
        let mut assigned: Vec<Order> = self.with_orders(|orders| {
            orders
                .values()
                .filter(|o| o.courier_id == Some(courier_id) && statuses.contains(&o.status))
                .cloned()
                .collect()
        });
        assigned.sort_by_key(|o| (o.created_at, o.id));
        Ok(assigned)
    }

    async fn compare_and_set(
        &self,
        id: OrderId,
        guard: &OrderGuard,
        update: &OrderUpdate,
    ) -> Result<Option<Order>> {
        self.with_orders(|orders| {
            let Some(order) = orders.get_mut(&id) else {
                return Ok(None);
            };
            if !guard.admits(order) {
                return Ok(None);
            }
            update.apply(order, Utc::now())?;
            Ok(Some(order.clone()))
        })
    }

    async fn replace_items(
        &self,
        id: OrderId,
        guard: &OrderGuard,
        items: Vec<NewOrderItem>,
    ) -> Result<Option<Order>> {
        let total = items_total(&items);
        Ok(self.with_orders(|orders| {
            let order = orders.get_mut(&id).filter(|o| guard.admits(o))?;
            order.items = items.into_iter().map(|item| item.into_item(id)).collect();
            order.total = total;
            order.updated_at = Utc::now();
            Some(order.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{DishId, RestaurantId};
    use rust_decimal::Decimal;

    fn new_order(client_id: UserId) -> NewOrder {
        NewOrder {
            client_id,
            restaurant_id: RestaurantId::new(),
            items: vec![NewOrderItem {
                dish_id: DishId::new(),
                dish_name: "Borscht".to_string(),
                qty: 2,
                price_each: Decimal::new(450, 2),
            }],
        }
    }

    #[tokio::test]
    async fn test_insert_computes_total() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(UserId::new())).await.unwrap();

        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.total, Decimal::new(900, 2));
        assert_eq!(order.total, order.computed_total());
        assert!(order.courier_id.is_none());
    }

    #[tokio::test]
    async fn test_compare_and_set_respects_guard() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(UserId::new())).await.unwrap();

        let refused = store
            .compare_and_set(
                order.id,
                &OrderGuard::in_statuses(&[OrderStatus::Paid]),
                &OrderUpdate::status(OrderStatus::RestaurantConfirmed),
            )
            .await
            .unwrap();
        assert!(refused.is_none());

        let applied = store
            .compare_and_set(
                order.id,
                &OrderGuard::in_statuses(&[OrderStatus::Created]),
                &OrderUpdate::status(OrderStatus::Canceled),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.status, OrderStatus::Canceled);
    }

    #[tokio::test]
    async fn test_compare_and_set_missing_order() {
        let store = MemoryOrderStore::new();
        let result = store
            .compare_and_set(
                OrderId::new(),
                &OrderGuard::any(),
                &OrderUpdate::status(OrderStatus::Paid),
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_list_for_client_pages_newest_first() {
        let store = MemoryOrderStore::new();
        let client = UserId::new();
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(store.insert(new_order(client)).await.unwrap().id);
        }
        store.insert(new_order(UserId::new())).await.unwrap();

        let (page, count) = store
            .list_for_client(client, None, PageParams::new(2, 2))
            .await
            .unwrap();

        assert_eq!(count, 5);
        let got: Vec<_> = page.iter().map(|o| o.id).collect();
        assert_eq!(got, vec![ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn test_replace_items_recomputes_total() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(UserId::new())).await.unwrap();

        let items = vec![
            NewOrderItem {
                dish_id: DishId::new(),
                dish_name: "Pelmeni".to_string(),
                qty: 3,
                price_each: Decimal::new(333, 2),
            },
            NewOrderItem {
                dish_id: DishId::new(),
                dish_name: "Kvass".to_string(),
                qty: 1,
                price_each: Decimal::new(150, 2),
            },
        ];
        let updated = store
            .replace_items(order.id, &OrderGuard::any(), items)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.total, Decimal::new(1149, 2));
        assert_eq!(updated.total, updated.computed_total());
    }
}
