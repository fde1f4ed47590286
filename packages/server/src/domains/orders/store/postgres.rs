use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};

use super::{CourierGuard, OrderGuard, OrderStore, OrderUpdate};
use crate::common::{OrderId, PageParams, UserId};
use crate::domains::orders::models::{
    items_total, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus,
};

pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads items for a batch of orders in one round trip.
    async fn attach_items(&self, mut orders: Vec<Order>) -> Result<Vec<Order>> {
        if orders.is_empty() {
            return Ok(orders);
        }
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id).collect();
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT id, order_id, dish_id, dish_name, qty, price_each
             FROM order_items WHERE order_id = ANY($1)
             ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }
        Ok(orders)
    }

    async fn attach_items_one(&self, order: Order) -> Result<Order> {
        let mut orders = self.attach_items(vec![order]).await?;
        orders
            .pop()
            .ok_or_else(|| anyhow::anyhow!("order vanished while loading items"))
    }
}

async fn insert_items(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    items: Vec<NewOrderItem>,
) -> Result<Vec<OrderItem>> {
    let mut inserted = Vec::with_capacity(items.len());
    for item in items {
        let item = item.into_item(order_id);
        sqlx::query(
            "INSERT INTO order_items (id, order_id, dish_id, dish_name, qty, price_each)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.id)
        .bind(item.order_id)
        .bind(item.dish_id)
        .bind(&item.dish_name)
        .bind(item.qty)
        .bind(item.price_each)
        .execute(&mut **tx)
        .await?;
        inserted.push(item);
    }
    Ok(inserted)
}

/// Appends the guard's conditions to a statement already ending in a WHERE clause.
fn push_guard(qb: &mut QueryBuilder<'_, Postgres>, guard: &OrderGuard) {
    if let Some(statuses) = &guard.statuses {
        qb.push(" AND status = ANY(");
        qb.push_bind(statuses.clone());
        qb.push(")");
    }
    match guard.courier {
        CourierGuard::Any => {}
        CourierGuard::Unassigned => {
            qb.push(" AND courier_id IS NULL");
        }
        CourierGuard::AssignedTo(courier) => {
            qb.push(" AND courier_id = ");
            qb.push_bind(courier);
        }
    }
    if let Some(client) = guard.client {
        qb.push(" AND client_id = ");
        qb.push_bind(client);
    }
    if let Some(reference) = &guard.payment_reference {
        qb.push(" AND payment_reference = ");
        qb.push_bind(reference.clone());
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order> {
        let total = items_total(&order.items);
        let mut tx = self.pool.begin().await?;

        let mut created = sqlx::query_as::<_, Order>(
            "INSERT INTO orders (id, client_id, restaurant_id, status, total)
             VALUES ($1, $2, $3, 'created', $4)
             RETURNING *",
        )
        .bind(OrderId::new())
        .bind(order.client_id)
        .bind(order.restaurant_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;

        created.items = insert_items(&mut tx, created.id, order.items).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match order {
            Some(order) => Ok(Some(self.attach_items_one(order).await?)),
            None => Ok(None),
        }
    }

    async fn list_for_client(
        &self,
        client_id: UserId,
        status: Option<OrderStatus>,
        page: PageParams,
    ) -> Result<(Vec<Order>, i64)> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM orders
             WHERE client_id = $1 AND ($2::order_status IS NULL OR status = $2)",
        )
        .bind(client_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders
             WHERE client_id = $1 AND ($2::order_status IS NULL OR status = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(client_id)
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((self.attach_items(orders).await?, count))
    }

    async fn list_claimable(&self, limit: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders
             WHERE courier_id IS NULL AND status = ANY($1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2",
        )
        .bind(OrderStatus::CLAIMABLE.to_vec())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(orders).await
    }

    async fn list_for_courier(
        &self,
        courier_id: UserId,
        statuses: &[OrderStatus],
    ) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders
             WHERE courier_id = $1 AND status = ANY($2)
             ORDER BY created_at",
        )
        .bind(courier_id)
        .bind(statuses.to_vec())
        .fetch_all(&self.pool)
        .await?;

        self.attach_items(orders).await
    }

    async fn compare_and_set(
        &self,
        id: OrderId,
        guard: &OrderGuard,
        update: &OrderUpdate,
    ) -> Result<Option<Order>> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET status = ");
        qb.push_bind(update.status);
        if update.status.has_courier() {
            qb.push(", courier_id = COALESCE(");
            qb.push_bind(update.assign_courier);
            qb.push(", courier_id)");
        } else {
            qb.push(", courier_id = NULL");
        }
        if let Some(reference) = &update.payment_reference {
            qb.push(", payment_reference = ");
            qb.push_bind(reference.clone());
        }
        qb.push(", updated_at = NOW() WHERE id = ");
        qb.push_bind(id);
        push_guard(&mut qb, guard);
        qb.push(" RETURNING *");

        let updated = qb
            .build_query_as::<Order>()
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(order) => Ok(Some(self.attach_items_one(order).await?)),
            None => Ok(None),
        }
    }

    async fn replace_items(
        &self,
        id: OrderId,
        guard: &OrderGuard,
        items: Vec<NewOrderItem>,
    ) -> Result<Option<Order>> {
        let total = items_total(&items);
        let mut tx = self.pool.begin().await?;

        // The row lock taken here serializes concurrent edits of the same order
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE orders SET total = ");
        qb.push_bind(total);
        qb.push(", updated_at = NOW() WHERE id = ");
        qb.push_bind(id);
        push_guard(&mut qb, guard);
        qb.push(" RETURNING *");

        let Some(mut order) = qb
            .build_query_as::<Order>()
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        order.items = insert_items(&mut tx, id, items).await?;

        tx.commit().await?;
        Ok(Some(order))
    }
}
