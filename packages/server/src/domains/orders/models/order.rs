use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::status::OrderStatus;
use crate::common::{DishId, OrderId, OrderItemId, RestaurantId, UserId};

/// Order model - SQL persistence layer
///
/// `courier_id` is set exactly while `status` is accepted, in_transit or
/// delivered. `total` always equals the sum of `qty * price_each` over
/// `items`; stores recompute it whenever the items change.
#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub client_id: UserId,
    pub restaurant_id: RestaurantId,
    pub courier_id: Option<UserId>,
    pub status: OrderStatus,
    pub total: Decimal,
    /// Empty until payment is initiated.
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

/// Line item with the dish name and price captured when it was added.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(skip)]
    pub order_id: OrderId,
    pub dish_id: DishId,
    pub dish_name: String,
    pub qty: i32,
    pub price_each: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price_each * Decimal::from(self.qty)
    }
}

/// Snapshot of one cart line, priced from the menu at creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub dish_id: DishId,
    pub dish_name: String,
    pub qty: i32,
    pub price_each: Decimal,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Decimal {
        self.price_each * Decimal::from(self.qty)
    }

    pub(crate) fn into_item(self, order_id: OrderId) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(),
            order_id,
            dish_id: self.dish_id,
            dish_name: self.dish_name,
            qty: self.qty,
            price_each: self.price_each,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub client_id: UserId,
    pub restaurant_id: RestaurantId,
    pub items: Vec<NewOrderItem>,
}

/// Sum of line totals, rounded to cents.
pub fn items_total<'a>(lines: impl IntoIterator<Item = &'a NewOrderItem>) -> Decimal {
    lines
        .into_iter()
        .map(NewOrderItem::line_total)
        .sum::<Decimal>()
        .round_dp(2)
}

impl Order {
    pub fn is_client(&self, user: UserId) -> bool {
        self.client_id == user
    }

    pub fn is_courier(&self, user: UserId) -> bool {
        self.courier_id == Some(user)
    }

    /// Total recomputed from the items, for checking the stored value.
    pub fn computed_total(&self) -> Decimal {
        self.items
            .iter()
            .map(OrderItem::line_total)
            .sum::<Decimal>()
            .round_dp(2)
    }

    /// Amount in minor units (cents), truncating any sub-cent remainder.
    pub fn amount_minor(&self) -> i64 {
        use rust_decimal::prelude::ToPrimitive;

        (self.total * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn line(qty: i32, price: Decimal) -> NewOrderItem {
        NewOrderItem {
            dish_id: DishId::new(),
            dish_name: "Pho".to_string(),
            qty,
            price_each: price,
        }
    }

    #[test]
    fn test_items_total() {
        let lines = vec![line(2, dec("10.50")), line(1, dec("3.25"))];
        assert_eq!(items_total(&lines), dec("24.25"));
    }

    #[test]
    fn test_empty_total_is_zero() {
        assert_eq!(items_total(&Vec::<NewOrderItem>::new()), Decimal::ZERO);
    }
}
