use serde::Deserialize;
use tracing::info;

use super::cart::{price_cart, CartLine};
use crate::common::{Actor, DomainError, DomainResult, RestaurantId, Role};
use crate::domains::orders::events::{publish_order_event, OrderEvent};
use crate::domains::orders::models::{NewOrder, Order};
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub restaurant_id: RestaurantId,
    pub items: Vec<CartLine>,
}

/// Places a new order in `created` for the calling client.
///
/// Prices are captured from the menu now and never re-read.
pub async fn create_order(
    deps: &ServerDeps,
    actor: Actor,
    input: CreateOrderInput,
) -> DomainResult<Order> {
    actor.require(Role::Client)?;

    let restaurant = deps
        .restaurants
        .find_restaurant(input.restaurant_id)
        .await?
        .filter(|r| r.is_active)
        .ok_or_else(|| {
            DomainError::not_found(format!("restaurant {} (absent or inactive)", input.restaurant_id))
        })?;

    let items = price_cart(deps, restaurant.id, &input.items).await?;

    let order = deps
        .orders
        .insert(NewOrder {
            client_id: actor.id,
            restaurant_id: restaurant.id,
            items,
        })
        .await?;

    info!(
        order_id = %order.id,
        client_id = %actor.id,
        restaurant_id = %restaurant.id,
        total = %order.total,
        "Order created"
    );
    publish_order_event(deps.events.as_ref(), OrderEvent::created(&order)).await;

    Ok(order)
}
