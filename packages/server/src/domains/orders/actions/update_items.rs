use tracing::info;

use super::cart::{price_cart, CartLine};
use crate::common::{Actor, DomainError, DomainResult, OrderId, Role};
use crate::domains::orders::lifecycle::load_order;
use crate::domains::orders::models::{Order, OrderStatus};
use crate::domains::orders::store::OrderGuard;
use crate::kernel::ServerDeps;

/// Replaces the cart of an order the client has not started paying for.
///
/// Items are re-priced from the current menu and the total recomputed in the
/// same write. No event is published; subscribers only follow status.
pub async fn update_items(
    deps: &ServerDeps,
    actor: Actor,
    order_id: OrderId,
    lines: Vec<CartLine>,
) -> DomainResult<Order> {
    actor.require(Role::Client)?;

    let order = load_order(deps, order_id).await?;
    if !order.is_client(actor.id) {
        return Err(DomainError::forbidden("not your order"));
    }
    if order.status != OrderStatus::Created {
        return Err(DomainError::forbidden(format!(
            "items can only change while the order is created (status {})",
            order.status
        )));
    }

    let items = price_cart(deps, order.restaurant_id, &lines).await?;
    let guard = OrderGuard::in_statuses(&[OrderStatus::Created]).owned_by(actor.id);

    let updated = deps
        .orders
        .replace_items(order_id, &guard, items)
        .await?
        .ok_or_else(|| DomainError::conflict("order changed concurrently, retry"))?;

    info!(order_id = %order_id, total = %updated.total, "Order items replaced");
    Ok(updated)
}
