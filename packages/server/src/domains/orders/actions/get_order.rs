use crate::common::{Actor, DomainError, DomainResult, OrderId};
use crate::domains::orders::lifecycle::{can_view, load_order, owns_restaurant};
use crate::domains::orders::models::Order;
use crate::kernel::ServerDeps;

/// Reads one order if the caller is a party to it (or an admin).
pub async fn get_order_detail(
    deps: &ServerDeps,
    actor: Actor,
    order_id: OrderId,
) -> DomainResult<Order> {
    let order = load_order(deps, order_id).await?;
    ensure_can_view(deps, &actor, &order).await?;
    Ok(order)
}

/// Shared by detail reads and event-feed subscriptions.
pub async fn ensure_can_view(deps: &ServerDeps, actor: &Actor, order: &Order) -> DomainResult<()> {
    let owns = owns_restaurant(deps, actor, order).await?;
    if can_view(actor, order, owns) {
        Ok(())
    } else {
        Err(DomainError::forbidden("no access to this order"))
    }
}
