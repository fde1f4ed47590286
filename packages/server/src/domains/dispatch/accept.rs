use tracing::{debug, info};

use crate::common::{Actor, DomainError, DomainResult, OrderId, Role};
use crate::domains::orders::events::{publish_order_event, OrderEvent};
use crate::domains::orders::models::{Order, OrderStatus};
use crate::domains::orders::store::{OrderGuard, OrderUpdate};
use crate::kernel::ServerDeps;

/// Claims an order for the calling courier.
///
/// One guarded write sets courier and `accepted` together, and only while
/// the order is unassigned and claimable. Concurrent claims therefore have
/// exactly one winner; everyone else gets `Conflict`.
pub async fn accept_order(deps: &ServerDeps, actor: Actor, order_id: OrderId) -> DomainResult<Order> {
    actor.require(Role::Courier)?;

    let guard = OrderGuard::in_statuses(&OrderStatus::CLAIMABLE).unassigned();
    let claimed = deps
        .orders
        .compare_and_set(order_id, &guard, &OrderUpdate::claim(actor.id))
        .await?;

    let Some(order) = claimed else {
        return match deps.orders.find(order_id).await? {
            None => Err(DomainError::not_found(format!("order {}", order_id))),
            Some(current) => {
                debug!(
                    order_id = %order_id,
                    courier_id = %actor.id,
                    status = %current.status,
                    "Claim lost"
                );
                Err(DomainError::conflict("order already taken or not ready"))
            }
        };
    };

    info!(order_id = %order_id, courier_id = %actor.id, "Order accepted");
    publish_order_event(
        deps.events.as_ref(),
        OrderEvent::Accepted {
            order_id,
            courier_id: actor.id,
        },
    )
    .await;

    Ok(order)
}
