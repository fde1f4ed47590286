use crate::common::{Actor, DomainResult, Page, PageParams, Role};
use crate::domains::orders::models::{Order, OrderStatus};
use crate::kernel::ServerDeps;

/// The calling client's orders, newest first.
pub async fn list_my_orders(
    deps: &ServerDeps,
    actor: Actor,
    status: Option<OrderStatus>,
    page: PageParams,
) -> DomainResult<Page<Order>> {
    actor.require(Role::Client)?;

    let (orders, count) = deps.orders.list_for_client(actor.id, status, page).await?;
    Ok(Page::new(orders, count, page))
}
