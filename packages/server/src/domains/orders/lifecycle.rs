//! Role-gated status transitions.
//!
//! | role       | relationship      | precondition               | targets                                          |
//! |------------|-------------------|----------------------------|--------------------------------------------------|
//! | restaurant | owns restaurant   | none                       | restaurant_confirmed, ready_for_pickup, canceled |
//! | courier    | assigned courier  | none                       | in_transit, delivered                            |
//! | client     | placed the order  | created or pending_payment | canceled                                         |
//!
//! Anything else is forbidden. The table is the whole legality contract;
//! there is no adjacency graph on top of it.

use tracing::info;

use super::events::{publish_order_event, OrderEvent};
use super::models::{Order, OrderStatus};
use super::store::{OrderGuard, OrderUpdate};
use crate::common::{Actor, DomainError, DomainResult, OrderId, Role};
use crate::kernel::ServerDeps;

const RESTAURANT_TARGETS: [OrderStatus; 3] = [
    OrderStatus::RestaurantConfirmed,
    OrderStatus::ReadyForPickup,
    OrderStatus::Canceled,
];

const COURIER_TARGETS: [OrderStatus; 2] = [OrderStatus::InTransit, OrderStatus::Delivered];

/// Checks the permission table and returns the guard the write must observe.
///
/// The guard restates the checked relationship so that a concurrent change
/// between this read and the write (a paid order, a reassigned courier)
/// makes the write fail instead of applying to a stale state.
pub fn authorize_transition(
    actor: &Actor,
    order: &Order,
    owns_restaurant: bool,
    target: OrderStatus,
) -> DomainResult<OrderGuard> {
    match actor.role {
        Role::Restaurant => {
            if !owns_restaurant {
                return Err(DomainError::forbidden("not this order's restaurant"));
            }
            if !RESTAURANT_TARGETS.contains(&target) {
                return Err(DomainError::forbidden(format!(
                    "restaurant cannot set status {}",
                    target
                )));
            }
            Ok(OrderGuard::any())
        }
        Role::Courier => {
            if !order.is_courier(actor.id) {
                return Err(DomainError::forbidden("not the assigned courier"));
            }
            if !COURIER_TARGETS.contains(&target) {
                return Err(DomainError::forbidden(format!(
                    "courier cannot set status {}",
                    target
                )));
            }
            Ok(OrderGuard::any().assigned_to(actor.id))
        }
        Role::Client => {
            if !order.is_client(actor.id) {
                return Err(DomainError::forbidden("not your order"));
            }
            if target != OrderStatus::Canceled {
                return Err(DomainError::forbidden(format!(
                    "client cannot set status {}",
                    target
                )));
            }
            if !OrderStatus::CLIENT_EDITABLE.contains(&order.status) {
                return Err(DomainError::forbidden(format!(
                    "order can no longer be canceled (status {})",
                    order.status
                )));
            }
            Ok(OrderGuard::in_statuses(&OrderStatus::CLIENT_EDITABLE).owned_by(actor.id))
        }
        Role::Admin => Err(DomainError::forbidden("admins cannot change order status")),
    }
}

/// Whether `actor` may read the order and follow its event feed.
pub fn can_view(actor: &Actor, order: &Order, owns_restaurant: bool) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Client => order.is_client(actor.id),
        Role::Courier => order.is_courier(actor.id),
        Role::Restaurant => owns_restaurant,
    }
}

/// Whether `actor` owns the restaurant the order was placed with.
pub async fn owns_restaurant(deps: &ServerDeps, actor: &Actor, order: &Order) -> DomainResult<bool> {
    if actor.role != Role::Restaurant {
        return Ok(false);
    }
    let restaurant = deps.restaurants.find_restaurant(order.restaurant_id).await?;
    Ok(restaurant.is_some_and(|r| r.owner_id == actor.id))
}

pub async fn load_order(deps: &ServerDeps, order_id: OrderId) -> DomainResult<Order> {
    deps.orders
        .find(order_id)
        .await?
        .ok_or_else(|| DomainError::not_found(format!("order {}", order_id)))
}

/// Moves an order to `target` on behalf of `actor`.
///
/// Emits one `status` event on success. A forbidden request changes nothing
/// and emits nothing; losing a race to a concurrent change yields `Conflict`.
pub async fn request_transition(
    deps: &ServerDeps,
    actor: Actor,
    order_id: OrderId,
    target: OrderStatus,
) -> DomainResult<Order> {
    let order = load_order(deps, order_id).await?;
    let owns = owns_restaurant(deps, &actor, &order).await?;
    let guard = authorize_transition(&actor, &order, owns, target)?;

    let updated = deps
        .orders
        .compare_and_set(order_id, &guard, &OrderUpdate::status(target))
        .await?
        .ok_or_else(|| DomainError::conflict("order changed concurrently, retry"))?;

    info!(
        order_id = %order_id,
        actor = %actor.id,
        role = %actor.role,
        from = %order.status,
        to = %target,
        "Order status changed"
    );
    publish_order_event(
        deps.events.as_ref(),
        OrderEvent::Status {
            order_id,
            status: target,
        },
    )
    .await;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RestaurantId, UserId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn order(status: OrderStatus, client: UserId, courier: Option<UserId>) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(),
            client_id: client,
            restaurant_id: RestaurantId::new(),
            courier_id: courier,
            status,
            total: Decimal::new(1000, 2),
            payment_reference: String::new(),
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        }
    }

    fn is_forbidden(result: DomainResult<OrderGuard>) -> bool {
        matches!(result, Err(DomainError::Forbidden(_)))
    }

    #[test]
    fn test_restaurant_owner_targets() {
        let actor = Actor::restaurant(UserId::new());
        let o = order(OrderStatus::Paid, UserId::new(), None);

        for target in OrderStatus::ALL {
            let result = authorize_transition(&actor, &o, true, target);
            assert_eq!(
                result.is_ok(),
                RESTAURANT_TARGETS.contains(&target),
                "restaurant -> {}",
                target
            );
        }
    }

    #[test]
    fn test_restaurant_non_owner_forbidden() {
        let actor = Actor::restaurant(UserId::new());
        let o = order(OrderStatus::Paid, UserId::new(), None);
        assert!(is_forbidden(authorize_transition(
            &actor,
            &o,
            false,
            OrderStatus::RestaurantConfirmed
        )));
    }

    #[test]
    fn test_assigned_courier_targets() {
        let courier = UserId::new();
        let actor = Actor::courier(courier);
        let o = order(OrderStatus::Accepted, UserId::new(), Some(courier));

        for target in OrderStatus::ALL {
            let result = authorize_transition(&actor, &o, false, target);
            assert_eq!(
                result.is_ok(),
                COURIER_TARGETS.contains(&target),
                "courier -> {}",
                target
            );
        }
    }

    #[test]
    fn test_assigned_courier_may_deliver_before_transit() {
        let courier = UserId::new();
        let o = order(OrderStatus::Accepted, UserId::new(), Some(courier));
        let guard =
            authorize_transition(&Actor::courier(courier), &o, false, OrderStatus::Delivered)
                .unwrap();
        assert_eq!(guard, OrderGuard::any().assigned_to(courier));
    }

    #[test]
    fn test_other_courier_forbidden() {
        let o = order(OrderStatus::Accepted, UserId::new(), Some(UserId::new()));
        assert!(is_forbidden(authorize_transition(
            &Actor::courier(UserId::new()),
            &o,
            false,
            OrderStatus::InTransit
        )));
    }

    #[test]
    fn test_client_cancel_only_early() {
        let client = UserId::new();
        let actor = Actor::client(client);

        for status in OrderStatus::ALL {
            let o = order(status, client, None);
            let result = authorize_transition(&actor, &o, false, OrderStatus::Canceled);
            assert_eq!(
                result.is_ok(),
                OrderStatus::CLIENT_EDITABLE.contains(&status),
                "client cancel from {}",
                status
            );
        }
    }

    #[test]
    fn test_client_cannot_deliver() {
        let client = UserId::new();
        let o = order(OrderStatus::Created, client, None);
        assert!(is_forbidden(authorize_transition(
            &Actor::client(client),
            &o,
            false,
            OrderStatus::Delivered
        )));
    }

    #[test]
    fn test_other_client_forbidden() {
        let o = order(OrderStatus::Created, UserId::new(), None);
        assert!(is_forbidden(authorize_transition(
            &Actor::client(UserId::new()),
            &o,
            false,
            OrderStatus::Canceled
        )));
    }

    #[test]
    fn test_admin_never_transitions() {
        let o = order(OrderStatus::Paid, UserId::new(), None);
        for target in OrderStatus::ALL {
            assert!(is_forbidden(authorize_transition(
                &Actor::admin(UserId::new()),
                &o,
                true,
                target
            )));
        }
    }

    #[test]
    fn test_can_view() {
        let client = UserId::new();
        let courier = UserId::new();
        let o = order(OrderStatus::Accepted, client, Some(courier));

        assert!(can_view(&Actor::client(client), &o, false));
        assert!(can_view(&Actor::courier(courier), &o, false));
        assert!(can_view(&Actor::restaurant(UserId::new()), &o, true));
        assert!(can_view(&Actor::admin(UserId::new()), &o, false));

        assert!(!can_view(&Actor::client(UserId::new()), &o, false));
        assert!(!can_view(&Actor::courier(UserId::new()), &o, false));
        assert!(!can_view(&Actor::restaurant(UserId::new()), &o, false));
    }
}
