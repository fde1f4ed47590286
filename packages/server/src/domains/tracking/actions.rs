use tracing::{debug, info, warn};

use super::models::LocationSample;
use crate::common::{Actor, DomainError, DomainResult, GeoPoint, Role, UserId};
use crate::domains::orders::events::{publish_order_event, OrderEvent};
use crate::domains::orders::models::OrderStatus;
use crate::domains::orders::store::{OrderGuard, OrderUpdate};
use crate::kernel::ServerDeps;

/// Stores a courier's position and fans it out to their active orders.
///
/// Side effects, in order:
/// 1. each of the courier's `accepted` orders moves to `in_transit` (one
///    `in_transit` event per order that actually moved)
/// 2. each `accepted` or `in_transit` order gets a `courier_location` event
pub async fn record_location(
    deps: &ServerDeps,
    actor: Actor,
    lat: f64,
    lon: f64,
) -> DomainResult<LocationSample> {
    actor.require(Role::Courier)?;
    let point = GeoPoint::new(lat, lon)?;

    let sample = deps.locations.append(actor.id, point).await?;
    debug!(courier_id = %actor.id, lat, lon, "Location recorded");

    promote_accepted_orders(deps, actor.id).await?;

    let en_route = deps
        .orders
        .list_for_courier(actor.id, &OrderStatus::EN_ROUTE)
        .await?;
    for order in en_route {
        publish_order_event(
            deps.events.as_ref(),
            OrderEvent::CourierLocation {
                order_id: order.id,
                lat: sample.latitude,
                lon: sample.longitude,
                ts: sample.recorded_at,
            },
        )
        .await;
    }

    Ok(sample)
}

/// First ping after pickup starts the trip. The guarded write makes the
/// promotion happen once even when pings race.
async fn promote_accepted_orders(deps: &ServerDeps, courier_id: UserId) -> DomainResult<()> {
    let accepted = deps
        .orders
        .list_for_courier(courier_id, &[OrderStatus::Accepted])
        .await?;

    let guard = OrderGuard::in_statuses(&[OrderStatus::Accepted]).assigned_to(courier_id);
    let update = OrderUpdate::status(OrderStatus::InTransit);

    for order in accepted {
        match deps.orders.compare_and_set(order.id, &guard, &update).await {
            Ok(Some(_)) => {
                info!(order_id = %order.id, courier_id = %courier_id, "Order in transit");
                publish_order_event(
                    deps.events.as_ref(),
                    OrderEvent::InTransit { order_id: order.id },
                )
                .await;
            }
            Ok(None) => debug!(order_id = %order.id, "Order already moved on"),
            Err(e) => warn!(order_id = %order.id, error = %e, "Failed to promote order"),
        }
    }
    Ok(())
}

/// Latest sample for `courier_id`, visible to that courier and to admins.
pub async fn most_recent_location(
    deps: &ServerDeps,
    actor: Actor,
    courier_id: UserId,
) -> DomainResult<Option<LocationSample>> {
    let own = actor.role == Role::Courier && actor.id == courier_id;
    if !own && !actor.is_admin() {
        return Err(DomainError::forbidden("cannot read another courier's location"));
    }
    Ok(deps.locations.most_recent(courier_id).await?)
}
