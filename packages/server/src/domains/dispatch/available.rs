use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::ranking::RankCandidate;
use crate::common::geo::round_km;
use crate::common::{Actor, DomainResult, OrderId, RestaurantId, Role};
use crate::domains::orders::models::{Order, OrderStatus};
use crate::domains::restaurants::Restaurant;
use crate::kernel::ServerDeps;

/// How many claimable orders are considered per poll.
pub const CANDIDATE_LIMIT: i64 = 200;

/// How many are returned.
pub const RESULT_LIMIT: usize = 50;

/// A claimable order as shown to couriers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableOrder {
    pub id: OrderId,
    pub restaurant_id: RestaurantId,
    pub restaurant_name: String,
    pub total: Decimal,
    pub status: OrderStatus,
    /// Kilometers from the courier's last known position, 3 decimals.
    pub distance_km: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl AvailableOrder {
    fn new(order: &Order, restaurant: Option<&Restaurant>, distance_km: Option<f64>) -> Self {
        Self {
            id: order.id,
            restaurant_id: order.restaurant_id,
            restaurant_name: restaurant.map(|r| r.name.clone()).unwrap_or_default(),
            total: order.total,
            status: order.status,
            distance_km: distance_km.map(round_km),
            created_at: order.created_at,
        }
    }
}

/// Unassigned orders ready for a courier.
///
/// With a known courier position the list is nearest-pickup first (unknown
/// restaurant coordinates last); without one it is newest first.
pub async fn available_orders(deps: &ServerDeps, actor: Actor) -> DomainResult<Vec<AvailableOrder>> {
    actor.require(Role::Courier)?;

    let candidates = deps.orders.list_claimable(CANDIDATE_LIMIT).await?;
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let mut restaurant_ids: Vec<RestaurantId> = candidates.iter().map(|o| o.restaurant_id).collect();
    restaurant_ids.sort();
    restaurant_ids.dedup();
    let restaurants: HashMap<RestaurantId, Restaurant> = deps
        .restaurants
        .find_restaurants(&restaurant_ids)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect();

    let Some(position) = deps.locations.most_recent(actor.id).await? else {
        debug!(courier_id = %actor.id, "No known position, listing newest first");
        return Ok(candidates
            .iter()
            .take(RESULT_LIMIT)
            .map(|o| AvailableOrder::new(o, restaurants.get(&o.restaurant_id), None))
            .collect());
    };

    let rank_input: Vec<RankCandidate> = candidates
        .iter()
        .map(|o| RankCandidate {
            restaurant_id: o.restaurant_id,
            location: restaurants.get(&o.restaurant_id).and_then(Restaurant::location),
        })
        .collect();
    let ranked = deps.geo.rank(position.point(), &rank_input).await?;

    Ok(ranked
        .into_iter()
        .filter_map(|r| candidates.get(r.index).map(|o| (o, r.distance_km)))
        .take(RESULT_LIMIT)
        .map(|(o, distance)| AvailableOrder::new(o, restaurants.get(&o.restaurant_id), distance))
        .collect())
}
