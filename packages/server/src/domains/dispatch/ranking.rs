//! Distance ranking strategies.
//!
//! Both strategies return every candidate exactly once, nearest first, with
//! unknown distances last and ties kept in incoming order.

use std::cmp::Ordering;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{GeoPoint, RestaurantId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankCandidate {
    pub restaurant_id: RestaurantId,
    pub location: Option<GeoPoint>,
}

/// Position of a candidate in the input slice and its distance from origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub index: usize,
    pub distance_km: Option<f64>,
}

#[async_trait]
pub trait GeoRanking: Send + Sync {
    async fn rank(&self, origin: GeoPoint, candidates: &[RankCandidate]) -> Result<Vec<Ranked>>;
}

fn nearest_first(a: &Ranked, b: &Ranked) -> Ordering {
    match (a.distance_km, b.distance_km) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// In-process great-circle ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineRanking;

#[async_trait]
impl GeoRanking for HaversineRanking {
    async fn rank(&self, origin: GeoPoint, candidates: &[RankCandidate]) -> Result<Vec<Ranked>> {
        let mut ranked: Vec<Ranked> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| Ranked {
                index,
                distance_km: candidate.location.map(|loc| origin.distance_km(&loc)),
            })
            .collect();
        // Stable: equal distances keep their incoming order
        ranked.sort_by(nearest_first);
        Ok(ranked)
    }
}

/// Ranking computed by the database's `haversine_distance` function against
/// the restaurants table. Candidate locations are ignored; coordinates come
/// from the restaurant rows.
pub struct PostgresGeoRanking {
    pool: PgPool,
}

impl PostgresGeoRanking {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeoRanking for PostgresGeoRanking {
    async fn rank(&self, origin: GeoPoint, candidates: &[RankCandidate]) -> Result<Vec<Ranked>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let restaurant_ids: Vec<RestaurantId> =
            candidates.iter().map(|c| c.restaurant_id).collect();

        let rows: Vec<(i64, Option<f64>)> = sqlx::query_as(
            "SELECT (c.ord - 1)::BIGINT AS idx,
                    haversine_distance($1, $2, r.latitude, r.longitude) AS distance_km
             FROM UNNEST($3::uuid[]) WITH ORDINALITY AS c(restaurant_id, ord)
             LEFT JOIN restaurants r ON r.id = c.restaurant_id
             ORDER BY distance_km ASC NULLS LAST, c.ord ASC",
        )
        .bind(origin.lat)
        .bind(origin.lon)
        .bind(&restaurant_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(idx, distance_km)| {
                let index = usize::try_from(idx)?;
                Ok(Ranked { index, distance_km })
            })
            .collect()
    }
}
