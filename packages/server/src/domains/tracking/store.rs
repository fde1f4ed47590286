use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::models::LocationSample;
use crate::common::{GeoPoint, LocationSampleId, UserId};

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Appends a sample stamped with the server clock, clamped so it never
    /// precedes the courier's latest sample.
    async fn append(&self, courier_id: UserId, point: GeoPoint) -> Result<LocationSample>;

    async fn most_recent(&self, courier_id: UserId) -> Result<Option<LocationSample>>;
}

// =============================================================================
// Postgres
// =============================================================================

pub struct PgLocationStore {
    pool: PgPool,
}

impl PgLocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationStore for PgLocationStore {
    async fn append(&self, courier_id: UserId, point: GeoPoint) -> Result<LocationSample> {
        sqlx::query_as::<_, LocationSample>(
            "INSERT INTO courier_locations (id, courier_id, latitude, longitude, recorded_at)
             SELECT $1, $2, $3, $4, GREATEST(
                 NOW(),
                 COALESCE(
                     (SELECT MAX(recorded_at) FROM courier_locations WHERE courier_id = $2),
                     NOW()
                 )
             )
             RETURNING id, courier_id, latitude, longitude, recorded_at",
        )
        .bind(LocationSampleId::new())
        .bind(courier_id)
        .bind(point.lat)
        .bind(point.lon)
        .fetch_one(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn most_recent(&self, courier_id: UserId) -> Result<Option<LocationSample>> {
        sqlx::query_as::<_, LocationSample>(
            "SELECT id, courier_id, latitude, longitude, recorded_at
             FROM courier_locations
             WHERE courier_id = $1
             ORDER BY recorded_at DESC, id DESC
             LIMIT 1",
        )
        .bind(courier_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct MemoryLocationStore {
    samples: Mutex<HashMap<UserId, Vec<LocationSample>>>,
}

impl MemoryLocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sample recorded for a courier, oldest first.
    pub fn history(&self, courier_id: UserId) -> Vec<LocationSample> {
        self.samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&courier_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn append(&self, courier_id: UserId, point: GeoPoint) -> Result<LocationSample> {
        let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
        let history = samples.entry(courier_id).or_default();

        let now = Utc::now();
        let recorded_at = history
            .last()
            .map_or(now, |last| last.recorded_at.max(now));

        let sample = LocationSample {
            id: LocationSampleId::new(),
            courier_id,
            latitude: point.lat,
            longitude: point.lon,
            recorded_at,
        };
        history.push(sample.clone());
        Ok(sample)
    }

    async fn most_recent(&self, courier_id: UserId) -> Result<Option<LocationSample>> {
        Ok(self
            .samples
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&courier_id)
            .and_then(|history| history.iter().max_by_key(|s| s.recorded_at).cloned()))
    }
}
