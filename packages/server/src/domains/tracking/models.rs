use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::common::{GeoPoint, LocationSampleId, UserId};

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize)]
pub struct LocationSample {
    pub id: LocationSampleId,
    pub courier_id: UserId,
    pub latitude: f64,
    pub longitude: f64,
    /// Server-assigned; never earlier than the courier's previous sample.
    pub recorded_at: DateTime<Utc>,
}

impl LocationSample {
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}
