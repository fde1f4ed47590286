use rust_decimal::Decimal;
use serde::Serialize;

use crate::common::{DishId, GeoPoint, RestaurantId, UserId};

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_active: bool,
}

impl Restaurant {
    pub fn location(&self) -> Option<GeoPoint> {
        GeoPoint::from_columns(self.latitude, self.longitude)
    }

    pub fn summary(&self) -> RestaurantSummary {
        RestaurantSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// The `{id, name}` pair embedded in order payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestaurantSummary {
    pub id: RestaurantId,
    pub name: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Dish {
    pub id: DishId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
}
