use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{Dish, Restaurant};
use crate::common::{DishId, RestaurantId};

/// Lookup of restaurants and dishes by id.
#[async_trait]
pub trait RestaurantDirectory: Send + Sync {
    async fn find_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>>;

    /// Restaurants for the given ids; unknown ids are skipped.
    async fn find_restaurants(&self, ids: &[RestaurantId]) -> Result<Vec<Restaurant>>;

    /// Dishes for the given ids; unknown ids are skipped.
    async fn find_dishes(&self, ids: &[DishId]) -> Result<Vec<Dish>>;
}

// =============================================================================
// Postgres
// =============================================================================

pub struct PgRestaurantDirectory {
    pool: PgPool,
}

impl PgRestaurantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RestaurantDirectory for PgRestaurantDirectory {
    async fn find_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        sqlx::query_as::<_, Restaurant>(
            "SELECT id, owner_id, name, latitude, longitude, is_active
             FROM restaurants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_restaurants(&self, ids: &[RestaurantId]) -> Result<Vec<Restaurant>> {
        sqlx::query_as::<_, Restaurant>(
            "SELECT id, owner_id, name, latitude, longitude, is_active
             FROM restaurants WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    async fn find_dishes(&self, ids: &[DishId]) -> Result<Vec<Dish>> {
        sqlx::query_as::<_, Dish>(
            "SELECT id, restaurant_id, name, price, is_available
             FROM dishes WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Directory held in process memory, seeded by the caller.
#[derive(Default)]
pub struct MemoryRestaurantDirectory {
    restaurants: RwLock<HashMap<RestaurantId, Restaurant>>,
    dishes: RwLock<HashMap<DishId, Dish>>,
}

impl MemoryRestaurantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_restaurant(&self, restaurant: Restaurant) {
        self.restaurants
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(restaurant.id, restaurant);
    }

    pub fn upsert_dish(&self, dish: Dish) {
        self.dishes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(dish.id, dish);
    }
}

#[async_trait]
impl RestaurantDirectory for MemoryRestaurantDirectory {
    async fn find_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        Ok(self
            .restaurants
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned())
    }

    async fn find_restaurants(&self, ids: &[RestaurantId]) -> Result<Vec<Restaurant>> {
        let restaurants = self.restaurants.read().unwrap_or_else(|e| e.into_inner());
        Ok(ids.iter().filter_map(|id| restaurants.get(id).cloned()).collect())
    }

    async fn find_dishes(&self, ids: &[DishId]) -> Result<Vec<Dish>> {
        let dishes = self.dishes.read().unwrap_or_else(|e| e.into_inner());
        Ok(ids.iter().filter_map(|id| dishes.get(id).cloned()).collect())
    }
}
