//! Test fixtures for creating test data.
//!
//! In-memory fixtures seed the harness's restaurant directory; the `pg_*`
//! fixtures insert rows directly for Postgres-backed tests.

use anyhow::Result;
use rust_decimal::Decimal;
use server_core::common::{Actor, DishId, OrderId, RestaurantId, Role, UserId};
use server_core::domains::orders::actions::{create_order, CartLine, CreateOrderInput};
use server_core::domains::orders::{request_transition, Order, OrderStatus};
use server_core::domains::restaurants::{Dish, Restaurant};
use sqlx::PgPool;

use super::TestHarness;

pub fn price(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

/// A restaurant with one available dish.
pub struct Menu {
    pub owner: Actor,
    pub restaurant: Restaurant,
    pub dish: Dish,
}

impl Menu {
    pub fn line(&self, qty: i32) -> CartLine {
        CartLine {
            dish_id: self.dish.id,
            qty,
        }
    }
}

pub fn seed_restaurant(
    harness: &TestHarness,
    location: Option<(f64, f64)>,
) -> Restaurant {
    let restaurant = Restaurant {
        id: RestaurantId::new(),
        owner_id: UserId::new(),
        name: "Test Kitchen".to_string(),
        latitude: location.map(|l| l.0),
        longitude: location.map(|l| l.1),
        is_active: true,
    };
    harness.directory.upsert_restaurant(restaurant.clone());
    restaurant
}

pub fn seed_dish(harness: &TestHarness, restaurant: &Restaurant, name: &str, cost: &str) -> Dish {
    let dish = Dish {
        id: DishId::new(),
        restaurant_id: restaurant.id,
        name: name.to_string(),
        price: price(cost),
        is_available: true,
    };
    harness.directory.upsert_dish(dish.clone());
    dish
}

/// Restaurant at `location` serving a 12.50 burger.
pub fn seed_menu(harness: &TestHarness, location: Option<(f64, f64)>) -> Menu {
    let restaurant = seed_restaurant(harness, location);
    let dish = seed_dish(harness, &restaurant, "Burger", "12.50");
    Menu {
        owner: Actor::restaurant(restaurant.owner_id),
        restaurant,
        dish,
    }
}

/// Places an order of `qty` burgers as `client`.
pub async fn place_order(harness: &TestHarness, menu: &Menu, client: Actor, qty: i32) -> Order {
    create_order(
        &harness.deps,
        client,
        CreateOrderInput {
            restaurant_id: menu.restaurant.id,
            items: vec![menu.line(qty)],
        },
    )
    .await
    .expect("Failed to place order")
}

/// Places an order and has the restaurant mark it ready for pickup.
pub async fn ready_order(harness: &TestHarness, menu: &Menu, client: Actor) -> Order {
    let order = place_order(harness, menu, client, 1).await;
    request_transition(&harness.deps, menu.owner, order.id, OrderStatus::ReadyForPickup)
        .await
        .expect("Failed to mark order ready")
}

pub async fn current(harness: &TestHarness, order_id: OrderId) -> Order {
    harness
        .deps
        .orders
        .find(order_id)
        .await
        .expect("store error")
        .expect("order missing")
}

// =============================================================================
// Postgres fixtures
// =============================================================================

pub async fn pg_user(pool: &PgPool, role: Role) -> Result<Actor> {
    let id = UserId::new();
    sqlx::query("INSERT INTO users (id, email, role) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(format!("{}@example.test", id))
        .bind(role)
        .execute(pool)
        .await?;
    Ok(Actor::new(id, role))
}

pub async fn pg_restaurant(
    pool: &PgPool,
    owner: &Actor,
    location: Option<(f64, f64)>,
) -> Result<Restaurant> {
    let restaurant = sqlx::query_as::<_, Restaurant>(
        r#"INSERT INTO restaurants (id, owner_id, name, latitude, longitude)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id, owner_id, name, latitude, longitude, is_active"#,
    )
    .bind(RestaurantId::new())
    .bind(owner.id)
    .bind("Pg Kitchen")
    .bind(location.map(|l| l.0))
    .bind(location.map(|l| l.1))
    .fetch_one(pool)
    .await?;
    Ok(restaurant)
}

pub async fn pg_dish(pool: &PgPool, restaurant: &Restaurant, cost: &str) -> Result<Dish> {
    let dish = sqlx::query_as::<_, Dish>(
        r#"INSERT INTO dishes (id, restaurant_id, name, price)
           VALUES ($1, $2, 'Noodles', $3)
           RETURNING id, restaurant_id, name, price, is_available"#,
    )
    .bind(DishId::new())
    .bind(restaurant.id)
    .bind(price(cost))
    .fetch_one(pool)
    .await?;
    Ok(dish)
}
