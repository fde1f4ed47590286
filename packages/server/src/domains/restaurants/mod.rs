//! Restaurants domain - read model of restaurants and their menus
//!
//! Menus are managed elsewhere; the dispatch core only reads them to validate
//! carts, snapshot prices, and locate pickups.

pub mod directory;
pub mod models;

pub use directory::{MemoryRestaurantDirectory, PgRestaurantDirectory, RestaurantDirectory};
pub use models::{Dish, Restaurant, RestaurantSummary};
