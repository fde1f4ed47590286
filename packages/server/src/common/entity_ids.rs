//! Typed ID definitions for all domain entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker for users of any role (clients, restaurant owners, couriers, admins).
pub struct User;

pub struct Order;

pub struct OrderItem;

pub struct Restaurant;

/// Marker for menu entries.
pub struct Dish;

/// Marker for courier position samples.
pub struct LocationSample;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type UserId = Id<User>;
pub type OrderId = Id<Order>;
pub type OrderItemId = Id<OrderItem>;
pub type RestaurantId = Id<Restaurant>;
pub type DishId = Id<Dish>;
pub type LocationSampleId = Id<LocationSample>;
