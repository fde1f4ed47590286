//! Orders domain - order entity, lifecycle state machine, and event feed
//!
//! Architecture:
//!   HTTP handler → action / lifecycle → OrderStore compare-and-set → EventBus

pub mod actions;
pub mod events;
pub mod lifecycle;
pub mod models;
pub mod store;

pub use events::{order_topic, publish_order_event, OrderEvent};
pub use lifecycle::request_transition;
pub use models::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};
pub use store::{CourierGuard, MemoryOrderStore, OrderGuard, OrderStore, OrderUpdate, PgOrderStore};
