//! Order domain actions - business logic functions
//!
//! Actions are async functions called directly from HTTP handlers. They
//! validate before mutating, perform one atomic store write, then publish.

mod cart;
pub mod create_order;
pub mod get_order;
pub mod list_orders;
pub mod update_items;

pub use cart::CartLine;
pub use create_order::{create_order, CreateOrderInput};
pub use get_order::{ensure_can_view, get_order_detail};
pub use list_orders::list_my_orders;
pub use update_items::update_items;
