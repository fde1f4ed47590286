pub mod order;
pub mod status;

pub use order::{items_total, NewOrder, NewOrderItem, Order, OrderItem};
pub use status::OrderStatus;
