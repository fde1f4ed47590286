// HTTP routes
pub mod courier;
pub mod health;
pub mod orders;
pub mod payments;
pub mod stream;

pub use courier::*;
pub use health::*;
pub use orders::*;
pub use payments::*;
pub use stream::*;
