//! Tracking domain - courier position samples
//!
//! Samples are append-only. A courier's current location is derived as the
//! sample with the greatest timestamp; it is never stored separately.

pub mod actions;
pub mod models;
pub mod store;

pub use actions::{most_recent_location, record_location};
pub use models::LocationSample;
pub use store::{LocationStore, MemoryLocationStore, PgLocationStore};
