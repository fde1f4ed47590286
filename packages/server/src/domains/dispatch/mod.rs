//! Dispatch domain - courier-facing order discovery and the claim race
//!
//! Couriers poll `available_orders` (ranked by distance to pickup when their
//! position is known) and claim with `accept_order`. Exactly one of any
//! number of concurrent claims on an order wins.

pub mod accept;
pub mod available;
pub mod ranking;

pub use accept::accept_order;
pub use available::{available_orders, AvailableOrder, CANDIDATE_LIMIT, RESULT_LIMIT};
pub use ranking::{GeoRanking, HaversineRanking, PostgresGeoRanking, RankCandidate, Ranked};
