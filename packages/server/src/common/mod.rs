// Common types and utilities shared across the application

pub mod auth;
pub mod entity_ids;
pub mod errors;
pub mod geo;
pub mod id;
pub mod pagination;

pub use auth::{Actor, Role};
pub use entity_ids::*;
pub use errors::{DomainError, DomainResult};
pub use geo::GeoPoint;
pub use id::Id;
pub use pagination::{Page, PageParams, PageQuery};
