// Domain modules - each bounded context owns its models, storage, and actions

pub mod auth;
pub mod dispatch;
pub mod orders;
pub mod payments;
pub mod restaurants;
pub mod tracking;
