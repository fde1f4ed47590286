//! Auth domain - bearer token issuing and verification
//!
//! Users are registered by the identity provider; this service only signs
//! and checks tokens carrying `{user_id, role}`.

pub mod jwt;

pub use jwt::{Claims, JwtService};
