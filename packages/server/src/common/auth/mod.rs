/// Identity as seen by the domain layer.
///
/// Tokens are verified at the HTTP edge; from there on every action receives
/// an `Actor` carrying the caller's id and role:
///
/// ```rust,ignore
/// actor.require(Role::Courier)?;
/// ```
mod actor;
mod role;

pub use actor::Actor;
pub use role::Role;
