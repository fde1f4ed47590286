use super::Role;
use crate::common::errors::DomainError;
use crate::common::UserId;

/// The authenticated caller of a domain action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn client(id: UserId) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn courier(id: UserId) -> Self {
        Self::new(id, Role::Courier)
    }

    pub fn restaurant(id: UserId) -> Self {
        Self::new(id, Role::Restaurant)
    }

    pub fn admin(id: UserId) -> Self {
        Self::new(id, Role::Admin)
    }

    /// Fails with `Forbidden` unless the actor holds `role`.
    pub fn require(&self, role: Role) -> Result<(), DomainError> {
        if self.role == role {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!("{} role required", role)))
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
