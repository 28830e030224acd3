use std::collections::BTreeSet;

use warden_auth::{Permission, Principal};
use warden_core::{RoleId, UserId};

/// Authenticated caller for a request (identity + live roles and privileges).
///
/// Inserted by the auth middleware after the user has been re-read from the
/// store, so it reflects deactivation and role changes immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn email(&self) -> &str {
        &self.principal.email
    }

    pub fn roles(&self) -> &[RoleId] {
        &self.principal.roles
    }

    pub fn privileges(&self) -> &BTreeSet<Permission> {
        &self.principal.privileges
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
