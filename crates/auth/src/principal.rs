use std::collections::BTreeSet;

use warden_core::{RoleId, UserId};

use crate::Permission;

/// A fully resolved caller for authorization decisions.
///
/// Built by the authentication stage from a verified token plus a live lookup
/// of the user, their role assignments and those roles' privilege keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub email: String,
    pub roles: Vec<RoleId>,
    pub privileges: BTreeSet<Permission>,
}

impl Principal {
    pub fn has_privilege(&self, permission: &Permission) -> bool {
        self.privileges.contains(permission)
    }
}
