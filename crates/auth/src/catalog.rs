//! Static privilege catalog.
//!
//! Roles can only be granted keys listed here, and the gate refuses to check a
//! key that is not listed here.

use serde::Serialize;

use crate::Permission;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PrivilegeGroup {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PrivilegeDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub group: &'static str,
    pub description: &'static str,
}

impl PrivilegeDefinition {
    pub fn permission(&self) -> Permission {
        Permission::from_static(self.key)
    }
}

pub static PRIVILEGE_GROUPS: &[PrivilegeGroup] = &[
    PrivilegeGroup { id: "USERS", name: "User Management" },
    PrivilegeGroup { id: "ROLES", name: "Role Management" },
    PrivilegeGroup { id: "CATEGORIES", name: "Category Management" },
    PrivilegeGroup { id: "AUDITLOGS", name: "Audit Logs" },
];

pub static PRIVILEGES: &[PrivilegeDefinition] = &[
    PrivilegeDefinition {
        key: "user_view",
        name: "User View",
        group: "USERS",
        description: "Can list and view users.",
    },
    PrivilegeDefinition {
        key: "user_add",
        name: "User Add",
        group: "USERS",
        description: "Can create new users.",
    },
    PrivilegeDefinition {
        key: "user_update",
        name: "User Update",
        group: "USERS",
        description: "Can update user details and role assignments.",
    },
    PrivilegeDefinition {
        key: "user_delete",
        name: "User Delete",
        group: "USERS",
        description: "Can delete users.",
    },
    PrivilegeDefinition {
        key: "role_view",
        name: "Role View",
        group: "ROLES",
        description: "Can list roles and their privileges.",
    },
    PrivilegeDefinition {
        key: "role_add",
        name: "Role Add",
        group: "ROLES",
        description: "Can create new roles.",
    },
    PrivilegeDefinition {
        key: "role_update",
        name: "Role Update",
        group: "ROLES",
        description: "Can rename roles and replace their privileges.",
    },
    PrivilegeDefinition {
        key: "role_delete",
        name: "Role Delete",
        group: "ROLES",
        description: "Can delete roles.",
    },
    PrivilegeDefinition {
        key: "category_view",
        name: "Category View",
        group: "CATEGORIES",
        description: "Can list categories.",
    },
    PrivilegeDefinition {
        key: "category_add",
        name: "Category Add",
        group: "CATEGORIES",
        description: "Can create new categories.",
    },
    PrivilegeDefinition {
        key: "category_update",
        name: "Category Update",
        group: "CATEGORIES",
        description: "Can update categories.",
    },
    PrivilegeDefinition {
        key: "category_delete",
        name: "Category Delete",
        group: "CATEGORIES",
        description: "Can delete categories.",
    },
    PrivilegeDefinition {
        key: "auditlog_view",
        name: "AuditLog View",
        group: "AUDITLOGS",
        description: "Can read the audit log.",
    },
];

pub fn lookup(key: &str) -> Option<&'static PrivilegeDefinition> {
    PRIVILEGES.iter().find(|def| def.key == key)
}

/// Every key in the catalog (used to seed the super admin role).
pub fn all_permissions() -> Vec<Permission> {
    PRIVILEGES.iter().map(PrivilegeDefinition::permission).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn keys_are_unique() {
        let keys: HashSet<_> = PRIVILEGES.iter().map(|d| d.key).collect();
        assert_eq!(keys.len(), PRIVILEGES.len());
    }

    #[test]
    fn every_privilege_belongs_to_a_known_group() {
        for def in PRIVILEGES {
            assert!(
                PRIVILEGE_GROUPS.iter().any(|g| g.id == def.group),
                "{} has unknown group {}",
                def.key,
                def.group
            );
        }
    }

    #[test]
    fn all_permissions_covers_catalog() {
        assert_eq!(all_permissions().len(), PRIVILEGES.len());
    }
}
