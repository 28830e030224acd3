use std::collections::BTreeSet;

use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: no roles assigned")]
    NoRoles,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),

    #[error("forbidden: '{0}' is not a cataloged permission")]
    UnknownPermission(String),
}

/// Union of the privilege keys attached to every role a user holds.
///
/// Keys outside the catalog are dropped so they can never satisfy a check.
pub fn effective_privileges<I>(assigned: I) -> BTreeSet<Permission>
where
    I: IntoIterator<Item = Permission>,
{
    assigned.into_iter().filter(Permission::is_cataloged).collect()
}

/// Decide whether `principal` may exercise `required`.
///
/// - No IO
/// - No panics
/// - Missing role or privilege data is a denial, never an implicit allow
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if !required.is_cataloged() {
        return Err(AuthzError::UnknownPermission(required.as_str().to_string()));
    }

    if principal.roles.is_empty() {
        return Err(AuthzError::NoRoles);
    }

    if principal.has_privilege(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use warden_core::{RoleId, UserId};

    use super::*;
    use crate::catalog::PRIVILEGES;
    use crate::permissions::{ROLE_ADD, USER_ADD, USER_VIEW};

    fn principal(roles: usize, privileges: impl IntoIterator<Item = Permission>) -> Principal {
        Principal {
            user_id: UserId::new(),
            email: "a@x.com".to_string(),
            roles: (0..roles).map(|_| RoleId::new()).collect(),
            privileges: effective_privileges(privileges),
        }
    }

    #[test]
    fn granted_when_privilege_present() {
        let p = principal(1, [USER_VIEW]);
        assert_eq!(authorize(&p, &USER_VIEW), Ok(()));
    }

    #[test]
    fn forbidden_when_privilege_missing() {
        let p = principal(1, [USER_VIEW]);
        assert_eq!(authorize(&p, &USER_ADD), Err(AuthzError::Forbidden("user_add".into())));
    }

    #[test]
    fn no_roles_is_forbidden_even_with_stray_privileges() {
        let p = principal(0, [USER_VIEW]);
        assert_eq!(authorize(&p, &USER_VIEW), Err(AuthzError::NoRoles));
    }

    #[test]
    fn uncataloged_requirement_is_never_granted() {
        let p = principal(1, [USER_VIEW]);
        let bogus = Permission::from_static("everything");
        assert!(matches!(authorize(&p, &bogus), Err(AuthzError::UnknownPermission(_))));
    }

    #[test]
    fn union_across_roles_deduplicates() {
        let set = effective_privileges([USER_VIEW, ROLE_ADD, USER_VIEW]);
        assert_eq!(set.len(), 2);
    }

    fn catalog_subset() -> impl Strategy<Value = Vec<Vec<Permission>>> {
        let key = (0..PRIVILEGES.len()).prop_map(|i| PRIVILEGES[i].permission());
        prop::collection::vec(prop::collection::vec(key, 0..6), 1..5)
    }

    proptest! {
        #[test]
        fn effective_set_is_exactly_the_union_of_role_sets(roles in catalog_subset()) {
            let effective = effective_privileges(roles.iter().flatten().cloned());

            for role in &roles {
                for p in role {
                    prop_assert!(effective.contains(p));
                }
            }
            for p in &effective {
                prop_assert!(roles.iter().any(|r| r.contains(p)));
            }

            let p = Principal {
                user_id: UserId::new(),
                email: "p@x.com".into(),
                roles: roles.iter().map(|_| RoleId::new()).collect(),
                privileges: effective.clone(),
            };
            for def in PRIVILEGES {
                let required = def.permission();
                prop_assert_eq!(authorize(&p, &required).is_ok(), effective.contains(&required));
            }
        }
    }
}
