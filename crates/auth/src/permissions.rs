use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::DomainError;

use crate::catalog;

/// Privilege key (e.g. `user_add`).
///
/// Keys are opaque strings on the wire; [`Permission::parse`] is the only way to
/// turn untrusted input into a key, and it only accepts catalog members.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Wrap a key without checking the catalog (e.g. a value read back from storage).
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Accept a key only if it is part of the static catalog.
    pub fn parse(key: &str) -> Result<Self, DomainError> {
        let key = key.trim();
        catalog::lookup(key)
            .map(|def| def.permission())
            .ok_or_else(|| DomainError::validation(format!("unknown permission '{key}'")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_cataloged(&self) -> bool {
        catalog::lookup(self.as_str()).is_some()
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const USER_VIEW: Permission = Permission::from_static("user_view");
pub const USER_ADD: Permission = Permission::from_static("user_add");
pub const USER_UPDATE: Permission = Permission::from_static("user_update");
pub const USER_DELETE: Permission = Permission::from_static("user_delete");

pub const ROLE_VIEW: Permission = Permission::from_static("role_view");
pub const ROLE_ADD: Permission = Permission::from_static("role_add");
pub const ROLE_UPDATE: Permission = Permission::from_static("role_update");
pub const ROLE_DELETE: Permission = Permission::from_static("role_delete");

pub const CATEGORY_VIEW: Permission = Permission::from_static("category_view");
pub const CATEGORY_ADD: Permission = Permission::from_static("category_add");
pub const CATEGORY_UPDATE: Permission = Permission::from_static("category_update");
pub const CATEGORY_DELETE: Permission = Permission::from_static("category_delete");

pub const AUDITLOG_VIEW: Permission = Permission::from_static("auditlog_view");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_catalog_keys() {
        assert_eq!(Permission::parse(" user_view ").unwrap(), USER_VIEW);
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        let err = Permission::parse("user_nuke").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn every_constant_is_cataloged() {
        for p in [
            USER_VIEW, USER_ADD, USER_UPDATE, USER_DELETE, ROLE_VIEW, ROLE_ADD, ROLE_UPDATE,
            ROLE_DELETE, CATEGORY_VIEW, CATEGORY_ADD, CATEGORY_UPDATE, CATEGORY_DELETE,
            AUDITLOG_VIEW,
        ] {
            assert!(p.is_cataloged(), "{p} missing from catalog");
        }
    }
}
