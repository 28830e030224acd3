//! Persisted records and the query/patch shapes stores accept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::Permission;
use warden_core::{AuditEntryId, CategoryId, Entity, RoleId, UserId};

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for UserRecord {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring match.
    pub email: Option<String>,
    /// Case-insensitive substring match.
    pub first_name: Option<String>,
    pub is_active: Option<bool>,
}

impl UserFilter {
    pub fn matches(&self, user: &UserRecord) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_deref()
                .map(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(true)
        }

        contains(&user.email, &self.email)
            && contains(&user.first_name, &self.first_name)
            && self.is_active.map(|a| a == user.is_active).unwrap_or(true)
    }
}

/// Edge between a user and one of their roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRoleLink {
    pub user_id: UserId,
    pub role_id: RoleId,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRecord {
    #[serde(rename = "_id")]
    pub id: RoleId,
    pub role_name: String,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for RoleRecord {
    type Id = RoleId;

    fn id(&self) -> RoleId {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RolePatch {
    pub role_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Privilege assignment row (role → privilege key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePrivilege {
    pub role_id: RoleId,
    pub permission: Permission,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryRecord {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub name: String,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CategoryRecord {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
    Debug,
    Verbose,
    Http,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Info => "info",
            AuditLevel::Warn => "warn",
            AuditLevel::Error => "error",
            AuditLevel::Debug => "debug",
            AuditLevel::Verbose => "verbose",
            AuditLevel::Http => "http",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(AuditLevel::Info),
            "warn" => Some(AuditLevel::Warn),
            "error" => Some(AuditLevel::Error),
            "debug" => Some(AuditLevel::Debug),
            "verbose" => Some(AuditLevel::Verbose),
            "http" => Some(AuditLevel::Http),
            _ => None,
        }
    }
}

/// Append-only audit record. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    #[serde(rename = "_id")]
    pub id: AuditEntryId,
    pub level: AuditLevel,
    /// Actor email (or a placeholder for anonymous calls).
    pub email: String,
    /// Resource location, e.g. `Roles`.
    pub location: String,
    /// Action type, e.g. `Update`.
    pub proc_type: String,
    pub log: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Inclusive time window plus offset paging, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub skip: u64,
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, first_name: &str, is_active: bool) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: UserId::new(),
            email: email.into(),
            password_hash: "x".into(),
            first_name: first_name.into(),
            last_name: "Doe".into(),
            phone_number: None,
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_filter_matches_everyone() {
        assert!(UserFilter::default().matches(&user("a@x.com", "Ann", false)));
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let filter = UserFilter {
            email: Some("X.COM".into()),
            first_name: Some("nn".into()),
            is_active: Some(true),
        };
        assert!(filter.matches(&user("a@x.com", "Ann", true)));
        assert!(!filter.matches(&user("a@x.com", "Ann", false)));
        assert!(!filter.matches(&user("a@y.com", "Ann", true)));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(user("a@x.com", "Ann", true)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn audit_level_round_trips_through_its_label() {
        for level in [AuditLevel::Info, AuditLevel::Warn, AuditLevel::Error, AuditLevel::Http] {
            assert_eq!(AuditLevel::parse(level.as_str()), Some(level));
        }
    }
}
