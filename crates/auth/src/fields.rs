//! Validated input fields for users and roles.

use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_PERSON_NAME_LEN: usize = 2;
pub const MIN_ROLE_NAME_LEN: usize = 3;

/// Role granted every catalog privilege by the first-user bootstrap.
pub const SUPER_ADMIN_ROLE: &str = "SUPER_ADMIN";

/// Normalized (trimmed, lowercased) email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let email = raw.trim().to_lowercase();
        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::validation("email must be a valid address"));
        };
        let labels: Vec<&str> = domain.split('.').collect();
        let domain_ok = labels.len() >= 2 && labels.iter().all(|label| !label.is_empty());
        if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email must be a valid address"));
        }
        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// First or last name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonName(String);

impl PersonName {
    pub fn parse(field: &str, raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if name.chars().count() < MIN_PERSON_NAME_LEN {
            return Err(DomainError::validation(format!(
                "{field} must be at least {MIN_PERSON_NAME_LEN} characters"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Only require a non-blank value (first-user setup).
    pub fn parse_required(field: &str, raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(DomainError::validation(format!("{field} is required")));
        }
        Ok(Self(name.to_string()))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A plaintext password that satisfied the length policy. Never serialized.
pub struct PlainPassword(String);

impl PlainPassword {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if raw.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PlainPassword(***)")
    }
}

/// Unique, human-readable role name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let name = raw.trim();
        if name.chars().count() < MIN_ROLE_NAME_LEN {
            return Err(DomainError::validation(format!(
                "role_name must be at least {MIN_ROLE_NAME_LEN} characters"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn super_admin() -> Self {
        Self(SUPER_ADMIN_ROLE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let email = Email::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn email_rejects_malformed_input() {
        for bad in ["", "alice", "@x.com", "a@", "a@x", "a@x..com", "a b@x.com"] {
            assert!(Email::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn short_password_rejected() {
        assert!(PlainPassword::parse("short").is_err());
        assert!(PlainPassword::parse("Password123").is_ok());
    }

    #[test]
    fn password_debug_is_redacted() {
        let pw = PlainPassword::parse("Password123").unwrap();
        assert!(!format!("{pw:?}").contains("Password123"));
    }

    #[test]
    fn names_enforce_minimum_length() {
        assert!(PersonName::parse("first_name", "A").is_err());
        assert!(PersonName::parse("first_name", "Al").is_ok());
        assert!(PersonName::parse_required("first_name", "A").is_ok());
        assert!(PersonName::parse_required("first_name", "  ").is_err());
        assert!(RoleName::parse("ab").is_err());
        assert_eq!(RoleName::parse(" Editors ").unwrap().as_str(), "Editors");
    }
}
