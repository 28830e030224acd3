//! `warden-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows the
//! privilege catalog, how to mint and verify bearer tokens, how passwords are
//! hashed, and how a resolved principal is checked against a required privilege.

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod fields;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod token;

pub use authorize::{authorize, effective_privileges, AuthzError};
pub use catalog::{PrivilegeDefinition, PrivilegeGroup, PRIVILEGES, PRIVILEGE_GROUPS};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use fields::{Email, PersonName, PlainPassword, RoleName};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::Permission;
pub use principal::Principal;
pub use token::{Hs256JwtValidator, JwtValidator, TokenError};
