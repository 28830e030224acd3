//! `warden-core`: identifiers, errors and paging primitives shared by every crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod paging;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AuditEntryId, CategoryId, RoleId, UserId};
pub use paging::{PageInfo, PageRequest};
