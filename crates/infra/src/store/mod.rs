//! Store abstractions for users, roles, privilege assignments, categories and
//! audit entries.
//!
//! Each concern is its own trait so callers can depend on the narrowest piece;
//! [`Store`] bundles them for the single handle the application is built with.
//! None of the traits promise atomicity across calls: multi-step writes
//! (role + privileges, user + role links) are sequenced by the caller.

use async_trait::async_trait;
use thiserror::Error;

use warden_auth::Permission;
use warden_core::{CategoryId, PageRequest, RoleId, UserId};

use crate::models::{
    AuditEntry, AuditQuery, CategoryPatch, CategoryRecord, RolePatch, RolePrivilege, RoleRecord,
    UserFilter, UserPatch, UserRecord, UserRoleLink,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique field (email, role name) is already taken.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found")]
    NotFound,

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; `Conflict` if the email is taken.
    async fn insert_user(&self, user: UserRecord) -> StoreResult<()>;
    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserRecord>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;
    /// Apply a patch; `NotFound` for unknown ids, `Conflict` on a taken email.
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<UserRecord>;
    /// Returns whether a row was deleted.
    async fn delete_user(&self, id: UserId) -> StoreResult<bool>;
    async fn count_users(&self) -> StoreResult<u64>;
    /// One page of users matching `filter`, plus the filtered total.
    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<UserRecord>, u64)>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Insert a new role; `Conflict` if the name is taken.
    async fn insert_role(&self, role: RoleRecord) -> StoreResult<()>;
    async fn get_role(&self, id: RoleId) -> StoreResult<Option<RoleRecord>>;
    async fn find_role_by_name(&self, role_name: &str) -> StoreResult<Option<RoleRecord>>;
    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>>;
    /// Apply a patch; `NotFound` for unknown ids, `Conflict` on a taken name.
    async fn update_role(&self, id: RoleId, patch: RolePatch) -> StoreResult<RoleRecord>;
    /// Returns whether a row was deleted. Does not touch privilege rows.
    async fn delete_role(&self, id: RoleId) -> StoreResult<bool>;
    async fn count_roles(&self) -> StoreResult<u64>;

    async fn add_role_privileges(
        &self,
        role_id: RoleId,
        permissions: &[Permission],
        created_by: Option<UserId>,
    ) -> StoreResult<()>;
    /// Returns the number of assignment rows removed.
    async fn delete_role_privileges(&self, role_id: RoleId) -> StoreResult<u64>;
    async fn list_role_privileges(&self, role_id: RoleId) -> StoreResult<Vec<RolePrivilege>>;
    /// Every privilege key attached to any of `role_ids` (may contain duplicates).
    async fn privileges_for_roles(&self, role_ids: &[RoleId]) -> StoreResult<Vec<Permission>>;
}

#[async_trait]
pub trait UserRoleStore: Send + Sync {
    async fn assign_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> StoreResult<()>;
    /// Returns the number of edges removed.
    async fn clear_user_roles(&self, user_id: UserId) -> StoreResult<u64>;
    async fn roles_of_user(&self, user_id: UserId) -> StoreResult<Vec<RoleId>>;
    async fn role_links_for_users(&self, user_ids: &[UserId]) -> StoreResult<Vec<UserRoleLink>>;
    async fn count_users_with_role(&self, role_id: RoleId) -> StoreResult<u64>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert_category(&self, category: CategoryRecord) -> StoreResult<()>;
    async fn list_categories(&self) -> StoreResult<Vec<CategoryRecord>>;
    /// Apply a patch; `NotFound` for unknown ids.
    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<CategoryRecord>;
    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool>;
    async fn count_categories(&self) -> StoreResult<u64>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()>;
    async fn query_audit(&self, query: &AuditQuery) -> StoreResult<Vec<AuditEntry>>;
}

/// The full persistence surface the application is wired with.
pub trait Store: UserStore + RoleStore + UserRoleStore + CategoryStore + AuditStore {}

impl<T> Store for T where T: UserStore + RoleStore + UserRoleStore + CategoryStore + AuditStore {}
