use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use warden_auth::Permission;
use warden_core::{CategoryId, Entity, PageRequest, RoleId, UserId};

use super::{
    AuditStore, CategoryStore, RoleStore, StoreError, StoreResult, UserRoleStore, UserStore,
};
use crate::models::{
    AuditEntry, AuditQuery, CategoryPatch, CategoryRecord, RolePatch, RolePrivilege, RoleRecord,
    UserFilter, UserPatch, UserRecord, UserRoleLink,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRecord>,
    roles: BTreeMap<RoleId, RoleRecord>,
    role_privileges: Vec<RolePrivilege>,
    user_roles: Vec<UserRoleLink>,
    categories: BTreeMap<CategoryId, CategoryRecord>,
    audit: Vec<AuditEntry>,
}

/// In-memory store for tests/dev.
///
/// Records are keyed by UUIDv7 ids, so iteration order is creation order.
/// Locks are never held across an await point.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn insert_entity<E: Entity>(table: &mut BTreeMap<E::Id, E>, record: E) {
    table.insert(record.id(), record);
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email '{}' already registered", user.email)));
        }
        insert_entity(&mut t.users, user);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<UserRecord> {
        let mut t = self.write()?;
        if let Some(email) = &patch.email {
            if t.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(StoreError::Conflict(format!("email '{email}' already registered")));
            }
        }

        let user = t.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(hash) = patch.password_hash {
            user.password_hash = hash;
        }
        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(phone) = patch.phone_number {
            user.phone_number = Some(phone);
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        Ok(self.write()?.users.remove(&id).is_some())
    }

    async fn count_users(&self) -> StoreResult<u64> {
        Ok(self.read()?.users.len() as u64)
    }

    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<UserRecord>, u64)> {
        let t = self.read()?;
        let matching: Vec<&UserRecord> = t.users.values().filter(|u| filter.matches(u)).collect();
        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }
}

#[async_trait]
impl RoleStore for InMemoryStore {
    async fn insert_role(&self, role: RoleRecord) -> StoreResult<()> {
        let mut t = self.write()?;
        if t.roles.values().any(|r| r.role_name == role.role_name) {
            return Err(StoreError::Conflict(format!("role '{}' already exists", role.role_name)));
        }
        insert_entity(&mut t.roles, role);
        Ok(())
    }

    async fn get_role(&self, id: RoleId) -> StoreResult<Option<RoleRecord>> {
        Ok(self.read()?.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, role_name: &str) -> StoreResult<Option<RoleRecord>> {
        Ok(self.read()?.roles.values().find(|r| r.role_name == role_name).cloned())
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    async fn update_role(&self, id: RoleId, patch: RolePatch) -> StoreResult<RoleRecord> {
        let mut t = self.write()?;
        if let Some(name) = &patch.role_name {
            if t.roles.values().any(|r| r.id != id && &r.role_name == name) {
                return Err(StoreError::Conflict(format!("role '{name}' already exists")));
            }
        }

        let role = t.roles.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = patch.role_name {
            role.role_name = name;
        }
        if let Some(active) = patch.is_active {
            role.is_active = active;
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete_role(&self, id: RoleId) -> StoreResult<bool> {
        Ok(self.write()?.roles.remove(&id).is_some())
    }

    async fn count_roles(&self) -> StoreResult<u64> {
        Ok(self.read()?.roles.len() as u64)
    }

    async fn add_role_privileges(
        &self,
        role_id: RoleId,
        permissions: &[Permission],
        created_by: Option<UserId>,
    ) -> StoreResult<()> {
        let mut t = self.write()?;
        let now = Utc::now();
        for permission in permissions {
            let exists = t
                .role_privileges
                .iter()
                .any(|rp| rp.role_id == role_id && &rp.permission == permission);
            if !exists {
                t.role_privileges.push(RolePrivilege {
                    role_id,
                    permission: permission.clone(),
                    created_by,
                    created_at: now,
                });
            }
        }
        Ok(())
    }

    async fn delete_role_privileges(&self, role_id: RoleId) -> StoreResult<u64> {
        let mut t = self.write()?;
        let before = t.role_privileges.len();
        t.role_privileges.retain(|rp| rp.role_id != role_id);
        Ok((before - t.role_privileges.len()) as u64)
    }

    async fn list_role_privileges(&self, role_id: RoleId) -> StoreResult<Vec<RolePrivilege>> {
        Ok(self
            .read()?
            .role_privileges
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .cloned()
            .collect())
    }

    async fn privileges_for_roles(&self, role_ids: &[RoleId]) -> StoreResult<Vec<Permission>> {
        Ok(self
            .read()?
            .role_privileges
            .iter()
            .filter(|rp| role_ids.contains(&rp.role_id))
            .map(|rp| rp.permission.clone())
            .collect())
    }
}

#[async_trait]
impl UserRoleStore for InMemoryStore {
    async fn assign_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> StoreResult<()> {
        let mut t = self.write()?;
        let now = Utc::now();
        for role_id in role_ids {
            let exists = t
                .user_roles
                .iter()
                .any(|l| l.user_id == user_id && l.role_id == *role_id);
            if !exists {
                t.user_roles.push(UserRoleLink {
                    user_id,
                    role_id: *role_id,
                    created_at: now,
                });
            }
        }
        Ok(())
    }

    async fn clear_user_roles(&self, user_id: UserId) -> StoreResult<u64> {
        let mut t = self.write()?;
        let before = t.user_roles.len();
        t.user_roles.retain(|l| l.user_id != user_id);
        Ok((before - t.user_roles.len()) as u64)
    }

    async fn roles_of_user(&self, user_id: UserId) -> StoreResult<Vec<RoleId>> {
        Ok(self
            .read()?
            .user_roles
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.role_id)
            .collect())
    }

    async fn role_links_for_users(&self, user_ids: &[UserId]) -> StoreResult<Vec<UserRoleLink>> {
        Ok(self
            .read()?
            .user_roles
            .iter()
            .filter(|l| user_ids.contains(&l.user_id))
            .cloned()
            .collect())
    }

    async fn count_users_with_role(&self, role_id: RoleId) -> StoreResult<u64> {
        Ok(self.read()?.user_roles.iter().filter(|l| l.role_id == role_id).count() as u64)
    }
}

#[async_trait]
impl CategoryStore for InMemoryStore {
    async fn insert_category(&self, category: CategoryRecord) -> StoreResult<()> {
        insert_entity(&mut self.write()?.categories, category);
        Ok(())
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryRecord>> {
        Ok(self.read()?.categories.values().cloned().collect())
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<CategoryRecord> {
        let mut t = self.write()?;
        let category = t.categories.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = patch.name {
            category.name = name;
        }
        if let Some(active) = patch.is_active {
            category.is_active = active;
        }
        category.updated_at = Utc::now();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        Ok(self.write()?.categories.remove(&id).is_some())
    }

    async fn count_categories(&self) -> StoreResult<u64> {
        Ok(self.read()?.categories.len() as u64)
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.write()?.audit.push(entry);
        Ok(())
    }

    async fn query_audit(&self, query: &AuditQuery) -> StoreResult<Vec<AuditEntry>> {
        let t = self.read()?;
        let mut hits: Vec<AuditEntry> = t
            .audit
            .iter()
            .filter(|e| e.created_at >= query.begin && e.created_at <= query.end)
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(hits
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect())
    }
}
