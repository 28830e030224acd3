//! Application services: everything a handler does besides HTTP plumbing.
//!
//! Each mutation validates its whole input before touching the store, then
//! writes in a fixed order. Multi-step writes are not transactional; where a
//! later step fails after an earlier one succeeded, the earlier step is undone
//! explicitly (user + role links) or the partial state is left and logged
//! (role + privileges).

use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};

use warden_auth::catalog::all_permissions;
use warden_auth::fields::SUPER_ADMIN_ROLE;
use warden_auth::{
    hash_password, verify_password, Email, Hs256JwtValidator, Permission, PersonName, PlainPassword,
    RoleName, PRIVILEGES, PRIVILEGE_GROUPS,
};
use warden_core::{CategoryId, PageRequest, RoleId, UserId};
use warden_infra::audit::{action, location, ANONYMOUS};
use warden_infra::models::{
    AuditEntry, AuditQuery, CategoryPatch, CategoryRecord, RolePatch, RolePrivilege, RoleRecord,
    UserFilter, UserPatch, UserRecord,
};
use warden_infra::store::{AuditStore, CategoryStore, RoleStore, UserRoleStore, UserStore};
use warden_infra::{AuditRecorder, Store, StoreError};

use crate::app::dto::{
    AddCategoryRequest, AddRoleRequest, AddUserRequest, AuditLogQuery, IdRequest, LoginRequest,
    LoginResponse, LoginUser, MeView, PermissionsView, RegisterRequest, RolePrivilegesQuery,
    RoleSummary, StatsView, Success, UpdateCategoryRequest, UpdateRoleRequest, UpdateUserRequest,
    UserPage, UserView, UsersQuery,
};
use crate::app::errors::{ApiError, ApiResult};
use crate::context::PrincipalContext;

pub struct AppServices {
    store: Arc<dyn Store>,
    audit: AuditRecorder,
    tokens: Arc<Hs256JwtValidator>,
    audit_query_max_limit: u64,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn Store>,
        audit: AuditRecorder,
        tokens: Arc<Hs256JwtValidator>,
        audit_query_max_limit: u64,
    ) -> Self {
        Self {
            store,
            audit,
            tokens,
            audit_query_max_limit,
        }
    }

    /// Record the outcome of a mutation: `info` with `payload` on success,
    /// `error` with the failure otherwise.
    fn audited<T>(
        &self,
        actor: &str,
        location: &str,
        action: &str,
        result: ApiResult<(T, Value)>,
    ) -> ApiResult<T> {
        match result {
            Ok((value, payload)) => {
                self.audit.info(actor, location, action, payload);
                Ok(value)
            }
            Err(err) => {
                self.audit
                    .error(actor, location, action, json!({ "error": err.to_string() }));
                Err(err)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Authentication and first-user setup
    // ─────────────────────────────────────────────────────────────────────

    pub async fn login(&self, req: LoginRequest) -> ApiResult<LoginResponse> {
        let actor = match req.email.trim() {
            "" => ANONYMOUS.to_string(),
            email => email.to_lowercase(),
        };
        let result = self.try_login(req).await.map(|resp| {
            let payload = json!({ "_id": resp.user.id });
            (resp, payload)
        });
        self.audited(&actor, location::USERS, action::LOGIN, result)
    }

    async fn try_login(&self, req: LoginRequest) -> ApiResult<LoginResponse> {
        let email = Email::parse(&req.email)?;
        if req.password.is_empty() {
            return Err(ApiError::Validation("password is required".to_string()));
        }

        // Unknown email, wrong password and inactive account are indistinguishable.
        let user = self
            .store
            .find_user_by_email(email.as_str())
            .await?
            .ok_or_else(ApiError::authentication)?;
        if !verify_password(&req.password, &user.password_hash) || !user.is_active {
            return Err(ApiError::authentication());
        }

        let token = self.tokens.issue(user.id, &user.email, Utc::now())?;
        Ok(LoginResponse {
            token,
            user: LoginUser {
                id: user.id,
                email: user.email,
                first_name: user.first_name,
                last_name: user.last_name,
            },
        })
    }

    /// `POST /users/register` entry point. Once setup has run every body gets
    /// the same answer, so the payload is only decoded while the store is empty.
    pub async fn register(&self, body: &[u8]) -> ApiResult<Success> {
        if self.store.count_users().await? > 0 {
            return Err(ApiError::SetupCompleted);
        }
        let req: RegisterRequest =
            serde_json::from_slice(body).map_err(|e| ApiError::Validation(e.to_string()))?;
        self.register_first_user(req).await
    }

    /// One-time bootstrap: create the first user and make them super admin.
    ///
    /// The emptiness check and the insert are separate calls; two concurrent
    /// first calls can both pass the check.
    pub async fn register_first_user(&self, req: RegisterRequest) -> ApiResult<Success> {
        if self.store.count_users().await? > 0 {
            return Err(ApiError::SetupCompleted);
        }

        let email = Email::parse(&req.email)?;
        let password = PlainPassword::parse(&req.password)?;
        let first_name = PersonName::parse_required("first_name", &req.first_name)?;
        let last_name = PersonName::parse_required("last_name", &req.last_name)?;

        let now = Utc::now();
        let user = UserRecord {
            id: UserId::new(),
            email: email.into_inner(),
            password_hash: hash_password(&password)?,
            first_name: first_name.into_inner(),
            last_name: last_name.into_inner(),
            phone_number: normalize_phone(req.phone_number),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let user_id = user.id;
        let email = user.email.clone();
        self.store.insert_user(user).await?;

        if let Err(err) = self.grant_super_admin(user_id).await {
            self.undo_user_insert(user_id).await;
            return Err(err);
        }

        tracing::info!(user_id = %user_id, "initial setup completed");
        self.audit
            .info(&email, location::USERS, action::ADD, json!({ "_id": user_id, "setup": true }));
        Ok(Success::with_message("System initialized."))
    }

    async fn grant_super_admin(&self, user_id: UserId) -> ApiResult<()> {
        let role = match self.store.find_role_by_name(SUPER_ADMIN_ROLE).await? {
            Some(role) => role,
            None => {
                let now = Utc::now();
                let role = RoleRecord {
                    id: RoleId::new(),
                    role_name: RoleName::super_admin().into_inner(),
                    is_active: true,
                    created_by: Some(user_id),
                    created_at: now,
                    updated_at: now,
                };
                self.store.insert_role(role.clone()).await?;
                self.store
                    .add_role_privileges(role.id, &all_permissions(), Some(user_id))
                    .await?;
                role
            }
        };
        self.store.assign_roles(user_id, &[role.id]).await?;
        Ok(())
    }

    /// Compensating delete for a user whose follow-up writes failed.
    async fn undo_user_insert(&self, user_id: UserId) {
        if let Err(err) = self.store.clear_user_roles(user_id).await {
            tracing::error!(user_id = %user_id, error = %err, "failed to clear role links of rolled-back user");
        }
        match self.store.delete_user(user_id).await {
            Ok(_) => tracing::warn!(user_id = %user_id, "rolled back user after failed follow-up write"),
            Err(err) => tracing::error!(user_id = %user_id, error = %err, "failed to roll back user"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Current user and stats
    // ─────────────────────────────────────────────────────────────────────

    pub async fn me(&self, principal: &PrincipalContext) -> ApiResult<MeView> {
        let user = self
            .store
            .get_user(principal.user_id())
            .await?
            .ok_or_else(ApiError::authentication)?;
        Ok(MeView {
            user,
            roles: principal.roles().to_vec(),
            privileges: principal.privileges().iter().cloned().collect(),
        })
    }

    pub async fn stats(&self) -> ApiResult<StatsView> {
        Ok(StatsView {
            users: self.store.count_users().await?,
            roles: self.store.count_roles().await?,
            categories: self.store.count_categories().await?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_users(&self, query: UsersQuery) -> ApiResult<UserPage> {
        let page = PageRequest::new(query.page, query.limit);
        let filter = UserFilter {
            email: non_blank(query.email),
            first_name: non_blank(query.first_name),
            is_active: query.is_active,
        };

        let (users, total) = self.store.list_users(&filter, page).await?;
        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let links = self.store.role_links_for_users(&ids).await?;
        let names: HashMap<RoleId, String> = self
            .store
            .list_roles()
            .await?
            .into_iter()
            .map(|r| (r.id, r.role_name))
            .collect();

        let data = users
            .into_iter()
            .map(|user| {
                let roles = links
                    .iter()
                    .filter(|l| l.user_id == user.id)
                    .filter_map(|l| {
                        names.get(&l.role_id).map(|name| RoleSummary {
                            id: l.role_id,
                            role_name: name.clone(),
                        })
                    })
                    .collect();
                UserView { user, roles }
            })
            .collect();

        Ok(UserPage {
            data,
            pagination: page.info(total),
        })
    }

    pub async fn add_user(&self, actor: &PrincipalContext, req: AddUserRequest) -> ApiResult<Success> {
        let result = self.try_add_user(req).await;
        self.audited(actor.email(), location::USERS, action::ADD, result)
    }

    async fn try_add_user(&self, req: AddUserRequest) -> ApiResult<(Success, Value)> {
        let email = Email::parse(&req.email)?;
        let password = PlainPassword::parse(&req.password)?;
        let first_name = PersonName::parse("first_name", &req.first_name)?;
        let last_name = PersonName::parse("last_name", &req.last_name)?;
        let role_ids = parse_role_ids(req.roles.unwrap_or_default())?;
        self.ensure_roles_exist(&role_ids).await?;

        if self.store.find_user_by_email(email.as_str()).await?.is_some() {
            return Err(ApiError::Conflict(format!("email '{email}' is already registered")));
        }

        let now = Utc::now();
        let user = UserRecord {
            id: UserId::new(),
            email: email.into_inner(),
            password_hash: hash_password(&password)?,
            first_name: first_name.into_inner(),
            last_name: last_name.into_inner(),
            phone_number: normalize_phone(req.phone_number),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let payload = json!({ "_id": user.id, "email": user.email });
        let user_id = user.id;
        self.store.insert_user(user).await?;

        if let Err(err) = self.store.assign_roles(user_id, &role_ids).await {
            self.undo_user_insert(user_id).await;
            return Err(err.into());
        }

        Ok((Success::done(), payload))
    }

    pub async fn update_user(&self, actor: &PrincipalContext, req: UpdateUserRequest) -> ApiResult<Success> {
        let result = self.try_update_user(req).await;
        self.audited(actor.email(), location::USERS, action::UPDATE, result)
    }

    async fn try_update_user(&self, req: UpdateUserRequest) -> ApiResult<(Success, Value)> {
        let id = UserId::from_str(&req.id)?;

        let email = req.email.as_deref().map(Email::parse).transpose()?;
        let password = req.password.as_deref().map(PlainPassword::parse).transpose()?;
        let first_name = req
            .first_name
            .as_deref()
            .map(|n| PersonName::parse("first_name", n))
            .transpose()?;
        let last_name = req
            .last_name
            .as_deref()
            .map(|n| PersonName::parse("last_name", n))
            .transpose()?;
        let role_ids = req.roles.map(parse_role_ids).transpose()?;

        if self.store.get_user(id).await?.is_none() {
            return Err(ApiError::NotFound(format!("user {id}")));
        }
        if let Some(role_ids) = &role_ids {
            self.ensure_roles_exist(role_ids).await?;
        }
        if let Some(email) = &email {
            if let Some(other) = self.store.find_user_by_email(email.as_str()).await? {
                if other.id != id {
                    return Err(ApiError::Conflict(format!("email '{email}' is already registered")));
                }
            }
        }

        let patch = UserPatch {
            email: email.map(Email::into_inner),
            password_hash: password.as_ref().map(hash_password).transpose()?,
            first_name: first_name.map(PersonName::into_inner),
            last_name: last_name.map(PersonName::into_inner),
            phone_number: normalize_phone(req.phone_number),
            is_active: req.is_active,
        };
        let mut payload = json!({ "_id": id });
        if let Some(active) = patch.is_active {
            payload["is_active"] = json!(active);
        }
        self.store.update_user(id, patch).await?;

        if let Some(role_ids) = role_ids {
            self.store.clear_user_roles(id).await?;
            self.store.assign_roles(id, &role_ids).await?;
            payload["roles"] = json!(role_ids);
        }

        Ok((Success::done(), payload))
    }

    pub async fn delete_user(&self, actor: &PrincipalContext, req: IdRequest) -> ApiResult<Success> {
        let result = self.try_delete_user(req).await;
        self.audited(actor.email(), location::USERS, action::DELETE, result)
    }

    async fn try_delete_user(&self, req: IdRequest) -> ApiResult<(Success, Value)> {
        let id = UserId::from_str(&req.id)?;
        if !self.store.delete_user(id).await? {
            return Err(ApiError::NotFound(format!("user {id}")));
        }
        self.store.clear_user_roles(id).await?;
        Ok((Success::done(), json!({ "_id": id })))
    }

    async fn ensure_roles_exist(&self, role_ids: &[RoleId]) -> ApiResult<()> {
        for role_id in role_ids {
            if self.store.get_role(*role_id).await?.is_none() {
                return Err(ApiError::NotFound(format!("role {role_id}")));
            }
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Roles
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_roles(&self) -> ApiResult<Vec<RoleRecord>> {
        Ok(self.store.list_roles().await?)
    }

    pub fn permissions(&self) -> PermissionsView {
        PermissionsView {
            priv_groups: PRIVILEGE_GROUPS,
            privileges: PRIVILEGES,
        }
    }

    pub async fn role_privileges(&self, query: RolePrivilegesQuery) -> ApiResult<Vec<RolePrivilege>> {
        let raw = non_blank(query.role_id)
            .ok_or_else(|| ApiError::Validation("role_id field is required".to_string()))?;
        let role_id = RoleId::from_str(&raw)?;
        Ok(self.store.list_role_privileges(role_id).await?)
    }

    pub async fn add_role(&self, actor: &PrincipalContext, req: AddRoleRequest) -> ApiResult<RoleRecord> {
        let result = self.try_add_role(actor, req).await;
        self.audited(actor.email(), location::ROLES, action::ADD, result)
    }

    async fn try_add_role(&self, actor: &PrincipalContext, req: AddRoleRequest) -> ApiResult<(RoleRecord, Value)> {
        let role_name = RoleName::parse(&req.role_name)?;
        let permissions = parse_permissions(req.permissions.unwrap_or_default())?;

        if self.store.find_role_by_name(role_name.as_str()).await?.is_some() {
            return Err(ApiError::Conflict(format!("role '{role_name}' already exists")));
        }

        let now = Utc::now();
        let role = RoleRecord {
            id: RoleId::new(),
            role_name: role_name.into_inner(),
            is_active: req.is_active.unwrap_or(true),
            created_by: Some(actor.user_id()),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_role(role.clone()).await?;
        self.store
            .add_role_privileges(role.id, &permissions, Some(actor.user_id()))
            .await?;

        let payload = json!({ "_id": role.id, "role_name": role.role_name, "permissions": permissions });
        Ok((role, payload))
    }

    pub async fn update_role(&self, actor: &PrincipalContext, req: UpdateRoleRequest) -> ApiResult<Success> {
        let result = self.try_update_role(actor, req).await;
        self.audited(actor.email(), location::ROLES, action::UPDATE, result)
    }

    /// Privileges use replace-all semantics: readers racing the update may
    /// briefly see the role with no privileges.
    async fn try_update_role(&self, actor: &PrincipalContext, req: UpdateRoleRequest) -> ApiResult<(Success, Value)> {
        let id = RoleId::from_str(&req.id)?;
        let role_name = req.role_name.as_deref().map(RoleName::parse).transpose()?;
        let permissions = req.permissions.map(parse_permissions).transpose()?;

        if self.store.get_role(id).await?.is_none() {
            return Err(ApiError::NotFound(format!("role {id}")));
        }
        if let Some(name) = &role_name {
            if let Some(other) = self.store.find_role_by_name(name.as_str()).await? {
                if other.id != id {
                    return Err(ApiError::Conflict(format!("role '{name}' already exists")));
                }
            }
        }

        let mut payload = json!({ "_id": id });
        if let Some(name) = &role_name {
            payload["role_name"] = json!(name);
        }
        if let Some(active) = req.is_active {
            payload["is_active"] = json!(active);
        }

        let patch = RolePatch {
            role_name: role_name.map(RoleName::into_inner),
            is_active: req.is_active,
        };
        self.store.update_role(id, patch).await?;

        if let Some(permissions) = permissions {
            self.store.delete_role_privileges(id).await?;
            self.store
                .add_role_privileges(id, &permissions, Some(actor.user_id()))
                .await?;
            payload["permissions"] = json!(permissions);
        }

        Ok((Success::done(), payload))
    }

    pub async fn delete_role(&self, actor: &PrincipalContext, req: IdRequest) -> ApiResult<Success> {
        let result = self.try_delete_role(req).await;
        self.audited(actor.email(), location::ROLES, action::DELETE, result)
    }

    /// Removes the role and its privilege rows. User links to the role are
    /// left in place and stop granting anything.
    async fn try_delete_role(&self, req: IdRequest) -> ApiResult<(Success, Value)> {
        let id = RoleId::from_str(&req.id)?;
        if self.store.get_role(id).await?.is_none() {
            return Err(ApiError::NotFound(format!("role {id}")));
        }

        let holders = self.store.count_users_with_role(id).await?;
        if holders > 0 {
            tracing::warn!(role_id = %id, users = holders, "deleting role still assigned to users");
        }

        let removed = self.store.delete_role_privileges(id).await?;
        self.store.delete_role(id).await?;
        Ok((Success::done(), json!({ "_id": id, "privileges_removed": removed })))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────

    pub async fn list_categories(&self) -> ApiResult<Vec<CategoryRecord>> {
        Ok(self.store.list_categories().await?)
    }

    pub async fn add_category(&self, actor: &PrincipalContext, req: AddCategoryRequest) -> ApiResult<CategoryRecord> {
        let result = self.try_add_category(actor, req).await;
        self.audited(actor.email(), location::CATEGORIES, action::ADD, result)
    }

    async fn try_add_category(
        &self,
        actor: &PrincipalContext,
        req: AddCategoryRequest,
    ) -> ApiResult<(CategoryRecord, Value)> {
        let name = non_blank(req.name)
            .ok_or_else(|| ApiError::Validation("name field is required".to_string()))?;

        let now = Utc::now();
        let category = CategoryRecord {
            id: CategoryId::new(),
            name,
            is_active: req.is_active.unwrap_or(true),
            created_by: Some(actor.user_id()),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_category(category.clone()).await?;
        let payload = json!({ "_id": category.id, "name": category.name });
        Ok((category, payload))
    }

    pub async fn update_category(&self, actor: &PrincipalContext, req: UpdateCategoryRequest) -> ApiResult<Success> {
        let result = self.try_update_category(req).await;
        self.audited(actor.email(), location::CATEGORIES, action::UPDATE, result)
    }

    async fn try_update_category(&self, req: UpdateCategoryRequest) -> ApiResult<(Success, Value)> {
        let id = CategoryId::from_str(&req.id)?;
        let name = match req.name {
            Some(raw) => Some(
                non_blank(Some(raw)).ok_or_else(|| ApiError::Validation("name must not be blank".to_string()))?,
            ),
            None => None,
        };

        let patch = CategoryPatch {
            name,
            is_active: req.is_active,
        };
        let updated = self.store.update_category(id, patch).await.map_err(|e| match e {
            StoreError::NotFound => ApiError::NotFound(format!("category {id}")),
            other => other.into(),
        })?;

        Ok((Success::done(), json!({ "_id": id, "name": updated.name, "is_active": updated.is_active })))
    }

    pub async fn delete_category(&self, actor: &PrincipalContext, req: IdRequest) -> ApiResult<Success> {
        let result = self.try_delete_category(req).await;
        self.audited(actor.email(), location::CATEGORIES, action::DELETE, result)
    }

    async fn try_delete_category(&self, req: IdRequest) -> ApiResult<(Success, Value)> {
        let id = CategoryId::from_str(&req.id)?;
        if !self.store.delete_category(id).await? {
            return Err(ApiError::NotFound(format!("category {id}")));
        }
        Ok((Success::done(), json!({ "_id": id })))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Audit log
    // ─────────────────────────────────────────────────────────────────────

    pub async fn audit_logs(&self, query: AuditLogQuery) -> ApiResult<Vec<AuditEntry>> {
        let query = self.audit_query(query, Utc::now())?;
        Ok(self.store.query_audit(&query).await?)
    }

    fn audit_query(&self, query: AuditLogQuery, now: DateTime<Utc>) -> ApiResult<AuditQuery> {
        let skip = query.skip.unwrap_or(0).max(0) as u64;
        let max = self.audit_query_max_limit;
        let limit = match query.limit {
            Some(n) if n > 0 => (n as u64).min(max),
            _ => max,
        };

        let (begin, end) = match (non_blank(query.begin_date), non_blank(query.end_date)) {
            (Some(begin), Some(end)) => {
                let begin = parse_date("begin_date", &begin)?;
                let end = parse_date("end_date", &end)?;
                if begin > end {
                    return Err(ApiError::Validation("begin_date must not be after end_date".to_string()));
                }
                (begin, end)
            }
            _ => (start_of_yesterday(now), now),
        };

        Ok(AuditQuery { begin, end, skip, limit })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Input helpers
// ─────────────────────────────────────────────────────────────────────────────

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_phone(value: Option<String>) -> Option<String> {
    non_blank(value)
}

fn parse_role_ids(raw: Vec<String>) -> ApiResult<Vec<RoleId>> {
    let mut seen = BTreeSet::new();
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let id = RoleId::from_str(&value)?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Catalog keys only, deduplicated, in request order.
fn parse_permissions(raw: Vec<String>) -> ApiResult<Vec<Permission>> {
    let mut seen = BTreeSet::new();
    let mut permissions = Vec::with_capacity(raw.len());
    for key in raw {
        let permission = Permission::parse(&key)?;
        if seen.insert(permission.clone()) {
            permissions.push(permission);
        }
    }
    Ok(permissions)
}

/// Accept RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
fn parse_date(field: &str, raw: &str) -> ApiResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ApiError::Validation(format!("{field} must be a date (YYYY-MM-DD) or RFC 3339 timestamp")))
}

fn start_of_yesterday(now: DateTime<Utc>) -> DateTime<Utc> {
    (now - Duration::days(1)).date_naive().and_time(NaiveTime::MIN).and_utc()
}
