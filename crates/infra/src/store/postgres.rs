//! Postgres-backed store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / network / decode | N/A | `Backend` |
//!
//! `PostgresStore` is `Send + Sync`; all access goes through the SQLx pool.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{instrument, Span};
use uuid::Uuid;

use warden_auth::Permission;
use warden_core::{AuditEntryId, CategoryId, PageRequest, RoleId, UserId};

use super::{
    AuditStore, CategoryStore, RoleStore, StoreError, StoreResult, UserRoleStore, UserStore,
};
use crate::models::{
    AuditEntry, AuditLevel, AuditQuery, CategoryPatch, CategoryRecord, RolePatch, RolePrivilege,
    RoleRecord, UserFilter, UserPatch, UserRecord, UserRoleLink,
};

const SCHEMA: &str = include_str!("schema.sql");

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, phone_number, is_active, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, role_name, is_active, created_by, created_at, updated_at";
const CATEGORY_COLUMNS: &str = "id, name, is_active, created_by, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code() {
                Some(code) if code.as_ref() == "23505" => StoreError::Conflict(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn decode_error(operation: &str, err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row in {}: {}", operation, err))
}

fn count_from(row: &PgRow, operation: &str) -> StoreResult<u64> {
    let total: i64 = row.try_get("total").map_err(|e| decode_error(operation, e))?;
    Ok(total.max(0) as u64)
}

/// Build an `ILIKE` pattern matching `needle` anywhere, with wildcards escaped.
fn contains_pattern(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn user_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        id: UserId::from_uuid(row.try_get("id")?),
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_number: row.try_get("phone_number")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn role_from_row(row: &PgRow) -> Result<RoleRecord, sqlx::Error> {
    let created_by: Option<Uuid> = row.try_get("created_by")?;
    Ok(RoleRecord {
        id: RoleId::from_uuid(row.try_get("id")?),
        role_name: row.try_get("role_name")?,
        is_active: row.try_get("is_active")?,
        created_by: created_by.map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn role_privilege_from_row(row: &PgRow) -> Result<RolePrivilege, sqlx::Error> {
    let created_by: Option<Uuid> = row.try_get("created_by")?;
    let permission: String = row.try_get("permission")?;
    Ok(RolePrivilege {
        role_id: RoleId::from_uuid(row.try_get("role_id")?),
        permission: Permission::new(permission),
        created_by: created_by.map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<CategoryRecord, sqlx::Error> {
    let created_by: Option<Uuid> = row.try_get("created_by")?;
    Ok(CategoryRecord {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        created_by: created_by.map(UserId::from_uuid),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn audit_from_row(row: &PgRow) -> Result<AuditEntry, sqlx::Error> {
    let level: String = row.try_get("level")?;
    let level = AuditLevel::parse(&level)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown audit level '{level}'").into()))?;
    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(row.try_get("id")?),
        level,
        email: row.try_get("email")?,
        location: row.try_get("location")?,
        proc_type: row.try_get("proc_type")?,
        log: row.try_get("log")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_rows<T>(
    rows: Vec<PgRow>,
    operation: &str,
    f: fn(&PgRow) -> Result<T, sqlx::Error>,
) -> StoreResult<Vec<T>> {
    rows.iter()
        .map(|row| f(row).map_err(|e| decode_error(operation, e)))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Users
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: UserRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name,
                               phone_number, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.map(|r| user_from_row(&r).map_err(|e| decode_error("get_user", e)))
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.map(|r| user_from_row(&r).map_err(|e| decode_error("find_user_by_email", e)))
            .transpose()
    }

    #[instrument(skip(self, patch), fields(user_id = %id), err)]
    async fn update_user(&self, id: UserId, patch: UserPatch) -> StoreResult<UserRecord> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                email         = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                first_name    = COALESCE($4, first_name),
                last_name     = COALESCE($5, last_name),
                phone_number  = COALESCE($6, phone_number),
                is_active     = COALESCE($7, is_active),
                updated_at    = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.first_name)
        .bind(patch.last_name)
        .bind(patch.phone_number)
        .bind(patch.is_active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?
        .ok_or(StoreError::NotFound)?;

        user_from_row(&row).map_err(|e| decode_error("update_user", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM users")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;
        count_from(&row, "count_users")
    }

    #[instrument(skip(self, filter), fields(total = tracing::field::Empty), err)]
    async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<(Vec<UserRecord>, u64)> {
        let email = filter.email.as_deref().map(contains_pattern);
        let first_name = filter.first_name.as_deref().map(contains_pattern);

        let count_row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1)
                AND ($2::text IS NULL OR first_name ILIKE $2)
                AND ($3::boolean IS NULL OR is_active = $3)
            "#,
        )
        .bind(&email)
        .bind(&first_name)
        .bind(filter.is_active)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_users", e))?;
        let total = count_from(&count_row, "list_users")?;
        Span::current().record("total", total);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1)
                AND ($2::text IS NULL OR first_name ILIKE $2)
                AND ($3::boolean IS NULL OR is_active = $3)
            ORDER BY created_at ASC, id ASC
            LIMIT $4 OFFSET $5
            "#
        ))
        .bind(&email)
        .bind(&first_name)
        .bind(filter.is_active)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        Ok((map_rows(rows, "list_users", user_from_row)?, total))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Roles and privilege assignments
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RoleStore for PostgresStore {
    #[instrument(skip(self, role), fields(role_id = %role.id), err)]
    async fn insert_role(&self, role: RoleRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, role_name, is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(&role.role_name)
        .bind(role.is_active)
        .bind(role.created_by.map(Uuid::from))
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_role", e))?;
        Ok(())
    }

    async fn get_role(&self, id: RoleId) -> StoreResult<Option<RoleRecord>> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_role", e))?;
        row.map(|r| role_from_row(&r).map_err(|e| decode_error("get_role", e)))
            .transpose()
    }

    async fn find_role_by_name(&self, role_name: &str) -> StoreResult<Option<RoleRecord>> {
        let row = sqlx::query(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE role_name = $1"))
            .bind(role_name)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_role_by_name", e))?;
        row.map(|r| role_from_row(&r).map_err(|e| decode_error("find_role_by_name", e)))
            .transpose()
    }

    async fn list_roles(&self) -> StoreResult<Vec<RoleRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_roles", e))?;
        map_rows(rows, "list_roles", role_from_row)
    }

    #[instrument(skip(self, patch), fields(role_id = %id), err)]
    async fn update_role(&self, id: RoleId, patch: RolePatch) -> StoreResult<RoleRecord> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE roles SET
                role_name  = COALESCE($2, role_name),
                is_active  = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.role_name)
        .bind(patch.is_active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_role", e))?
        .ok_or(StoreError::NotFound)?;

        role_from_row(&row).map_err(|e| decode_error("update_role", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_role(&self, id: RoleId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_roles(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM roles")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_roles", e))?;
        count_from(&row, "count_roles")
    }

    #[instrument(skip(self, permissions), fields(role_id = %role_id, count = permissions.len()), err)]
    async fn add_role_privileges(
        &self,
        role_id: RoleId,
        permissions: &[Permission],
        created_by: Option<UserId>,
    ) -> StoreResult<()> {
        if permissions.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = permissions.iter().map(|p| p.as_str().to_string()).collect();

        sqlx::query(
            r#"
            INSERT INTO role_privileges (role_id, permission, created_by)
            SELECT $1, key, $3 FROM UNNEST($2::text[]) AS key
            ON CONFLICT (role_id, permission) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(&keys)
        .bind(created_by.map(Uuid::from))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_role_privileges", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn delete_role_privileges(&self, role_id: RoleId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM role_privileges WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_role_privileges", e))?;
        Ok(result.rows_affected())
    }

    async fn list_role_privileges(&self, role_id: RoleId) -> StoreResult<Vec<RolePrivilege>> {
        let rows = sqlx::query(
            r#"
            SELECT role_id, permission, created_by, created_at
            FROM role_privileges
            WHERE role_id = $1
            ORDER BY created_at ASC, permission ASC
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_role_privileges", e))?;
        map_rows(rows, "list_role_privileges", role_privilege_from_row)
    }

    async fn privileges_for_roles(&self, role_ids: &[RoleId]) -> StoreResult<Vec<Permission>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query("SELECT permission FROM role_privileges WHERE role_id = ANY($1)")
            .bind(uuids(role_ids))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("privileges_for_roles", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("permission")
                    .map(Permission::new)
                    .map_err(|e| decode_error("privileges_for_roles", e))
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User ↔ role edges
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl UserRoleStore for PostgresStore {
    #[instrument(skip(self, role_ids), fields(user_id = %user_id, count = role_ids.len()), err)]
    async fn assign_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> StoreResult<()> {
        if role_ids.is_empty() {
            return Ok(());
        }
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            SELECT $1, role_id FROM UNNEST($2::uuid[]) AS role_id
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(uuids(role_ids))
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("assign_roles", e))?;
        Ok(())
    }

    async fn clear_user_roles(&self, user_id: UserId) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_user_roles", e))?;
        Ok(result.rows_affected())
    }

    async fn roles_of_user(&self, user_id: UserId) -> StoreResult<Vec<RoleId>> {
        let rows = sqlx::query("SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY created_at ASC")
            .bind(user_id.as_uuid())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("roles_of_user", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<Uuid, _>("role_id")
                    .map(RoleId::from_uuid)
                    .map_err(|e| decode_error("roles_of_user", e))
            })
            .collect()
    }

    async fn role_links_for_users(&self, user_ids: &[UserId]) -> StoreResult<Vec<UserRoleLink>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT user_id, role_id, created_at FROM user_roles WHERE user_id = ANY($1) ORDER BY created_at ASC",
        )
        .bind(uuids(user_ids))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("role_links_for_users", e))?;

        map_rows(rows, "role_links_for_users", |row| {
            Ok(UserRoleLink {
                user_id: UserId::from_uuid(row.try_get("user_id")?),
                role_id: RoleId::from_uuid(row.try_get("role_id")?),
                created_at: row.try_get("created_at")?,
            })
        })
    }

    async fn count_users_with_role(&self, role_id: RoleId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM user_roles WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users_with_role", e))?;
        count_from(&row, "count_users_with_role")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Categories
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl CategoryStore for PostgresStore {
    async fn insert_category(&self, category: CategoryRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(category.is_active)
        .bind(category.created_by.map(Uuid::from))
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(())
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategoryRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;
        map_rows(rows, "list_categories", category_from_row)
    }

    async fn update_category(&self, id: CategoryId, patch: CategoryPatch) -> StoreResult<CategoryRecord> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE categories SET
                name       = COALESCE($2, name),
                is_active  = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(patch.name)
        .bind(patch.is_active)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_category", e))?
        .ok_or(StoreError::NotFound)?;

        category_from_row(&row).map_err(|e| decode_error("update_category", e))
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_categories(&self) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM categories")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_categories", e))?;
        count_from(&row, "count_categories")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audit
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl AuditStore for PostgresStore {
    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, level, email, location, proc_type, log, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.level.as_str())
        .bind(&entry.email)
        .bind(&entry.location)
        .bind(&entry.proc_type)
        .bind(&entry.log)
        .bind(entry.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append_audit", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn query_audit(&self, query: &AuditQuery) -> StoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, level, email, location, proc_type, log, created_at
            FROM audit_logs
            WHERE created_at >= $1 AND created_at <= $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.begin)
        .bind(query.end)
        .bind(query.limit as i64)
        .bind(query.skip as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("query_audit", e))?;
        map_rows(rows, "query_audit", audit_from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("ann"), "%ann%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn schema_creates_every_table() {
        for table in ["users", "roles", "role_privileges", "user_roles", "categories", "audit_logs"] {
            assert!(
                SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table} ")),
                "missing table {table}"
            );
        }
    }
}
