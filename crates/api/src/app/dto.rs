use axum::Json;
use serde::{Deserialize, Serialize};

use warden_auth::{Permission, PrivilegeDefinition, PrivilegeGroup};
use warden_core::{PageInfo, RoleId, UserId};
use warden_infra::models::UserRecord;

// -------------------------
// Envelope
// -------------------------

/// `{ "code": 200, "data": .. }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { code: 200, data })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Success {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Success {
    pub fn done() -> Self {
        Self { success: true, message: None }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()) }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    /// Role ids.
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces every role assignment when present.
    pub roles: Option<Vec<String>>,
}

/// Body of the `*/delete` endpoints.
#[derive(Debug, Deserialize)]
pub struct IdRequest {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AddRoleRequest {
    pub role_name: String,
    pub is_active: Option<bool>,
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub role_name: Option<String>,
    pub is_active: Option<bool>,
    /// Replaces every privilege assignment when present.
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct RolePrivilegesQuery {
    pub role_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCategoryRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    pub begin_date: Option<String>,
    pub end_date: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, Serialize)]
pub struct LoginUser {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: LoginUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    #[serde(rename = "_id")]
    pub id: RoleId,
    pub role_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: UserRecord,
    pub roles: Vec<RoleSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub data: Vec<UserView>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeView {
    #[serde(flatten)]
    pub user: UserRecord,
    pub roles: Vec<RoleId>,
    pub privileges: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    pub users: u64,
    pub roles: u64,
    pub categories: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionsView {
    #[serde(rename = "privGroups")]
    pub priv_groups: &'static [PrivilegeGroup],
    pub privileges: &'static [PrivilegeDefinition],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_wraps_data_with_code() {
        let Json(env) = ok(Success::done());
        let json = serde_json::to_value(env).unwrap();
        assert_eq!(json, serde_json::json!({ "code": 200, "data": { "success": true } }));
    }

    #[test]
    fn login_user_serializes_plain_id() {
        let id = UserId::new();
        let user = LoginUser {
            id,
            email: "a@x.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
        };
        let json = serde_json::to_value(user).unwrap();
        assert_eq!(json["id"], serde_json::json!(id));
        assert!(json.get("_id").is_none());
    }

    #[test]
    fn update_requests_use_underscore_id() {
        let req: UpdateRoleRequest =
            serde_json::from_value(serde_json::json!({ "_id": "abc", "permissions": ["user_add"] })).unwrap();
        assert_eq!(req.id, "abc");
        assert_eq!(req.permissions.unwrap(), vec!["user_add".to_string()]);
    }
}
