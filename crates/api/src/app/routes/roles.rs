use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Query},
    routing::{get, post},
    Json, Router,
};

use warden_auth::permissions::{ROLE_ADD, ROLE_DELETE, ROLE_UPDATE, ROLE_VIEW};
use warden_infra::models::{RolePrivilege, RoleRecord};

use super::requires;
use crate::app::dto::{
    ok, AddRoleRequest, Envelope, IdRequest, PermissionsView, RolePrivilegesQuery, Success,
    UpdateRoleRequest,
};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/roles", requires(ROLE_VIEW, get(list_roles)))
        .route("/roles/permissions", requires(ROLE_VIEW, get(permissions)))
        .route("/roles/role_privileges", requires(ROLE_VIEW, get(role_privileges)))
        .route("/roles/add", requires(ROLE_ADD, post(add_role)))
        .route("/roles/update", requires(ROLE_UPDATE, post(update_role)))
        .route("/roles/delete", requires(ROLE_DELETE, post(delete_role)))
}

/// GET /roles
pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Envelope<Vec<RoleRecord>>>> {
    Ok(ok(services.list_roles().await?))
}

/// GET /roles/permissions - the static privilege catalog
pub async fn permissions(Extension(services): Extension<Arc<AppServices>>) -> Json<Envelope<PermissionsView>> {
    ok(services.permissions())
}

/// GET /roles/role_privileges?role_id=
pub async fn role_privileges(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<RolePrivilegesQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<Vec<RolePrivilege>>>> {
    let Query(query) = query?;
    Ok(ok(services.role_privileges(query).await?))
}

/// POST /roles/add
pub async fn add_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<AddRoleRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<RoleRecord>>> {
    let Json(body) = body?;
    Ok(ok(services.add_role(&principal, body).await?))
}

/// POST /roles/update
pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.update_role(&principal, body).await?))
}

/// POST /roles/delete
pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.delete_role(&principal, body).await?))
}
