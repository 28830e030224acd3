use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Extension, Query},
    routing::{get, post},
    Json, Router,
};

use warden_auth::permissions::{USER_ADD, USER_DELETE, USER_UPDATE, USER_VIEW};

use super::requires;
use crate::app::dto::{
    ok, AddUserRequest, Envelope, IdRequest, LoginRequest, LoginResponse, Success,
    UpdateUserRequest, UserPage, UsersQuery,
};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn public_router() -> Router {
    Router::new()
        .route("/users/login", post(login))
        .route("/users/register", post(register))
}

pub fn router() -> Router {
    Router::new()
        .route("/users", requires(USER_VIEW, get(list_users)))
        .route("/users/add", requires(USER_ADD, post(add_user)))
        .route("/users/update", requires(USER_UPDATE, post(update_user)))
        .route("/users/delete", requires(USER_DELETE, post(delete_user)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /users/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<LoginResponse>>> {
    let Json(body) = body?;
    Ok(ok(services.login(body).await?))
}

/// POST /users/register - one-time first-user setup
///
/// The body is decoded by the service, after the setup-completed check.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> ApiResult<Json<Envelope<Success>>> {
    Ok(ok(services.register(&body).await?))
}

/// GET /users
pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    query: Result<Query<UsersQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<UserPage>>> {
    let Query(query) = query?;
    Ok(ok(services.list_users(query).await?))
}

/// POST /users/add
pub async fn add_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<AddUserRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.add_user(&principal, body).await?))
}

/// POST /users/update
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.update_user(&principal, body).await?))
}

/// POST /users/delete
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.delete_user(&principal, body).await?))
}
