use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    routing::{get, post},
    Json, Router,
};

use warden_auth::permissions::{CATEGORY_ADD, CATEGORY_DELETE, CATEGORY_UPDATE, CATEGORY_VIEW};
use warden_infra::models::CategoryRecord;

use super::requires;
use crate::app::dto::{ok, AddCategoryRequest, Envelope, IdRequest, Success, UpdateCategoryRequest};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/categories", requires(CATEGORY_VIEW, get(list_categories)))
        .route("/categories/add", requires(CATEGORY_ADD, post(add_category)))
        .route("/categories/update", requires(CATEGORY_UPDATE, post(update_category)))
        .route("/categories/delete", requires(CATEGORY_DELETE, post(delete_category)))
}

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> ApiResult<Json<Envelope<Vec<CategoryRecord>>>> {
    Ok(ok(services.list_categories().await?))
}

pub async fn add_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<AddCategoryRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<CategoryRecord>>> {
    let Json(body) = body?;
    Ok(ok(services.add_category(&principal, body).await?))
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<UpdateCategoryRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.update_category(&principal, body).await?))
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<Success>>> {
    let Json(body) = body?;
    Ok(ok(services.delete_category(&principal, body).await?))
}
