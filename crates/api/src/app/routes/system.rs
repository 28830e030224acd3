use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::get, Json, Router};

use crate::app::dto::{ok, Envelope, MeView, StatsView};
use crate::app::errors::ApiResult;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn public_router() -> Router {
    Router::new().route("/health", get(health))
}

pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(me))
        .route("/stats", get(stats))
}

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /auth/me
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> ApiResult<Json<Envelope<MeView>>> {
    Ok(ok(services.me(&principal).await?))
}

/// GET /stats
pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> ApiResult<Json<Envelope<StatsView>>> {
    Ok(ok(services.stats().await?))
}
