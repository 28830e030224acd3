use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    routing::post,
    Json, Router,
};

use warden_auth::permissions::AUDITLOG_VIEW;
use warden_infra::models::AuditEntry;

use super::requires;
use crate::app::dto::{ok, AuditLogQuery, Envelope};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/auditlogs", requires(AUDITLOG_VIEW, post(list_audit_logs)))
}

/// POST /auditlogs
///
/// The body is optional; an empty body means the default window.
pub async fn list_audit_logs(
    Extension(services): Extension<Arc<AppServices>>,
    body: Bytes,
) -> ApiResult<Json<Envelope<Vec<AuditEntry>>>> {
    let query = if body.iter().all(u8::is_ascii_whitespace) {
        AuditLogQuery::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?
    };
    Ok(ok(services.audit_logs(query).await?))
}
