use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use warden_auth::{effective_privileges, JwtValidator, Principal};
use warden_infra::store::{RoleStore, UserRoleStore, UserStore};
use warden_infra::Store;

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: Arc<dyn Store>,
}

/// Authenticate the bearer token and resolve the caller against the store.
///
/// The token only proves identity; the user is re-read on every request so a
/// deactivated or deleted account is refused even while its token is unexpired.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers()).ok_or_else(ApiError::authentication)?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "token rejected");
        ApiError::authentication()
    })?;

    let user = state
        .store
        .get_user(claims.id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| {
            tracing::info!(user_id = %claims.id, "token holder is missing or inactive");
            ApiError::authentication()
        })?;

    let roles = state.store.roles_of_user(user.id).await?;
    let privileges = effective_privileges(state.store.privileges_for_roles(&roles).await?);

    req.extensions_mut().insert(PrincipalContext::new(Principal {
        user_id: user.id,
        email: user.email,
        roles,
        privileges,
    }));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
    }

    #[test]
    fn other_schemes_and_blank_tokens_are_ignored() {
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
