//! Per-route privilege guard.
//!
//! Runs after [`crate::middleware::auth_middleware`] has attached a
//! [`PrincipalContext`]; a route declares the privilege it needs with
//! `route_layer(from_fn_with_state(PERMISSION, require_permission))`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use warden_auth::{authorize, Permission};

use crate::app::errors::ApiError;
use crate::context::PrincipalContext;

pub async fn require_permission(
    State(required): State<Permission>,
    req: Request,
    next: Next,
) -> Response {
    let Some(principal) = req.extensions().get::<PrincipalContext>() else {
        // Route mounted outside the auth middleware.
        return ApiError::authentication().into_response();
    };

    if let Err(err) = authorize(principal.principal(), &required) {
        tracing::info!(
            user_id = %principal.user_id(),
            permission = %required,
            reason = %err,
            "request denied"
        );
        return ApiError::from(err).into_response();
    }

    next.run(req).await
}
