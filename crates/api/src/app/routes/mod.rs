use axum::{middleware::from_fn_with_state, routing::MethodRouter, Router};

use warden_auth::Permission;

use crate::authz;

pub mod auditlogs;
pub mod categories;
pub mod roles;
pub mod system;
pub mod users;

/// Endpoints reachable without a bearer token.
pub fn public_router() -> Router {
    Router::new()
        .merge(system::public_router())
        .merge(users::public_router())
}

/// Endpoints behind the auth middleware.
pub fn protected_router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(users::router())
        .merge(roles::router())
        .merge(categories::router())
        .merge(auditlogs::router())
}

/// Gate a route on one privilege key.
pub(crate) fn requires(permission: Permission, route: MethodRouter) -> MethodRouter {
    route.route_layer(from_fn_with_state(permission, authz::require_permission))
}
