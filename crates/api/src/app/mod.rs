//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: validation, store calls and audit for every operation
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request/response DTOs and the success envelope
//! - `errors.rs`: error taxonomy and the error envelope

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router};
use tower::ServiceBuilder;

use warden_auth::Hs256JwtValidator;
use warden_infra::{AuditRecorder, InMemoryStore, PostgresStore, Store};

use crate::config::{ApiConfig, StoreBackend};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router, connecting to the configured store.
///
/// An unreachable database is an error here; `main` treats it as fatal.
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(build_app_with_store(config, Arc::new(InMemoryStore::new())))
        }
        StoreBackend::Postgres { database_url } => {
            let store = PostgresStore::connect(database_url)
                .await
                .context("failed to connect to database")?;
            store.migrate().await.context("failed to apply database schema")?;
            tracing::info!("using postgres stores");
            Ok(build_app_with_store(config, Arc::new(store)))
        }
    }
}

/// Build the router around an already constructed store.
pub fn build_app_with_store<S>(config: &ApiConfig, store: Arc<S>) -> Router
where
    S: Store + 'static,
{
    let jwt = Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes(), config.jwt_expire_secs));
    let audit = AuditRecorder::new(store.clone());
    let store: Arc<dyn Store> = store;

    let auth_state = middleware::AuthState {
        jwt: jwt.clone(),
        store: store.clone(),
    };
    let services = Arc::new(services::AppServices::new(
        store,
        audit,
        jwt,
        config.audit_query_max_limit,
    ));

    // Protected routes: bearer token + live user lookup, then per-route privilege.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
