//! `warden-infra`: persistence and the audit trail.
//!
//! Stores come in two flavors behind the same traits: an in-memory store for
//! tests and local runs, and a Postgres store for persistent deployments.

pub mod audit;
pub mod models;
pub mod store;

pub use audit::AuditRecorder;
pub use store::{InMemoryStore, PostgresStore, Store, StoreError, StoreResult};
