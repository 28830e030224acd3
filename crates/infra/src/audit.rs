//! Audit trail writer.
//!
//! Every mutating call and every login attempt produces one [`AuditEntry`].
//! Writes are fire-and-forget: the entry is mirrored as a tracing event
//! immediately and persisted on a background task, so a failing audit backend
//! never fails the request that triggered it.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;

use warden_core::AuditEntryId;

use crate::models::{AuditEntry, AuditLevel};
use crate::store::AuditStore;

/// Placeholder actor for calls made before anyone is authenticated.
pub const ANONYMOUS: &str = "anonymous";

/// Resource locations recorded in `location`.
pub mod location {
    pub const USERS: &str = "Users";
    pub const ROLES: &str = "Roles";
    pub const CATEGORIES: &str = "Categories";
}

/// Action types recorded in `proc_type`.
pub mod action {
    pub const ADD: &str = "Add";
    pub const UPDATE: &str = "Update";
    pub const DELETE: &str = "Delete";
    pub const LOGIN: &str = "Login";
}

#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub fn info(&self, email: &str, location: &str, proc_type: &str, log: Value) -> Option<JoinHandle<()>> {
        self.record(AuditLevel::Info, email, location, proc_type, log)
    }

    pub fn warn(&self, email: &str, location: &str, proc_type: &str, log: Value) -> Option<JoinHandle<()>> {
        self.record(AuditLevel::Warn, email, location, proc_type, log)
    }

    pub fn error(&self, email: &str, location: &str, proc_type: &str, log: Value) -> Option<JoinHandle<()>> {
        self.record(AuditLevel::Error, email, location, proc_type, log)
    }

    /// Mirror the entry to tracing and persist it in the background.
    ///
    /// Returns the write task, or `None` outside a Tokio runtime (the entry is
    /// then only logged).
    pub fn record(
        &self,
        level: AuditLevel,
        email: &str,
        location: &str,
        proc_type: &str,
        log: Value,
    ) -> Option<JoinHandle<()>> {
        let entry = AuditEntry {
            id: AuditEntryId::new(),
            level,
            email: email.to_string(),
            location: location.to_string(),
            proc_type: proc_type.to_string(),
            log,
            created_at: Utc::now(),
        };

        match entry.level {
            AuditLevel::Error => tracing::error!(
                target: "audit", email = %entry.email, location = %entry.location,
                proc_type = %entry.proc_type, log = %entry.log, "audit"
            ),
            AuditLevel::Warn => tracing::warn!(
                target: "audit", email = %entry.email, location = %entry.location,
                proc_type = %entry.proc_type, log = %entry.log, "audit"
            ),
            _ => tracing::info!(
                target: "audit", email = %entry.email, location = %entry.location,
                proc_type = %entry.proc_type, log = %entry.log, "audit"
            ),
        }

        let handle = tokio::runtime::Handle::try_current().ok()?;
        let store = self.store.clone();
        Some(handle.spawn(async move {
            let id = entry.id;
            if let Err(err) = store.append_audit(entry).await {
                tracing::error!(audit_id = %id, error = %err, "failed to persist audit entry");
            }
        }))
    }
}

impl core::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuditRecorder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::models::AuditQuery;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn recorded_entries_are_persisted() {
        let store = Arc::new(InMemoryStore::new());
        let recorder = AuditRecorder::new(store.clone());

        recorder
            .info("a@x.com", location::ROLES, action::ADD, json!({"role_name": "Editors"}))
            .unwrap()
            .await
            .unwrap();
        recorder
            .error("a@x.com", location::ROLES, action::DELETE, json!({"error": "not found"}))
            .unwrap()
            .await
            .unwrap();

        let now = Utc::now();
        let hits = store
            .query_audit(&AuditQuery { begin: now - Duration::minutes(1), end: now, skip: 0, limit: 10 })
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].level, AuditLevel::Error);
        assert_eq!(hits[0].proc_type, "Delete");
        assert_eq!(hits[1].log["role_name"], "Editors");
    }

    #[test]
    fn outside_a_runtime_nothing_is_spawned() {
        let recorder = AuditRecorder::new(Arc::new(InMemoryStore::new()));
        assert!(recorder.warn(ANONYMOUS, location::USERS, action::LOGIN, json!({})).is_none());
    }
}
