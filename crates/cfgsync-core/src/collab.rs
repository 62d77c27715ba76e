//! Collaborators consumed by the pipeline
//!
//! Authorization, permission-cache invalidation and the per-path sync-error
//! store live outside this crate. Each seam is a trait with a trivial
//! implementation for callers that do not need it.

use crate::error::AuthError;
use async_trait::async_trait;
use cfgsync_model::{ChangeType, EntityKind, InvalidationScope};
use dashmap::DashMap;

/// Decides whether a tenant may change a path
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Authorize one operation
    ///
    /// # Errors
    /// `AuthError::Denied` when the caller may not change `path`
    async fn authorize(
        &self,
        change_type: ChangeType,
        path: &str,
        tenant_id: &str,
    ) -> Result<(), AuthError>;
}

/// Authorizer that permits everything
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Authorizer for AllowAll {
    async fn authorize(&self, _: ChangeType, _: &str, _: &str) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Refreshes permission caches after a batch
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Invalidate a tenant's caches for one (kind, operation) batch
    async fn invalidate(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        change_type: ChangeType,
        scope: InvalidationScope,
    );
}

/// Invalidator that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, _: &str, _: EntityKind, _: ChangeType, _: InvalidationScope) {}
}

/// Per-path record of the last version-control sync failure
#[async_trait]
pub trait SyncErrorStore: Send + Sync {
    /// Record a failure for a path
    async fn record(&self, tenant_id: &str, path: &str, message: &str);

    /// Clear any failure recorded for a path
    async fn discard(&self, tenant_id: &str, path: &str);
}

/// Store that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSyncErrorStore;

#[async_trait]
impl SyncErrorStore for NoopSyncErrorStore {
    async fn record(&self, _: &str, _: &str, _: &str) {}

    async fn discard(&self, _: &str, _: &str) {}
}

/// In-memory sync-error store
#[derive(Debug, Default)]
pub struct MemorySyncErrorStore {
    errors: DashMap<(String, String), String>,
}

impl MemorySyncErrorStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Message recorded for a path
    #[must_use]
    pub fn get(&self, tenant_id: &str, path: &str) -> Option<String> {
        self.errors
            .get(&(tenant_id.to_string(), path.to_string()))
            .map(|m| m.value().clone())
    }

    /// Number of recorded failures
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether nothing is recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[async_trait]
impl SyncErrorStore for MemorySyncErrorStore {
    async fn record(&self, tenant_id: &str, path: &str, message: &str) {
        self.errors
            .insert((tenant_id.to_string(), path.to_string()), message.to_string());
    }

    async fn discard(&self, tenant_id: &str, path: &str) {
        self.errors.remove(&(tenant_id.to_string(), path.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_record_and_discard() {
        let store = MemorySyncErrorStore::new();
        store.record("t1", "Setup/Tags.yaml", "bad").await;
        assert_eq!(store.get("t1", "Setup/Tags.yaml").as_deref(), Some("bad"));
        assert_eq!(store.get("t2", "Setup/Tags.yaml"), None);

        store.discard("t1", "Setup/Tags.yaml").await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn allow_all_permits() {
        assert!(AllowAll
            .authorize(ChangeType::Delete, "Setup/Tags.yaml", "t1")
            .await
            .is_ok());
    }
}
