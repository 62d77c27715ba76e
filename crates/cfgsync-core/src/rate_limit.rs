//! Commit-level rate limiter using moka
//!
//! Remembers (commit, tenant) pairs whose application hit a usage quota, so the
//! rest of that commit is skipped instead of failing the same way again.
//! Entries expire a fixed time after they were written.

use moka::future::Cache;
use std::time::Duration;

/// Time-expiring set of rate-limited commits
#[derive(Debug, Clone)]
pub struct CommitRateLimiter {
    inner: Cache<(String, String), ()>,
}

impl CommitRateLimiter {
    /// Create limiter with the given window
    #[inline]
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Whether changes from this commit should be skipped
    #[must_use]
    pub fn should_skip(&self, commit_id: &str, tenant_id: &str) -> bool {
        self.inner
            .contains_key(&(commit_id.to_string(), tenant_id.to_string()))
    }

    /// Record a usage-limit violation for a commit
    pub async fn record_exceeded(&self, commit_id: &str, tenant_id: &str) {
        tracing::warn!(commit_id, tenant_id, "commit rate limited");
        self.inner
            .insert((commit_id.to_string(), tenant_id.to_string()), ())
            .await;
    }

    /// Approximate number of live entries
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for CommitRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60))
    }
}
