//! Concurrent batch applier
//!
//! Every item of a batch runs as its own tokio task. The applier joins all of
//! them, then refreshes permission caches once for the batch, and only then
//! returns. Callers run batches one after another, so the join is the barrier
//! between dependency levels.

use crate::collab::{CacheInvalidator, SyncErrorStore};
use crate::error::{ErrorKind, ErrorRecord, SkipReason, SkipRecord};
use crate::rate_limit::CommitRateLimiter;
use crate::scheduler::Batch;
use cfgsync_handler::{ChangeContext, EntityRef, HandlerError};
use cfgsync_model::{invalidation_scope, ChangeType};
use futures::future::join_all;
use std::sync::Arc;

/// Where a change set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChangeSource {
    /// Read from a version-control commit
    VersionControl,
    /// Submitted directly by a user
    #[default]
    Direct,
}

/// Terminal result of one item
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    /// Handler succeeded; renames carry no entity
    Applied(Option<EntityRef>),
    /// Item failed
    Failed(ErrorRecord),
    /// Item never reached its handler
    Skipped(SkipRecord),
}

/// Outcomes of one batch, keyed by position in the context list
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Per-item outcomes in batch order
    pub items: Vec<(usize, ItemOutcome)>,
}

/// Applies batches concurrently with a barrier and cache refresh per batch
#[derive(Clone)]
pub struct Applier {
    rate_limiter: CommitRateLimiter,
    invalidator: Arc<dyn CacheInvalidator>,
    sync_errors: Arc<dyn SyncErrorStore>,
}

impl std::fmt::Debug for Applier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier")
            .field("rate_limiter", &self.rate_limiter)
            .finish_non_exhaustive()
    }
}

impl Applier {
    /// Create applier
    #[inline]
    #[must_use]
    pub fn new(
        rate_limiter: CommitRateLimiter,
        invalidator: Arc<dyn CacheInvalidator>,
        sync_errors: Arc<dyn SyncErrorStore>,
    ) -> Self {
        Self {
            rate_limiter,
            invalidator,
            sync_errors,
        }
    }

    /// Apply one batch and wait for every item
    ///
    /// `all` is the full scheduled context list; `batch.range` selects the
    /// items to run. A panicking handler fails only its own item.
    pub async fn run_batch(
        &self,
        all: &Arc<Vec<ChangeContext>>,
        batch: &Batch,
        source: ChangeSource,
    ) -> BatchOutcome {
        tracing::info!(
            kind = %batch.kind,
            operation = %batch.change_type,
            items = batch.len(),
            "applying batch"
        );

        let handles = batch.range.clone().map(|idx| {
            let all = Arc::clone(all);
            let limiter = self.rate_limiter.clone();
            let sync_errors = Arc::clone(&self.sync_errors);
            tokio::spawn(async move {
                let ctx = &all[idx];
                let outcome = apply_item(ctx, &all, &limiter).await;
                if matches!(outcome, ItemOutcome::Applied(_)) && source == ChangeSource::VersionControl {
                    sync_errors.discard(&ctx.change.tenant_id, &ctx.change.path).await;
                }
                outcome
            })
        });
        let joined = join_all(handles).await;

        let items: Vec<(usize, ItemOutcome)> = batch
            .range
            .clone()
            .zip(joined)
            .map(|(idx, joined)| {
                let outcome = joined.unwrap_or_else(|err| {
                    let ctx = &all[idx];
                    tracing::error!(path = %ctx.change.path, error = %err, "handler task aborted");
                    ItemOutcome::Failed(ErrorRecord::new(
                        ctx.change.clone(),
                        ErrorKind::HandlerException,
                        format!("handler task aborted: {err}"),
                    ))
                });
                (idx, outcome)
            })
            .collect();

        self.invalidate(all, batch).await;
        BatchOutcome { items }
    }

    async fn invalidate(&self, all: &[ChangeContext], batch: &Batch) {
        let Some(scope) = invalidation_scope(batch.kind, batch.change_type) else {
            return;
        };
        let mut tenants: Vec<&str> = Vec::new();
        for ctx in &all[batch.range.clone()] {
            if !tenants.contains(&ctx.change.tenant_id.as_str()) {
                tenants.push(&ctx.change.tenant_id);
            }
        }
        for tenant in tenants {
            tracing::debug!(tenant, kind = %batch.kind, ?scope, "invalidating permission caches");
            self.invalidator
                .invalidate(tenant, batch.kind, batch.change_type, scope)
                .await;
        }
    }
}

/// Apply a single item
async fn apply_item(
    ctx: &ChangeContext,
    all: &[ChangeContext],
    limiter: &CommitRateLimiter,
) -> ItemOutcome {
    let change = &ctx.change;

    if let Some(commit) = change.commit() {
        if limiter.should_skip(commit, &change.tenant_id) {
            return ItemOutcome::Skipped(SkipRecord::new(change.clone(), SkipReason::RateLimited));
        }
    }

    let result = match change.change_type {
        ChangeType::Add | ChangeType::Modify => {
            if let Err(record) = check_identity(ctx).await {
                tracing::warn!(path = %change.path, message = %record.message, "identity conflict");
                return ItemOutcome::Failed(record);
            }
            ctx.handler.apply(ctx, all).await.map(Some)
        }
        ChangeType::Delete => ctx.handler.delete(ctx).await.map(|()| None),
        ChangeType::Rename => {
            tracing::debug!(path = %change.path, "rename has no effect");
            Ok(None)
        }
    };

    match result {
        Ok(entity) => {
            tracing::debug!(path = %change.path, operation = %change.change_type, "applied");
            ItemOutcome::Applied(entity)
        }
        Err(err) => {
            if err.is_usage_limit() {
                if let Some(commit) = change.commit() {
                    limiter.record_exceeded(commit, &change.tenant_id).await;
                }
            }
            tracing::warn!(path = %change.path, error = %err, "apply failed");
            ItemOutcome::Failed(ErrorRecord::from_handler(change.clone(), &err))
        }
    }
}

/// Reject an upsert whose declared entity differs from the stored one
async fn check_identity(ctx: &ChangeContext) -> Result<(), ErrorRecord> {
    let change = &ctx.change;
    let Some(declared) = change.declared_entity() else {
        return Ok(());
    };
    if ctx.kind.skips_identity_check() {
        return Ok(());
    }

    match ctx.handler.get(&change.tenant_id, &change.path).await {
        Ok(Some(existing)) if existing.id != declared => Err(ErrorRecord::new(
            change.clone(),
            ErrorKind::IdentityConflict,
            format!(
                "Entity id mismatch for path [{}]: declared {declared}, found {}",
                change.path, existing.id
            ),
        )),
        Ok(_) | Err(HandlerError::Unsupported(_)) => Ok(()),
        Err(err) => Err(ErrorRecord::from_handler(change.clone(), &err)),
    }
}
