//! Change-set pipeline
//!
//! raw changes → rate-limit filter → validator → scheduler → applier (batch by
//! batch) → failure aggregation.

use crate::applier::{Applier, ChangeSource, ItemOutcome};
use crate::collab::{CacheInvalidator, NoopInvalidator, NoopSyncErrorStore, SyncErrorStore};
use crate::config::PipelineConfig;
use crate::error::{
    ConfigError, FailureMap, PartialFailure, PipelineError, SkipMap, SkipReason,
    SkipRecord,
};
use crate::rate_limit::CommitRateLimiter;
use crate::scheduler::{self, Batch};
use crate::validator::{ValidationOutcome, Validator};
use cfgsync_handler::{ChangeContext, HandlerRegistry, RuleSet};
use cfgsync_model::{Change, ChangeType, EntityKind};
use serde::Serialize;
use std::sync::Arc;

/// Result of a run where nothing failed
#[derive(Debug, Clone, Default)]
pub struct AppliedChangeSet {
    /// Contexts applied, in scheduled order
    pub applied: Vec<ChangeContext>,
    /// Files that never reached a handler
    pub skipped: SkipMap,
}

/// One batch of a dry-run plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedBatch {
    /// Kind shared by the batch
    pub kind: EntityKind,
    /// Operation shared by the batch
    pub change_type: ChangeType,
    /// Paths in application order
    pub paths: Vec<String>,
}

/// Dry-run schedule without any handler mutation
#[derive(Debug, Clone, Default)]
pub struct Plan {
    /// Batches in execution order
    pub batches: Vec<PlannedBatch>,
    /// Files that would fail validation
    pub failures: FailureMap,
    /// Files that would be skipped
    pub skipped: SkipMap,
}

/// Ordered, concurrent change-set pipeline
#[derive(Clone)]
pub struct ChangeSetPipeline {
    config: PipelineConfig,
    validator: Validator,
    rate_limiter: CommitRateLimiter,
    invalidator: Arc<dyn CacheInvalidator>,
    sync_errors: Arc<dyn SyncErrorStore>,
}

impl std::fmt::Debug for ChangeSetPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeSetPipeline")
            .field("config", &self.config)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl ChangeSetPipeline {
    /// Create pipeline over a handler registry
    ///
    /// # Errors
    /// `ConfigError::Invalid` if the configuration is out of range
    pub fn new(config: PipelineConfig, registry: HandlerRegistry) -> Result<Self, ConfigError> {
        config.validate()?;
        let validator = Validator::new(registry, &config.setup_root);
        let rate_limiter = CommitRateLimiter::new(config.commit_limit_ttl());
        Ok(Self {
            config,
            validator,
            rate_limiter,
            invalidator: Arc::new(NoopInvalidator),
            sync_errors: Arc::new(NoopSyncErrorStore),
        })
    }

    /// With permission-cache invalidator
    #[inline]
    #[must_use]
    pub fn with_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = invalidator;
        self
    }

    /// With sync-error store
    #[inline]
    #[must_use]
    pub fn with_sync_errors(mut self, store: Arc<dyn SyncErrorStore>) -> Self {
        self.sync_errors = store;
        self
    }

    /// With a shared rate limiter
    #[inline]
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: CommitRateLimiter) -> Self {
        self.rate_limiter = limiter;
        self
    }

    /// With declarative rules replacing the built-in set
    #[inline]
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.validator = self.validator.with_rules(rules);
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Rate limiter in use
    #[inline]
    #[must_use]
    pub fn rate_limiter(&self) -> &CommitRateLimiter {
        &self.rate_limiter
    }

    /// Validate, order and apply a change set
    ///
    /// # Errors
    /// `PipelineError::PartialFailure` when any file failed. Files applied
    /// before or after the failure stay applied.
    pub async fn apply(
        &self,
        changes: Vec<Change>,
        source: ChangeSource,
    ) -> Result<AppliedChangeSet, PipelineError> {
        tracing::info!(changes = changes.len(), ?source, "change set received");
        let original = changes.clone();

        let (admitted, mut skipped) = self.filter_rate_limited(changes);
        let ValidationOutcome {
            valid: mut contexts,
            mut failures,
            skipped: invalid_skips,
        } = self.validator.validate(admitted);
        skipped.extend(invalid_skips);

        let batches = scheduler::schedule(&mut contexts, self.config.max_parallel);
        let all = Arc::new(contexts);
        let applier = Applier::new(
            self.rate_limiter.clone(),
            Arc::clone(&self.invalidator),
            Arc::clone(&self.sync_errors),
        );

        let mut entities = vec![None; all.len()];
        let mut applied_flags = vec![false; all.len()];
        for batch in &batches {
            let outcome = applier.run_batch(&all, batch, source).await;
            for (idx, item) in outcome.items {
                match item {
                    ItemOutcome::Applied(entity) => {
                        applied_flags[idx] = true;
                        entities[idx] = entity;
                    }
                    ItemOutcome::Failed(record) => {
                        failures.insert(record.change.path.clone(), record);
                    }
                    ItemOutcome::Skipped(record) => {
                        skipped.insert(record.change.path.clone(), record);
                    }
                }
            }
        }

        let contexts = Arc::try_unwrap(all).unwrap_or_else(|shared| (*shared).clone());
        let applied: Vec<ChangeContext> = contexts
            .into_iter()
            .zip(entities)
            .zip(applied_flags)
            .filter(|(_, applied)| *applied)
            .map(|((mut ctx, entity), _)| {
                ctx.entity = entity;
                ctx
            })
            .collect();

        if source == ChangeSource::VersionControl {
            for record in failures.values() {
                self.sync_errors
                    .record(&record.change.tenant_id, &record.change.path, &record.message)
                    .await;
            }
        }

        tracing::info!(
            applied = applied.len(),
            failed = failures.len(),
            skipped = skipped.len(),
            "change set processed"
        );

        if failures.is_empty() {
            Ok(AppliedChangeSet { applied, skipped })
        } else {
            tracing::error!(
                failed = failures.len(),
                paths = ?failures.keys().collect::<Vec<_>>(),
                "change set finished with failures"
            );
            Err(PipelineError::PartialFailure(Box::new(PartialFailure {
                failures,
                applied,
                original,
                skipped,
            })))
        }
    }

    /// Validate and schedule without applying anything
    #[must_use]
    pub fn plan(&self, changes: Vec<Change>) -> Plan {
        let (admitted, mut skipped) = self.filter_rate_limited(changes);
        let ValidationOutcome {
            valid: mut contexts,
            failures,
            skipped: invalid_skips,
        } = self.validator.validate(admitted);
        skipped.extend(invalid_skips);

        let batches = scheduler::schedule(&mut contexts, self.config.max_parallel)
            .into_iter()
            .map(|Batch { kind, change_type, range }| PlannedBatch {
                kind,
                change_type,
                paths: contexts[range].iter().map(|c| c.change.path.clone()).collect(),
            })
            .collect();

        Plan {
            batches,
            failures,
            skipped,
        }
    }

    fn filter_rate_limited(&self, changes: Vec<Change>) -> (Vec<Change>, SkipMap) {
        let mut skipped = SkipMap::new();
        let admitted = changes
            .into_iter()
            .filter_map(|change| {
                let limited = change
                    .commit()
                    .is_some_and(|commit| self.rate_limiter.should_skip(commit, &change.tenant_id));
                if limited {
                    tracing::debug!(path = %change.path, "skipping rate-limited commit");
                    skipped.insert(
                        change.path.clone(),
                        SkipRecord::new(change, SkipReason::RateLimited),
                    );
                    None
                } else {
                    Some(change)
                }
            })
            .collect();
        (admitted, skipped)
    }
}
