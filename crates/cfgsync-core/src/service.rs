//! Caller operations over the pipeline
//!
//! Single-file upsert, bulk path deletion and archive upload. Each one
//! authorizes its changes first, so unauthorized paths never reach the
//! validator, and runs under the configured wall-clock timeout.

use crate::applier::ChangeSource;
use crate::archive::extract_changes;
use crate::collab::{AllowAll, Authorizer};
use crate::error::{PipelineError, SkipMap, SkipReason, SkipRecord};
use crate::pipeline::ChangeSetPipeline;
use crate::report::{report_for, OperationResponse};
use cfgsync_model::{Change, ChangeType, FileOperationStatus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Content used for delete changes, which carry no document of their own
pub const DEFAULT_DELETE_CONTENT: &str = "harnessApiVersion: '1.0'";

/// Entry points used by API callers
#[derive(Clone)]
pub struct ConfigSyncService {
    pipeline: Arc<ChangeSetPipeline>,
    authorizer: Arc<dyn Authorizer>,
    timeout: Duration,
}

impl std::fmt::Debug for ConfigSyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSyncService")
            .field("pipeline", &self.pipeline)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ConfigSyncService {
    /// Create service that authorizes everything
    #[must_use]
    pub fn new(pipeline: Arc<ChangeSetPipeline>) -> Self {
        let timeout = pipeline.config().operation_timeout();
        Self {
            pipeline,
            authorizer: Arc::new(AllowAll),
            timeout,
        }
    }

    /// With authorizer
    #[inline]
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// With operation timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Pipeline in use
    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &ChangeSetPipeline {
        &self.pipeline
    }

    /// Create or update one file
    ///
    /// Empty content is rejected before anything runs.
    pub async fn upsert_file(
        &self,
        tenant_id: &str,
        path: &str,
        content: &str,
        declared_entity_id: Option<&str>,
    ) -> OperationResponse {
        if content.trim().is_empty() {
            return OperationResponse::failed(
                "File content cannot be empty",
                vec![FileOperationStatus::failed(path, "File content cannot be empty")],
            );
        }

        let mut change = Change::modify(tenant_id, path, content);
        if let Some(id) = declared_entity_id {
            change = change.with_entity_id(id);
        }
        self.run(vec![change], ChangeSource::Direct).await
    }

    /// Delete files by path
    ///
    /// Each path is authorized on its own; denied paths are reported Skipped.
    pub async fn delete_paths(&self, tenant_id: &str, paths: &[String]) -> OperationResponse {
        let changes = paths
            .iter()
            .map(|path| {
                Change::new(tenant_id, path.as_str(), ChangeType::Delete, DEFAULT_DELETE_CONTENT)
            })
            .collect();
        self.run(changes, ChangeSource::Direct).await
    }

    /// Apply every recognized file of a zip archive
    ///
    /// `prefix` is prepended to entry paths when given.
    pub async fn upload_archive(
        &self,
        tenant_id: &str,
        bytes: &[u8],
        prefix: Option<&str>,
    ) -> OperationResponse {
        let changes = match extract_changes(bytes, tenant_id, prefix) {
            Ok(changes) => changes,
            Err(err) => {
                tracing::warn!(error = %err, "archive rejected");
                return OperationResponse::failed(PipelineError::from(err).to_string(), Vec::new());
            }
        };
        self.run(changes, ChangeSource::Direct).await
    }

    /// Apply an already assembled change list
    pub async fn apply_changes(&self, changes: Vec<Change>) -> OperationResponse {
        self.run(changes, ChangeSource::Direct).await
    }

    /// Apply changes read from a version-control commit
    pub async fn sync_commit(&self, changes: Vec<Change>) -> OperationResponse {
        self.run(changes, ChangeSource::VersionControl).await
    }

    async fn run(&self, changes: Vec<Change>, source: ChangeSource) -> OperationResponse {
        let result = with_timeout(self.timeout, async {
            let (admitted, denied) = self.authorize(&changes).await;
            let outcome = self.pipeline.apply(admitted, source).await;
            report_for(&changes, outcome, &denied)
        })
        .await;

        match result {
            Ok(files) => OperationResponse::from_files(files),
            Err(err) => {
                tracing::error!(error = %err, files = changes.len(), "operation aborted");
                let message = err.to_string();
                let files = changes
                    .iter()
                    .map(|c| FileOperationStatus::failed(&c.path, message.clone()))
                    .collect();
                OperationResponse::failed(message, files)
            }
        }
    }

    async fn authorize(&self, changes: &[Change]) -> (Vec<Change>, SkipMap) {
        let mut admitted = Vec::with_capacity(changes.len());
        let mut denied = SkipMap::new();
        for change in changes {
            match self
                .authorizer
                .authorize(change.change_type, &change.path, &change.tenant_id)
                .await
            {
                Ok(()) => admitted.push(change.clone()),
                Err(err) => {
                    tracing::warn!(path = %change.path, error = %err, "change not authorized");
                    denied.insert(
                        change.path.clone(),
                        SkipRecord::new(change.clone(), SkipReason::AuthorizationDenied),
                    );
                }
            }
        }
        (admitted, denied)
    }
}

async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| Err(PipelineError::Timeout { secs: limit.as_secs() }))
}
