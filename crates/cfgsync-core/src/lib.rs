//! cfgsync Core - change-set ingestion and ordered application
//!
//! Takes a batch of file-level changes (from a commit diff, an archive upload
//! or a single edit) and applies them:
//! - Classifies and validates every file in isolation
//! - Orders changes by the dependency order of their kinds
//! - Applies same-(kind, operation) batches concurrently, one batch at a time
//! - Refreshes permission caches once per batch
//! - Skips commits that recently exceeded a usage quota
//! - Reports exactly one status per input file
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgsync_core::{ChangeSetPipeline, ChangeSource, PipelineConfig};
//! use cfgsync_handler::{HandlerRegistry, MemoryStore};
//! use cfgsync_model::Change;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = ChangeSetPipeline::new(PipelineConfig::new(), HandlerRegistry::in_memory(&store))?;
//!
//! let changes = vec![Change::add("t1", "Setup/Cloud Providers/aws.yaml", "type: AWS\n")];
//! let applied = pipeline.apply(changes, ChangeSource::Direct).await?;
//! println!("applied {} file(s)", applied.applied.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod applier;
pub mod archive;
pub mod collab;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod rate_limit;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod validator;

pub use applier::{Applier, BatchOutcome, ChangeSource, ItemOutcome};
pub use archive::{extract_changes, is_candidate, join_prefix};
pub use collab::{
    AllowAll, Authorizer, CacheInvalidator, MemorySyncErrorStore, NoopInvalidator,
    NoopSyncErrorStore, SyncErrorStore,
};
pub use config::PipelineConfig;
pub use error::{
    ArchiveError, AuthError, ConfigError, ErrorKind, ErrorRecord, FailureMap, PartialFailure,
    PipelineError, SkipMap, SkipReason, SkipRecord,
};
pub use pipeline::{AppliedChangeSet, ChangeSetPipeline, Plan, PlannedBatch};
pub use rate_limit::CommitRateLimiter;
pub use report::{build_report, report_for, OperationResponse, OperationStatus, StatusSummary};
pub use scheduler::{order_key, partition, schedule, sort_contexts, Batch};
pub use service::{ConfigSyncService, DEFAULT_DELETE_CONTENT};
pub use validator::{ValidationOutcome, Validator};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with cfgsync Core
    pub use crate::{
        ChangeSetPipeline, ChangeSource, ConfigSyncService, OperationResponse, PipelineConfig,
        PipelineError,
    };
    pub use cfgsync_handler::{HandlerRegistry, MemoryStore};
    pub use cfgsync_model::{Change, ChangeType, FileOperationStatus, FileStatus};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
