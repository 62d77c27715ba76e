//! cfgsync CLI - plan and apply change sets from disk
//!
//! Reads a directory tree or a zip archive, then either prints the ordered
//! batch plan or applies every file into an in-memory entity store.
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgsync_cli::{apply, RunOptions};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let outcome = apply(Path::new("export.zip"), &RunOptions::new("tenant-1")).await?;
//! println!("{}", cfgsync_cli::render::response_text(&outcome.response));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod render;
pub mod source;

use anyhow::{Context, Result};
use cfgsync_core::{ChangeSetPipeline, ConfigSyncService, OperationResponse, PipelineConfig, Plan};
use cfgsync_handler::{HandlerRegistry, MemoryStore};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

pub use source::{is_archive, load_changes};

/// Settings shared by every subcommand
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Tenant owning the changes
    pub tenant_id: String,
    /// Path prepended to every file read from the source
    pub prefix: Option<String>,
    /// Pipeline settings
    pub config: PipelineConfig,
    /// Per-tenant entity cap of the in-memory store
    pub entity_limit: Option<usize>,
}

impl RunOptions {
    #[must_use]
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            prefix: None,
            config: PipelineConfig::default(),
            entity_limit: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_entity_limit(mut self, limit: usize) -> Self {
        self.entity_limit = Some(limit);
        self
    }

    fn store(&self) -> Arc<MemoryStore> {
        let store = match self.entity_limit {
            Some(limit) => MemoryStore::new().with_entity_limit(limit),
            None => MemoryStore::new(),
        };
        Arc::new(store)
    }
}

/// Result of an apply run
#[derive(Debug)]
pub struct ApplyOutcome {
    /// Per-file statuses
    pub response: OperationResponse,
    /// Store holding what was applied
    pub store: Arc<MemoryStore>,
}

/// Install the global tracing subscriber
///
/// Honours `RUST_LOG`, defaulting to `info`. Logs go to stderr.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

/// Load pipeline settings from a TOML file, or use defaults
///
/// # Errors
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn pipeline(options: &RunOptions, store: &Arc<MemoryStore>) -> Result<ChangeSetPipeline> {
    Ok(ChangeSetPipeline::new(
        options.config.clone(),
        HandlerRegistry::in_memory(store),
    )?)
}

/// Dry-run a source: classify, validate and schedule without applying
///
/// # Errors
/// Returns an error if the source cannot be read or the configuration is invalid.
pub fn plan(source: &Path, options: &RunOptions) -> Result<Plan> {
    let changes = load_changes(source, &options.tenant_id, options.prefix.as_deref())?;
    let pipeline = pipeline(options, &options.store())?;
    Ok(pipeline.plan(changes))
}

/// Apply a source into a fresh in-memory store
///
/// # Errors
/// Returns an error if the source cannot be read or the configuration is invalid.
/// Per-file failures are reported in the response instead.
pub async fn apply(source: &Path, options: &RunOptions) -> Result<ApplyOutcome> {
    let store = options.store();
    let service = ConfigSyncService::new(Arc::new(pipeline(options, &store)?));
    let prefix = options.prefix.as_deref();

    let response = if is_archive(source) {
        let bytes = fs::read(source).with_context(|| format!("cannot read {}", source.display()))?;
        service.upload_archive(&options.tenant_id, &bytes, prefix).await
    } else {
        let changes = load_changes(source, &options.tenant_id, prefix)?;
        service.apply_changes(changes).await
    };

    tracing::info!(
        status = ?response.status,
        entities = store.tenant_len(&options.tenant_id),
        "apply finished"
    );
    Ok(ApplyOutcome { response, store })
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
