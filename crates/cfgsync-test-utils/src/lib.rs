//! Testing utilities for cfgsync workspace
//!
//! Shared test helpers, fixtures, and recording collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use cfgsync_core::{
    AuthError, Authorizer, CacheInvalidator, ChangeSetPipeline, PipelineConfig,
};
use cfgsync_handler::{
    parse_document, ChangeContext, EntityRef, Handler, HandlerError, HandlerRegistry, ParsedObject,
};
use cfgsync_model::{Change, ChangeType, EntityKind, InvalidationScope};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TENANT: &str = "tenant-1";
pub const SETUP_ROOT: &str = "Setup";

/// Something a recording collaborator observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Lookup {
        path: String,
    },
    Started {
        kind: EntityKind,
        change_type: ChangeType,
        path: String,
    },
    Finished {
        kind: EntityKind,
        change_type: ChangeType,
        path: String,
    },
    Invalidated {
        tenant_id: String,
        kind: EntityKind,
        change_type: ChangeType,
        scope: InvalidationScope,
    },
}

/// Ordered, shared event log
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    pub fn push(&self, event: Event) {
        self.events.lock().push(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Paths whose handler call started, in order
    pub fn started_paths(&self) -> Vec<String> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started { path, .. } => Some(path),
                _ => None,
            })
            .collect()
    }

    /// (operation, path) of started handler calls, in order
    pub fn started(&self) -> Vec<(ChangeType, String)> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                Event::Started {
                    change_type, path, ..
                } => Some((change_type, path)),
                _ => None,
            })
            .collect()
    }

    pub fn invalidations(&self) -> Vec<Event> {
        self.snapshot()
            .into_iter()
            .filter(|e| matches!(e, Event::Invalidated { .. }))
            .collect()
    }

    pub fn lookups(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|e| matches!(e, Event::Lookup { .. }))
            .count()
    }
}

/// Behaviour injected into recording handlers, keyed by path
#[derive(Debug, Default)]
pub struct Script {
    failures: DashMap<String, HandlerError>,
    existing: DashMap<String, String>,
    panics: DashSet<String>,
    delay: Mutex<Option<Duration>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Script {
    pub fn fail(&self, path: &str, error: HandlerError) {
        self.failures.insert(path.to_string(), error);
    }

    pub fn existing(&self, path: &str, id: &str) {
        self.existing.insert(path.to_string(), id.to_string());
    }

    pub fn panic_on(&self, path: &str) {
        self.panics.insert(path.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Highest number of handler calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, path: &str) -> Result<(), HandlerError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        assert!(!self.panics.contains(path), "scripted panic for {path}");
        match self.failures.get(path) {
            Some(err) => Err(err.value().clone()),
            None => Ok(()),
        }
    }
}

/// Handler that records every call and follows a [`Script`]
#[derive(Debug, Clone)]
pub struct RecordingHandler {
    kind: EntityKind,
    log: Arc<EventLog>,
    script: Arc<Script>,
}

impl RecordingHandler {
    pub fn new(kind: EntityKind, log: Arc<EventLog>, script: Arc<Script>) -> Self {
        Self { kind, log, script }
    }

    async fn call(&self, ctx: &ChangeContext) -> Result<(), HandlerError> {
        let change_type = ctx.change.change_type;
        let path = ctx.change.path.clone();
        self.log.push(Event::Started {
            kind: self.kind,
            change_type,
            path: path.clone(),
        });
        let result = self.script.enter(&path).await;
        self.log.push(Event::Finished {
            kind: self.kind,
            change_type,
            path,
        });
        result
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn parse(&self, content: &str) -> Result<ParsedObject, HandlerError> {
        if self.kind.is_raw_content() {
            Ok(ParsedObject::Raw(content.to_string()))
        } else {
            parse_document(content, None)
        }
    }

    async fn get(&self, _tenant_id: &str, path: &str) -> Result<Option<EntityRef>, HandlerError> {
        self.log.push(Event::Lookup {
            path: path.to_string(),
        });
        Ok(self.script.existing.get(path).map(|id| EntityRef {
            id: id.value().clone(),
            kind: self.kind,
            path: path.to_string(),
        }))
    }

    async fn apply(
        &self,
        ctx: &ChangeContext,
        _all: &[ChangeContext],
    ) -> Result<EntityRef, HandlerError> {
        self.call(ctx).await?;
        let id = self
            .script
            .existing
            .get(ctx.path())
            .map_or_else(|| format!("id:{}", ctx.path()), |id| id.value().clone());
        Ok(EntityRef {
            id,
            kind: self.kind,
            path: ctx.path().to_string(),
        })
    }

    async fn delete(&self, ctx: &ChangeContext) -> Result<(), HandlerError> {
        self.call(ctx).await
    }
}

/// Invalidator that records into the shared log
#[derive(Debug, Clone)]
pub struct RecordingInvalidator {
    log: Arc<EventLog>,
}

impl RecordingInvalidator {
    pub fn new(log: Arc<EventLog>) -> Self {
        Self { log }
    }
}

#[async_trait]
impl CacheInvalidator for RecordingInvalidator {
    async fn invalidate(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        change_type: ChangeType,
        scope: InvalidationScope,
    ) {
        self.log.push(Event::Invalidated {
            tenant_id: tenant_id.to_string(),
            kind,
            change_type,
            scope,
        });
    }
}

/// Authorizer denying a fixed set of paths
#[derive(Debug, Default)]
pub struct DenyList {
    denied: DashSet<String>,
}

impl DenyList {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denied: paths.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Authorizer for DenyList {
    async fn authorize(&self, _: ChangeType, path: &str, _: &str) -> Result<(), AuthError> {
        if self.denied.contains(path) {
            Err(AuthError::Denied {
                path: path.to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Recording handlers for every kind, sharing one log and script
#[derive(Debug, Clone)]
pub struct Harness {
    pub log: Arc<EventLog>,
    pub script: Arc<Script>,
    pub registry: HandlerRegistry,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let log = Arc::new(EventLog::default());
        let script = Arc::new(Script::default());
        let mut registry = HandlerRegistry::new();
        for kind in EntityKind::PROCESSING_ORDER {
            registry.register(RecordingHandler::new(kind, Arc::clone(&log), Arc::clone(&script)));
        }
        Self {
            log,
            script,
            registry,
        }
    }

    /// Pipeline over the recording handlers and invalidator
    pub fn pipeline(&self, config: PipelineConfig) -> ChangeSetPipeline {
        ChangeSetPipeline::new(config, self.registry.clone())
            .unwrap()
            .with_invalidator(Arc::new(RecordingInvalidator::new(Arc::clone(&self.log))))
    }
}

/// A path under the setup root that classifies as `kind`
pub fn path_for(kind: EntityKind, name: &str) -> String {
    let relative = kind
        .path_rule()
        .expression
        .replace("[^/]+", name)
        .replace(".+", name)
        .replace('\\', "");
    format!("{SETUP_ROOT}/{relative}")
}

/// Change of `kind` for the default tenant with valid content
pub fn change_for(kind: EntityKind, change_type: ChangeType, name: &str) -> Change {
    let content = match change_type {
        ChangeType::Delete => String::new(),
        _ if kind.is_raw_content() => format!("raw content of {name}"),
        _ => format!("harnessApiVersion: '1.0'\ntype: {kind}\nname: {name}\n"),
    };
    Change::new(TENANT, path_for(kind, name), change_type, content)
}
