//! Handler contract and change context

use crate::document::ParsedObject;
use crate::error::HandlerError;
use async_trait::async_trait;
use cfgsync_model::{Change, EntityKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Reference to a persisted entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    /// Stable entity identifier
    pub id: String,
    /// Kind of the entity
    pub kind: EntityKind,
    /// Path the entity was read from
    pub path: String,
}

/// Per-kind parse/get/apply/delete capability
///
/// Implementations must tolerate concurrent calls for distinct paths of the
/// same kind. Calls for one (kind, operation) batch never overlap with calls
/// from another batch.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Kind served by this handler
    fn kind(&self) -> EntityKind;

    /// Parse file content into a domain object
    ///
    /// # Errors
    /// Parse or structural failures, isolated to the file
    fn parse(&self, content: &str) -> Result<ParsedObject, HandlerError>;

    /// Resolve the entity currently stored at `path`
    ///
    /// # Errors
    /// `HandlerError::Unsupported` when the kind cannot be looked up
    async fn get(&self, tenant_id: &str, path: &str) -> Result<Option<EntityRef>, HandlerError>;

    /// Create or update the entity described by `ctx`
    ///
    /// `all` holds every validated context of the run, in scheduled order.
    ///
    /// # Errors
    /// Any application failure, isolated to the file
    async fn apply(
        &self,
        ctx: &ChangeContext,
        all: &[ChangeContext],
    ) -> Result<EntityRef, HandlerError>;

    /// Remove the entity described by `ctx`
    ///
    /// # Errors
    /// Any removal failure, isolated to the file
    async fn delete(&self, ctx: &ChangeContext) -> Result<(), HandlerError>;
}

/// A validated change bound to its kind and handler
#[derive(Clone)]
pub struct ChangeContext {
    /// Input change
    pub change: Change,
    /// Resolved kind
    pub kind: EntityKind,
    /// Parsed object; absent for deletes and renames
    pub parsed: Option<ParsedObject>,
    /// Handler for `kind`
    pub handler: Arc<dyn Handler>,
    /// Entity written by a successful apply
    pub entity: Option<EntityRef>,
}

impl ChangeContext {
    /// Create new context
    #[inline]
    #[must_use]
    pub fn new(
        change: Change,
        kind: EntityKind,
        parsed: Option<ParsedObject>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            change,
            kind,
            parsed,
            handler,
            entity: None,
        }
    }

    /// Path of the underlying change
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.change.path
    }

    /// Identifier of the applied entity, if any
    #[inline]
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.entity.as_ref().map(|e| e.id.as_str())
    }
}

impl fmt::Debug for ChangeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeContext")
            .field("path", &self.change.path)
            .field("change_type", &self.change.change_type)
            .field("kind", &self.kind)
            .field("parsed", &self.parsed.is_some())
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}
