//! In-memory reference handler
//!
//! Stores parsed objects per (tenant, path) in a shared concurrent map. Nested
//! application entities require their application to exist, and an
//! application cannot be deleted while anything below it remains, so applying
//! in the wrong order fails the same way a real domain store would.

use crate::document::{parse_document, ParsedObject};
use crate::error::HandlerError;
use crate::handler::{ChangeContext, EntityRef, Handler};
use async_trait::async_trait;
use cfgsync_model::EntityKind;
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::sync::Arc;

const APPLICATIONS_DIR: &str = "Applications/";
const INDEX_FILE: &str = "index.yaml";

/// Entity held by the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntity {
    /// Stable identifier
    pub id: String,
    /// Kind of the entity
    pub kind: EntityKind,
    /// Last applied object
    pub object: ParsedObject,
}

/// Shared in-memory entity store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: DashMap<(String, String), StoredEntity>,
    entity_limit: Option<usize>,
}

impl MemoryStore {
    /// Create empty store without a usage limit
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of entities per tenant
    #[inline]
    #[must_use]
    pub fn with_entity_limit(mut self, limit: usize) -> Self {
        self.entity_limit = Some(limit);
        self
    }

    /// Entity stored at a path
    #[must_use]
    pub fn get(&self, tenant_id: &str, path: &str) -> Option<StoredEntity> {
        self.entities
            .get(&(tenant_id.to_string(), path.to_string()))
            .map(|e| e.value().clone())
    }

    /// Whether an entity exists at a path
    #[must_use]
    pub fn contains(&self, tenant_id: &str, path: &str) -> bool {
        self.entities
            .contains_key(&(tenant_id.to_string(), path.to_string()))
    }

    /// Seed an entity directly, bypassing the handler
    pub fn insert(&self, tenant_id: &str, path: &str, entity: StoredEntity) {
        self.entities
            .insert((tenant_id.to_string(), path.to_string()), entity);
    }

    /// Number of entities owned by a tenant
    #[must_use]
    pub fn tenant_len(&self, tenant_id: &str) -> usize {
        self.entities.iter().filter(|e| e.key().0 == tenant_id).count()
    }

    /// Sorted paths owned by a tenant
    #[must_use]
    pub fn paths(&self, tenant_id: &str) -> Vec<String> {
        let mut paths: Vec<String> = self
            .entities
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .map(|e| e.key().1.clone())
            .collect();
        paths.sort();
        paths
    }

    fn has_descendants(&self, tenant_id: &str, dir: &str) -> bool {
        let index = format!("{dir}{INDEX_FILE}");
        self.entities
            .iter()
            .any(|e| e.key().0 == tenant_id && e.key().1.starts_with(dir) && e.key().1 != index)
    }

    fn remove(&self, tenant_id: &str, path: &str) -> Option<StoredEntity> {
        self.entities
            .remove(&(tenant_id.to_string(), path.to_string()))
            .map(|(_, e)| e)
    }
}

/// Split a path into its application directory and the remainder
fn application_dir(path: &str) -> Option<(&str, &str)> {
    let start = path.find(APPLICATIONS_DIR)? + APPLICATIONS_DIR.len();
    let name_len = path[start..].find('/')?;
    let dir_end = start + name_len + 1;
    Some((&path[..dir_end], &path[dir_end..]))
}

/// Generic YAML handler for one kind
#[derive(Debug, Clone)]
pub struct YamlHandler {
    kind: EntityKind,
    store: Arc<MemoryStore>,
    known_fields: Option<BTreeSet<String>>,
}

impl YamlHandler {
    /// Create handler over a shared store
    #[inline]
    #[must_use]
    pub fn new(kind: EntityKind, store: Arc<MemoryStore>) -> Self {
        Self {
            kind,
            store,
            known_fields: None,
        }
    }

    /// Reject top-level fields outside this set
    #[must_use]
    pub fn with_known_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    fn check_parent(&self, tenant_id: &str, path: &str) -> Result<(), HandlerError> {
        let Some((dir, rest)) = application_dir(path) else {
            return Ok(());
        };
        if rest == INDEX_FILE {
            return Ok(());
        }
        let parent = format!("{dir}{INDEX_FILE}");
        if self.store.contains(tenant_id, &parent) {
            Ok(())
        } else {
            Err(HandlerError::NotFound(format!("application for {path}")))
        }
    }

    fn check_limit(&self, tenant_id: &str) -> Result<(), HandlerError> {
        match self.store.entity_limit {
            Some(limit) if self.store.tenant_len(tenant_id) >= limit => {
                Err(HandlerError::UsageLimitExceeded(format!(
                    "tenant {tenant_id} may own at most {limit} entities"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Handler for YamlHandler {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn parse(&self, content: &str) -> Result<ParsedObject, HandlerError> {
        if self.kind.is_raw_content() {
            return Ok(ParsedObject::Raw(content.to_string()));
        }
        parse_document(content, self.known_fields.as_ref())
    }

    async fn get(&self, tenant_id: &str, path: &str) -> Result<Option<EntityRef>, HandlerError> {
        Ok(self.store.get(tenant_id, path).map(|e| EntityRef {
            id: e.id,
            kind: e.kind,
            path: path.to_string(),
        }))
    }

    async fn apply(
        &self,
        ctx: &ChangeContext,
        _all: &[ChangeContext],
    ) -> Result<EntityRef, HandlerError> {
        let change = &ctx.change;
        let object = ctx
            .parsed
            .clone()
            .ok_or_else(|| HandlerError::Internal(format!("no parsed object for {}", change.path)))?;

        self.check_parent(&change.tenant_id, &change.path)?;

        let id = match self.store.get(&change.tenant_id, &change.path) {
            Some(existing) => existing.id,
            None => {
                self.check_limit(&change.tenant_id)?;
                change
                    .declared_entity()
                    .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_string)
            }
        };

        self.store.insert(
            &change.tenant_id,
            &change.path,
            StoredEntity {
                id: id.clone(),
                kind: self.kind,
                object,
            },
        );
        tracing::debug!(kind = %self.kind, path = %change.path, %id, "entity stored");

        Ok(EntityRef {
            id,
            kind: self.kind,
            path: change.path.clone(),
        })
    }

    async fn delete(&self, ctx: &ChangeContext) -> Result<(), HandlerError> {
        let change = &ctx.change;
        if let Some((dir, rest)) = application_dir(&change.path) {
            if rest == INDEX_FILE && self.store.has_descendants(&change.tenant_id, dir) {
                return Err(HandlerError::InUse(change.path.clone()));
            }
        }
        if self.store.remove(&change.tenant_id, &change.path).is_none() {
            return Err(HandlerError::NotFound(change.path.clone()));
        }
        tracing::debug!(kind = %self.kind, path = %change.path, "entity removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_model::Change;

    fn context(handler: &Arc<YamlHandler>, change: Change) -> ChangeContext {
        let parsed = if change.change_type.is_upsert() {
            Some(handler.parse(&change.content).unwrap())
        } else {
            None
        };
        let kind = handler.kind();
        ChangeContext::new(change, kind, parsed, Arc::clone(handler) as Arc<dyn Handler>)
    }

    #[test]
    fn application_dir_split() {
        assert_eq!(
            application_dir("Setup/Applications/shop/Services/cart/index.yaml"),
            Some(("Setup/Applications/shop/", "Services/cart/index.yaml"))
        );
        assert_eq!(application_dir("Setup/Tags.yaml"), None);
    }

    #[tokio::test]
    async fn service_requires_application() {
        let store = Arc::new(MemoryStore::new());
        let apps = Arc::new(YamlHandler::new(EntityKind::Application, Arc::clone(&store)));
        let services = Arc::new(YamlHandler::new(EntityKind::Service, Arc::clone(&store)));

        let svc = context(
            &services,
            Change::add("t1", "Setup/Applications/shop/Services/cart/index.yaml", "type: SERVICE\n"),
        );
        let err = services.apply(&svc, &[]).await.unwrap_err();
        assert!(matches!(err, HandlerError::NotFound(_)));

        let app = context(
            &apps,
            Change::add("t1", "Setup/Applications/shop/index.yaml", "type: APPLICATION\n"),
        );
        apps.apply(&app, &[]).await.unwrap();
        let entity = services.apply(&svc, &[]).await.unwrap();
        assert_eq!(entity.kind, EntityKind::Service);
        assert_eq!(store.tenant_len("t1"), 2);
    }

    #[tokio::test]
    async fn modify_keeps_identifier() {
        let store = Arc::new(MemoryStore::new());
        let tags = Arc::new(YamlHandler::new(EntityKind::Tag, Arc::clone(&store)));
        let first = tags
            .apply(&context(&tags, Change::add("t1", "Setup/Tags.yaml", "type: TAG\n")), &[])
            .await
            .unwrap();
        let second = tags
            .apply(&context(&tags, Change::modify("t1", "Setup/Tags.yaml", "type: TAG\ndescription: x\n")), &[])
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn application_delete_waits_for_children() {
        let store = Arc::new(MemoryStore::new());
        let apps = Arc::new(YamlHandler::new(EntityKind::Application, Arc::clone(&store)));
        let services = Arc::new(YamlHandler::new(EntityKind::Service, Arc::clone(&store)));
        apps.apply(&context(&apps, Change::add("t1", "Setup/Applications/a/index.yaml", "type: APP\n")), &[])
            .await
            .unwrap();
        services
            .apply(
                &context(&services, Change::add("t1", "Setup/Applications/a/Services/s/index.yaml", "type: S\n")),
                &[],
            )
            .await
            .unwrap();

        let app_delete = context(&apps, Change::delete("t1", "Setup/Applications/a/index.yaml"));
        assert!(matches!(apps.delete(&app_delete).await, Err(HandlerError::InUse(_))));

        services
            .delete(&context(&services, Change::delete("t1", "Setup/Applications/a/Services/s/index.yaml")))
            .await
            .unwrap();
        apps.delete(&app_delete).await.unwrap();
        assert_eq!(store.tenant_len("t1"), 0);
    }

    #[tokio::test]
    async fn entity_limit_is_enforced() {
        let store = Arc::new(MemoryStore::new().with_entity_limit(1));
        let providers = Arc::new(YamlHandler::new(EntityKind::CloudProvider, Arc::clone(&store)));
        providers
            .apply(&context(&providers, Change::add("t1", "Setup/Cloud Providers/a.yaml", "type: AWS\n")), &[])
            .await
            .unwrap();
        let err = providers
            .apply(&context(&providers, Change::add("t1", "Setup/Cloud Providers/b.yaml", "type: GCP\n")), &[])
            .await
            .unwrap_err();
        assert!(err.is_usage_limit());
    }

    #[test]
    fn raw_kinds_keep_content_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let handler = YamlHandler::new(EntityKind::ConfigFileContent, store);
        assert_eq!(
            handler.parse("key=value").unwrap(),
            ParsedObject::Raw("key=value".to_string())
        );
    }
}
