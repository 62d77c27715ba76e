//! Functional tests for the in-memory reference handler.
//!
//! Core guarantees exercised here:
//! - Handlers built with a known-field list reject unrecognized fields.
//! - Declarative rules run on parsed documents, not raw content.
//! - Lookups resolve the identifier written by the last apply.

use cfgsync_handler::{
    ChangeContext, Handler, HandlerError, HandlerRegistry, MemoryStore, RuleSet, YamlHandler,
};
use cfgsync_model::{Change, EntityKind};
use pretty_assertions::assert_eq;
use std::sync::Arc;

/// Tenet: strict handlers name the offending field.
///
/// A typo in a top-level key must surface as a per-file error instead of being
/// dropped, otherwise the applied entity silently loses configuration.
#[test]
fn strict_handler_reports_unknown_field() {
    let store = Arc::new(MemoryStore::new());
    let handler = YamlHandler::new(EntityKind::CloudProvider, store)
        .with_known_fields(["harnessApiVersion", "type", "accessKey"]);

    assert!(handler.parse("harnessApiVersion: '1.0'\ntype: AWS\n").is_ok());
    assert_eq!(
        handler.parse("type: AWS\nacessKey: x\n").unwrap_err(),
        HandlerError::UnknownField("acessKey".to_string())
    );
}

/// Tenet: rules see the parsed shape of the document.
#[test]
fn rules_apply_to_parsed_workflow() {
    let store = Arc::new(MemoryStore::new());
    let registry = HandlerRegistry::in_memory(&store);
    let handler = registry.get(EntityKind::Workflow).unwrap();

    let parsed = handler
        .parse("type: CANARY\nphases:\n  - name: stage.one\n")
        .unwrap();
    let err = RuleSet::standard().check(&parsed).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid phase name [stage.one]. Dots are not permitted"
    );
}

/// Tenet: get resolves what apply wrote.
#[tokio::test]
async fn get_returns_applied_identifier() {
    let store = Arc::new(MemoryStore::new());
    let registry = HandlerRegistry::in_memory(&store);
    let handler = registry.get(EntityKind::CloudProvider).unwrap();

    let path = "Setup/Cloud Providers/aws.yaml";
    assert_eq!(handler.get("t1", path).await.unwrap(), None);

    let change = Change::add("t1", path, "type: AWS\n").with_entity_id("cp-1");
    let parsed = handler.parse(&change.content).unwrap();
    let ctx = ChangeContext::new(change, EntityKind::CloudProvider, Some(parsed), Arc::clone(&handler));
    let entity = handler.apply(&ctx, std::slice::from_ref(&ctx)).await.unwrap();
    assert_eq!(entity.id, "cp-1");

    let resolved = handler.get("t1", path).await.unwrap().unwrap();
    assert_eq!(resolved.id, "cp-1");
    assert_eq!(handler.get("t2", path).await.unwrap(), None);
}
