//! Property tests for scheduling and accounting.
//!
//! Core guarantees exercised here:
//! - Every delete is scheduled before every add or modify.
//! - Deletes run from the most dependent kind down; upserts run upwards.
//! - Batches are homogeneous, capped, contiguous and cover every item.
//! - Every input change ends with exactly one status.

use cfgsync_core::{report_for, schedule, ChangeSource, PipelineConfig, Validator};
use cfgsync_handler::HandlerError;
use cfgsync_model::{Change, ChangeType, EntityKind, FileStatus, ORDER_TABLE};
use cfgsync_test_utils::{change_for, Harness};
use proptest::prelude::*;

fn change_type() -> impl Strategy<Value = ChangeType> {
    prop_oneof![
        Just(ChangeType::Add),
        Just(ChangeType::Modify),
        Just(ChangeType::Delete),
    ]
}

fn kind() -> impl Strategy<Value = EntityKind> {
    (0..EntityKind::PROCESSING_ORDER.len())
        .prop_filter("deprecated kinds never reach the scheduler", |i| {
            !EntityKind::PROCESSING_ORDER[*i].is_deprecated()
        })
        .prop_map(|i| EntityKind::PROCESSING_ORDER[i])
}

fn changes(max: usize) -> impl Strategy<Value = Vec<Change>> {
    prop::collection::vec((kind(), change_type()), 0..max).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (kind, op))| change_for(kind, op, &format!("n{i}")))
            .collect()
    })
}

proptest! {
    /// Tenet: sorting respects the dependency order in both directions.
    #[test]
    fn schedule_orders_by_dependency(input in changes(60), cap in 1usize..8) {
        let harness = Harness::new();
        let validator = Validator::new(harness.registry.clone(), "Setup");
        let mut contexts = validator.validate(input.clone()).valid;
        prop_assert_eq!(contexts.len(), input.len());

        let batches = schedule(&mut contexts, cap);

        let deletes_end = contexts
            .iter()
            .position(|c| c.change.change_type != ChangeType::Delete)
            .unwrap_or(contexts.len());
        prop_assert!(contexts[deletes_end..]
            .iter()
            .all(|c| c.change.change_type != ChangeType::Delete));

        let ordinals: Vec<u32> = contexts.iter().map(|c| ORDER_TABLE.ordinal(c.kind)).collect();
        prop_assert!(ordinals[..deletes_end].windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(ordinals[deletes_end..].windows(2).all(|w| w[0] <= w[1]));

        let mut expected_start = 0;
        for (i, batch) in batches.iter().enumerate() {
            prop_assert_eq!(batch.range.start, expected_start);
            prop_assert!(!batch.is_empty() && batch.len() <= cap);
            prop_assert!(contexts[batch.range.clone()]
                .iter()
                .all(|c| c.kind == batch.kind && c.change.change_type == batch.change_type));
            if let Some(next) = batches.get(i + 1) {
                let same_pair = next.kind == batch.kind && next.change_type == batch.change_type;
                prop_assert!(!same_pair || batch.len() == cap);
            }
            expected_start = batch.range.end;
        }
        prop_assert_eq!(expected_start, contexts.len());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Tenet: Success + Failed + Skipped always equals the number of inputs.
    #[test]
    fn every_change_is_accounted_for(
        input in changes(30),
        broken in prop::collection::vec(any::<bool>(), 30),
        failing in prop::collection::vec(any::<bool>(), 30),
    ) {
        let harness = Harness::new();
        let mut input = input;
        for (i, change) in input.iter_mut().enumerate() {
            if broken[i] && change.change_type != ChangeType::Delete && !change.kind_is_raw() {
                change.content = "type: [".to_string();
            } else if failing[i] {
                harness.script.fail(&change.path, HandlerError::Internal("scripted".into()));
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let pipeline = harness.pipeline(PipelineConfig::default().with_max_parallel(4));
        let result = runtime.block_on(pipeline.apply(input.clone(), ChangeSource::Direct));
        let report = report_for(&input, result, &Default::default()).unwrap();

        prop_assert_eq!(report.len(), input.len());
        let counted = report
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Success | FileStatus::Failed | FileStatus::Skipped))
            .count();
        prop_assert_eq!(counted, input.len());
        for (status, change) in report.iter().zip(&input) {
            prop_assert_eq!(&status.path, &change.path);
        }
    }
}

trait RawKind {
    fn kind_is_raw(&self) -> bool;
}

impl RawKind for Change {
    fn kind_is_raw(&self) -> bool {
        let relative = self.path.trim_start_matches("Setup/");
        ORDER_TABLE
            .kind_for(relative)
            .map(EntityKind::is_raw_content)
            .unwrap_or(false)
    }
}
