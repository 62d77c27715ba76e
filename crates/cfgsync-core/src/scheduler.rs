//! Ordering and batch scheduling
//!
//! Changes are sorted ascending by `sign(operation) * ordinal(kind)`. Every
//! delete therefore precedes every upsert, dependents are deleted before the
//! kinds they depend on, and foundational kinds are written first. The sorted
//! sequence is cut into batches whenever the (kind, operation) pair changes or
//! a batch reaches its size cap, so items inside a batch are independent.

use cfgsync_handler::ChangeContext;
use cfgsync_model::{ChangeType, EntityKind, ORDER_TABLE};
use serde::Serialize;
use std::ops::Range;

/// A run of same-(kind, operation) items applied concurrently
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Kind shared by every item
    pub kind: EntityKind,
    /// Operation shared by every item
    pub change_type: ChangeType,
    /// Positions in the sorted context list
    pub range: Range<usize>,
}

impl Batch {
    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the batch holds no items
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Rank separating operations that share a sort key
fn operation_rank(change_type: ChangeType) -> u8 {
    match change_type {
        ChangeType::Delete | ChangeType::Add => 0,
        ChangeType::Modify => 1,
        ChangeType::Rename => 2,
    }
}

/// Full ordering key of one (kind, operation) pair
#[inline]
#[must_use]
pub fn order_key(kind: EntityKind, change_type: ChangeType) -> (i64, u8) {
    (ORDER_TABLE.sort_key(kind, change_type), operation_rank(change_type))
}

/// Sort contexts into application order
///
/// The sort is stable: items with equal keys keep their input order.
pub fn sort_contexts(contexts: &mut [ChangeContext]) {
    contexts.sort_by_key(|c| order_key(c.kind, c.change.change_type));
}

/// Cut an ordered key sequence into batches of at most `max_batch` items
///
/// A `max_batch` of zero is treated as one.
#[must_use]
pub fn partition<I>(keys: I, max_batch: usize) -> Vec<Batch>
where
    I: IntoIterator<Item = (EntityKind, ChangeType)>,
{
    let cap = max_batch.max(1);
    let mut batches: Vec<Batch> = Vec::new();

    for (position, (kind, change_type)) in keys.into_iter().enumerate() {
        match batches.last_mut() {
            Some(current)
                if current.kind == kind
                    && current.change_type == change_type
                    && current.len() < cap =>
            {
                current.range.end = position + 1;
            }
            _ => batches.push(Batch {
                kind,
                change_type,
                range: position..position + 1,
            }),
        }
    }

    batches
}

/// Sort contexts in place and return their batches
#[must_use]
pub fn schedule(contexts: &mut [ChangeContext], max_batch: usize) -> Vec<Batch> {
    sort_contexts(contexts);
    let batches = partition(
        contexts.iter().map(|c| (c.kind, c.change.change_type)),
        max_batch,
    );
    tracing::info!(items = contexts.len(), batches = batches.len(), "change set scheduled");
    batches
}
