//! Permission-cache invalidation scopes
//!
//! Creating, changing or removing some kinds alters what users may see or do.
//! After a batch of such changes the tenant's permission caches are refreshed
//! once, with a scope chosen from the batch's kind and operation.

use crate::change::ChangeType;
use crate::kind::EntityKind;
use serde::{Deserialize, Serialize};

/// Kinds whose creation or deletion changes permissions
const CREATE_SENSITIVE: [EntityKind; 6] = [
    EntityKind::Application,
    EntityKind::Service,
    EntityKind::Environment,
    EntityKind::Provisioner,
    EntityKind::Workflow,
    EntityKind::Pipeline,
];

/// Kinds whose modification changes permissions
const UPDATE_SENSITIVE: [EntityKind; 3] = [
    EntityKind::Environment,
    EntityKind::Workflow,
    EntityKind::Pipeline,
];

/// How much cached authorization state a batch invalidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationScope {
    /// User permission cache only
    Permissions,
    /// User permission and restriction caches
    PermissionsAndRestrictions,
}

/// Scope to invalidate after a batch of `change_type` on `kind`
///
/// Returns `None` when the batch leaves authorization state untouched.
#[must_use]
pub fn invalidation_scope(kind: EntityKind, change_type: ChangeType) -> Option<InvalidationScope> {
    match change_type {
        ChangeType::Add if CREATE_SENSITIVE.contains(&kind) => {
            if is_tenancy_container(kind) {
                Some(InvalidationScope::PermissionsAndRestrictions)
            } else {
                Some(InvalidationScope::Permissions)
            }
        }
        ChangeType::Modify if UPDATE_SENSITIVE.contains(&kind) => {
            if kind == EntityKind::Environment {
                Some(InvalidationScope::PermissionsAndRestrictions)
            } else {
                Some(InvalidationScope::Permissions)
            }
        }
        ChangeType::Delete if CREATE_SENSITIVE.contains(&kind) => {
            Some(InvalidationScope::PermissionsAndRestrictions)
        }
        _ => None,
    }
}

fn is_tenancy_container(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Application | EntityKind::Environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_of_container_is_coarse() {
        assert_eq!(
            invalidation_scope(EntityKind::Application, ChangeType::Add),
            Some(InvalidationScope::PermissionsAndRestrictions)
        );
        assert_eq!(
            invalidation_scope(EntityKind::Service, ChangeType::Add),
            Some(InvalidationScope::Permissions)
        );
    }

    #[test]
    fn modify_outside_update_set_is_skipped() {
        assert_eq!(invalidation_scope(EntityKind::Service, ChangeType::Modify), None);
        assert_eq!(
            invalidation_scope(EntityKind::Pipeline, ChangeType::Modify),
            Some(InvalidationScope::Permissions)
        );
        assert_eq!(
            invalidation_scope(EntityKind::Environment, ChangeType::Modify),
            Some(InvalidationScope::PermissionsAndRestrictions)
        );
    }

    #[test]
    fn delete_of_sensitive_kind_is_coarse() {
        assert_eq!(
            invalidation_scope(EntityKind::Workflow, ChangeType::Delete),
            Some(InvalidationScope::PermissionsAndRestrictions)
        );
        assert_eq!(invalidation_scope(EntityKind::CloudProvider, ChangeType::Delete), None);
    }

    #[test]
    fn rename_never_invalidates() {
        for kind in EntityKind::PROCESSING_ORDER {
            assert_eq!(invalidation_scope(kind, ChangeType::Rename), None);
        }
    }
}
