//! Classification and validation stage
//!
//! Turns raw changes into [`ChangeContext`]s. Each file is judged on its own:
//! a bad file produces one [`ErrorRecord`] and never affects its siblings.
//! Output order is irrelevant; the scheduler imposes order afterwards.

use crate::error::{ErrorKind, ErrorRecord, FailureMap, SkipMap, SkipReason, SkipRecord};
use cfgsync_handler::{ChangeContext, HandlerRegistry, RuleSet};
use cfgsync_model::{Change, Classification, ClassifyError, ORDER_TABLE};

/// Result of validating a list of changes
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Changes ready to schedule
    pub valid: Vec<ChangeContext>,
    /// Files that failed validation
    pub failures: FailureMap,
    /// Files dropped without reaching a handler
    pub skipped: SkipMap,
}

/// Resolves kinds, parses content and runs declarative rules
#[derive(Debug, Clone)]
pub struct Validator {
    registry: HandlerRegistry,
    rules: RuleSet,
    root_prefix: String,
}

impl Validator {
    /// Create validator for files under `setup_root`
    #[must_use]
    pub fn new(registry: HandlerRegistry, setup_root: &str) -> Self {
        Self {
            registry,
            rules: RuleSet::standard(),
            root_prefix: format!("{}/", setup_root.trim_matches('/')),
        }
    }

    /// Replace the declarative rule set
    #[inline]
    #[must_use]
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Handler registry in use
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Validate every change independently
    #[must_use]
    pub fn validate(&self, changes: Vec<Change>) -> ValidationOutcome {
        let mut outcome = ValidationOutcome::default();
        for change in changes {
            match self.validate_one(change) {
                Verdict::Valid(ctx) => outcome.valid.push(*ctx),
                Verdict::Failed(record) => {
                    tracing::warn!(path = %record.change.path, kind = ?record.kind, message = %record.message, "validation failed");
                    outcome.failures.insert(record.change.path.clone(), record);
                }
                Verdict::Skipped(record) => {
                    tracing::debug!(path = %record.change.path, reason = ?record.reason, "file skipped");
                    outcome.skipped.insert(record.change.path.clone(), record);
                }
            }
        }
        tracing::info!(
            valid = outcome.valid.len(),
            failed = outcome.failures.len(),
            skipped = outcome.skipped.len(),
            "validation complete"
        );
        outcome
    }

    fn validate_one(&self, change: Change) -> Verdict {
        let Some(relative) = change.path.strip_prefix(&self.root_prefix) else {
            return Verdict::Skipped(SkipRecord::new(change, SkipReason::NotConfiguration));
        };

        let kind = match ORDER_TABLE.classify(relative) {
            Classification::Kind(kind) => kind,
            Classification::Ignored => {
                return Verdict::Skipped(SkipRecord::new(change, SkipReason::NotConfiguration));
            }
            Classification::Unknown => {
                let err = ClassifyError::UnknownKind(change.path.clone());
                let kind = ErrorKind::from_classify(&err);
                return Verdict::Failed(ErrorRecord::new(change, kind, err.to_string()));
            }
        };

        if kind.is_deprecated() {
            return Verdict::Skipped(SkipRecord::new(change, SkipReason::Deprecated));
        }

        let Some(handler) = self.registry.get(kind) else {
            let message = format!("no handler registered for {kind}");
            return Verdict::Failed(ErrorRecord::new(change, ErrorKind::HandlerUnavailable, message));
        };

        let parsed = if change.change_type.is_upsert() {
            let parsed = match handler.parse(&change.content) {
                Ok(parsed) => parsed,
                Err(err) => return Verdict::Failed(ErrorRecord::from_handler(change, &err)),
            };
            if let Err(err) = self.rules.check(&parsed) {
                return Verdict::Failed(ErrorRecord::from_handler(change, &err));
            }
            Some(parsed)
        } else {
            None
        };

        Verdict::Valid(Box::new(ChangeContext::new(change, kind, parsed, handler)))
    }
}

enum Verdict {
    Valid(Box<ChangeContext>),
    Failed(ErrorRecord),
    Skipped(SkipRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgsync_handler::MemoryStore;
    use cfgsync_model::EntityKind;
    use std::sync::Arc;

    fn validator() -> Validator {
        let store = Arc::new(MemoryStore::new());
        Validator::new(HandlerRegistry::in_memory(&store), "Setup")
    }

    #[test]
    fn valid_change_is_bound_to_kind() {
        let outcome = validator().validate(vec![Change::add(
            "t1",
            "Setup/Cloud Providers/aws.yaml",
            "type: AWS\n",
        )]);
        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(outcome.valid[0].kind, EntityKind::CloudProvider);
        assert!(outcome.valid[0].parsed.is_some());
    }

    #[test]
    fn unknown_yaml_fails() {
        let outcome = validator().validate(vec![Change::add("t1", "Setup/Mystery/x.yaml", "a: 1\n")]);
        let record = &outcome.failures["Setup/Mystery/x.yaml"];
        assert_eq!(record.kind, ErrorKind::UnknownKind);
    }

    #[test]
    fn non_configuration_is_skipped() {
        let outcome = validator().validate(vec![
            Change::add("t1", "Setup/README.md", "hello"),
            Change::add("t1", "Other/Tags.yaml", "a: 1\n"),
        ]);
        assert!(outcome.valid.is_empty());
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn deprecated_kind_is_skipped() {
        let path = "Setup/Applications/a/Environments/e/Service Infrastructure/m.yaml";
        let outcome = validator().validate(vec![Change::add("t1", path, "type: X\n")]);
        assert!(outcome.valid.is_empty());
        assert_eq!(outcome.skipped[path].reason, SkipReason::Deprecated);
    }

    #[test]
    fn malformed_and_rule_violations_fail_separately() {
        let outcome = validator().validate(vec![
            Change::add("t1", "Setup/Cloud Providers/a.yaml", "type: [AWS"),
            Change::add(
                "t1",
                "Setup/Applications/shop/Workflows/w.yaml",
                "type: CANARY\nphases:\n  - name: a.b\n",
            ),
            Change::add("t1", "Setup/Tags.yaml", "type: TAG\n"),
        ]);
        assert_eq!(outcome.valid.len(), 1);
        assert_eq!(
            outcome.failures["Setup/Cloud Providers/a.yaml"].kind,
            ErrorKind::MalformedInput
        );
        assert_eq!(
            outcome.failures["Setup/Applications/shop/Workflows/w.yaml"].kind,
            ErrorKind::ValidationRuleViolation
        );
    }

    #[test]
    fn deletes_are_not_parsed() {
        let outcome = validator().validate(vec![Change::delete("t1", "Setup/Cloud Providers/a.yaml")]);
        assert_eq!(outcome.valid.len(), 1);
        assert!(outcome.valid[0].parsed.is_none());
    }

    #[test]
    fn missing_handler_is_reported() {
        let validator = Validator::new(HandlerRegistry::new(), "Setup");
        let outcome = validator.validate(vec![Change::add("t1", "Setup/Tags.yaml", "type: TAG\n")]);
        assert_eq!(
            outcome.failures["Setup/Tags.yaml"].kind,
            ErrorKind::HandlerUnavailable
        );
    }
}
