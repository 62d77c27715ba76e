//! Process-wide ordinal table and path classifier
//!
//! [`ORDER_TABLE`] is built once from [`EntityKind::PROCESSING_ORDER`] and
//! never mutated. Ordinals start at 1, so `sign * ordinal` is never zero and
//! deletes always sort strictly before upserts.

use crate::change::ChangeType;
use crate::error::ClassifyError;
use crate::kind::EntityKind;
use crate::YAML_EXTENSION;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Folders whose files are configuration even without a `.yaml` extension
const RAW_CONTENT_MARKERS: [&str; 2] = ["Config Files/", "Manifests/Files/"];

/// Global order table
pub static ORDER_TABLE: Lazy<OrderTable> = Lazy::new(OrderTable::build);

/// Result of classifying a root-relative path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// First matching rule
    Kind(EntityKind),
    /// Looks like configuration but no rule matched
    Unknown,
    /// Not configuration; dropped without a report entry of its own
    Ignored,
}

#[derive(Debug)]
struct CompiledRule {
    kind: EntityKind,
    pattern: Regex,
    excludes_yaml: bool,
}

impl CompiledRule {
    fn matches(&self, path: &str) -> bool {
        if self.excludes_yaml && path.ends_with(YAML_EXTENSION) {
            return false;
        }
        self.pattern.is_match(path)
    }
}

/// Immutable ordinal table over entity kinds
#[derive(Debug)]
pub struct OrderTable {
    rules: Vec<CompiledRule>,
    ordinals: HashMap<EntityKind, u32>,
}

impl OrderTable {
    fn build() -> Self {
        let mut rules = Vec::with_capacity(EntityKind::PROCESSING_ORDER.len());
        let mut ordinals = HashMap::with_capacity(EntityKind::PROCESSING_ORDER.len());

        for (position, kind) in EntityKind::PROCESSING_ORDER.iter().copied().enumerate() {
            let rule = kind.path_rule();
            let pattern = Regex::new(&format!("^{}$", rule.expression))
                .unwrap_or_else(|e| panic!("invalid path rule for {kind}: {e}"));
            rules.push(CompiledRule {
                kind,
                pattern,
                excludes_yaml: rule.excludes_yaml,
            });
            ordinals.insert(kind, u32::try_from(position + 1).unwrap_or(u32::MAX));
        }

        Self { rules, ordinals }
    }

    /// Ordinal of a kind (1-based position in the processing order)
    #[inline]
    #[must_use]
    pub fn ordinal(&self, kind: EntityKind) -> u32 {
        self.ordinals.get(&kind).copied().unwrap_or(u32::MAX)
    }

    /// Sort key of an operation on a kind
    #[inline]
    #[must_use]
    pub fn sort_key(&self, kind: EntityKind, change_type: ChangeType) -> i64 {
        change_type.sign() * i64::from(self.ordinal(kind))
    }

    /// Classify a path relative to the setup root
    ///
    /// Rules are tested in processing order; the first match wins.
    #[must_use]
    pub fn classify(&self, relative_path: &str) -> Classification {
        if let Some(rule) = self.rules.iter().find(|r| r.matches(relative_path)) {
            return Classification::Kind(rule.kind);
        }
        if is_content_marked(relative_path) {
            Classification::Unknown
        } else {
            Classification::Ignored
        }
    }

    /// Resolve a path to its kind
    ///
    /// # Errors
    /// - `ClassifyError::UnknownKind` if the path looks like configuration
    /// - `ClassifyError::NotConfiguration` otherwise
    pub fn kind_for(&self, relative_path: &str) -> Result<EntityKind, ClassifyError> {
        match self.classify(relative_path) {
            Classification::Kind(kind) => Ok(kind),
            Classification::Unknown => Err(ClassifyError::UnknownKind(relative_path.to_string())),
            Classification::Ignored => {
                Err(ClassifyError::NotConfiguration(relative_path.to_string()))
            }
        }
    }

    /// Number of kinds in the table
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Kinds in processing order
    pub fn kinds(&self) -> impl Iterator<Item = EntityKind> + '_ {
        self.rules.iter().map(|r| r.kind)
    }
}

/// Whether a path carries a recognized configuration marker
#[must_use]
fn is_content_marked(path: &str) -> bool {
    path.ends_with(YAML_EXTENSION) || RAW_CONTENT_MARKERS.iter().any(|m| path.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_positive_and_follow_processing_order() {
        let table = &*ORDER_TABLE;
        assert_eq!(table.len(), EntityKind::PROCESSING_ORDER.len());
        assert_eq!(table.ordinal(EntityKind::SourceRepoProvider), 1);

        let ordinals: Vec<u32> = table.kinds().map(|k| table.ordinal(k)).collect();
        assert!(ordinals.windows(2).all(|w| w[0] < w[1]));
        assert!(ordinals.iter().all(|o| *o > 0));
    }

    #[test]
    fn dependency_order_examples() {
        let table = &*ORDER_TABLE;
        assert!(table.ordinal(EntityKind::CloudProvider) < table.ordinal(EntityKind::Service));
        assert!(table.ordinal(EntityKind::Service) < table.ordinal(EntityKind::Environment));
        assert!(table.ordinal(EntityKind::Workflow) < table.ordinal(EntityKind::Pipeline));
        assert!(table.ordinal(EntityKind::Pipeline) < table.ordinal(EntityKind::Trigger));
    }

    #[test]
    fn classify_known_paths() {
        let cases = [
            ("Cloud Providers/aws.yaml", EntityKind::CloudProvider),
            ("Tags.yaml", EntityKind::Tag),
            ("Defaults.yaml", EntityKind::AccountDefaults),
            ("Applications/shop/index.yaml", EntityKind::Application),
            ("Applications/shop/Defaults.yaml", EntityKind::ApplicationDefaults),
            ("Applications/shop/Services/cart/index.yaml", EntityKind::Service),
            ("Applications/shop/Environments/qa/index.yaml", EntityKind::Environment),
            ("Applications/shop/Workflows/rollout.yaml", EntityKind::Workflow),
            ("Applications/shop/Pipelines/release.yaml", EntityKind::Pipeline),
            (
                "Applications/shop/Services/cart/Manifests/Files/templates/deployment.yaml",
                EntityKind::ManifestFile,
            ),
        ];
        for (path, expected) in cases {
            assert_eq!(ORDER_TABLE.classify(path), Classification::Kind(expected), "{path}");
        }
    }

    #[test]
    fn config_file_content_and_descriptor_are_distinct() {
        assert_eq!(
            ORDER_TABLE.classify("Applications/shop/Services/cart/Config Files/app.properties"),
            Classification::Kind(EntityKind::ConfigFileContent)
        );
        assert_eq!(
            ORDER_TABLE.classify("Applications/shop/Services/cart/Config Files/app.properties.yaml"),
            Classification::Kind(EntityKind::ConfigFile)
        );
        assert_eq!(
            ORDER_TABLE.classify("Applications/shop/Environments/qa/Config Files/app.properties"),
            Classification::Kind(EntityKind::ConfigFileOverrideContent)
        );
    }

    #[test]
    fn unknown_versus_ignored() {
        assert_eq!(ORDER_TABLE.classify("Unheard Of/thing.yaml"), Classification::Unknown);
        assert_eq!(ORDER_TABLE.classify("README.md"), Classification::Ignored);
        assert_eq!(ORDER_TABLE.classify("Applications/shop/notes.txt"), Classification::Ignored);
    }

    #[test]
    fn kind_for_reports_errors() {
        assert_eq!(
            ORDER_TABLE.kind_for("Tags.yaml").unwrap(),
            EntityKind::Tag
        );
        assert!(matches!(
            ORDER_TABLE.kind_for("Unheard Of/thing.yaml"),
            Err(ClassifyError::UnknownKind(_))
        ));
        assert!(matches!(
            ORDER_TABLE.kind_for("logo.png"),
            Err(ClassifyError::NotConfiguration(_))
        ));
    }

    #[test]
    fn sort_key_sign() {
        let table = &*ORDER_TABLE;
        let ordinal = i64::from(table.ordinal(EntityKind::Service));
        assert_eq!(table.sort_key(EntityKind::Service, ChangeType::Add), ordinal);
        assert_eq!(table.sort_key(EntityKind::Service, ChangeType::Delete), -ordinal);
    }

    proptest::proptest! {
        #[test]
        fn nested_names_classify(app in "[A-Za-z0-9][A-Za-z0-9 _-]{0,11}", svc in "[A-Za-z0-9][A-Za-z0-9 _-]{0,11}") {
            let path = format!("Applications/{app}/Services/{svc}/index.yaml");
            proptest::prop_assert_eq!(ORDER_TABLE.classify(&path), Classification::Kind(EntityKind::Service));
            let workflow = format!("Applications/{app}/Workflows/{svc}.yaml");
            proptest::prop_assert_eq!(ORDER_TABLE.classify(&workflow), Classification::Kind(EntityKind::Workflow));
        }

        #[test]
        fn deletes_sort_before_upserts(a in 0..EntityKind::PROCESSING_ORDER.len(), b in 0..EntityKind::PROCESSING_ORDER.len()) {
            let (a, b) = (EntityKind::PROCESSING_ORDER[a], EntityKind::PROCESSING_ORDER[b]);
            proptest::prop_assert!(
                ORDER_TABLE.sort_key(a, ChangeType::Delete) <= ORDER_TABLE.sort_key(b, ChangeType::Add)
            );
        }
    }
}
