//! Declarative validation rules
//!
//! A rule targets every sequence stored under a given key, at any depth, and
//! inspects one named field of each element. Rules run after parsing and are
//! reported the same way as parse errors.

use crate::document::{key_name, ParsedObject};
use crate::error::HandlerError;
use serde_yaml::{Mapping, Value};

/// What a rule requires of the inspected field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Field must not contain the character
    NoReservedChar(char),
    /// Field must be present and non-empty
    NonEmpty,
}

/// One declarative rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRule {
    /// Key holding the sequence of elements
    pub collection: &'static str,
    /// Field inspected on each element
    pub field: &'static str,
    /// Requirement on the field
    pub constraint: Constraint,
    /// Human-readable element label used in messages
    pub label: &'static str,
}

impl ValidationRule {
    fn check_element(&self, element: &Mapping) -> Result<(), HandlerError> {
        let value = element.get(self.field).and_then(Value::as_str);
        match self.constraint {
            Constraint::NoReservedChar(c) => match value {
                Some(name) if name.contains(c) => Err(HandlerError::RuleViolation(format!(
                    "Invalid {} name [{name}]. {} are not permitted",
                    self.label,
                    reserved_char_label(c)
                ))),
                _ => Ok(()),
            },
            Constraint::NonEmpty => match value {
                Some(name) if !name.trim().is_empty() => Ok(()),
                _ => Err(HandlerError::RuleViolation(format!(
                    "Invalid {} name. Empty names are not permitted",
                    self.label
                ))),
            },
        }
    }

    fn check_value(&self, value: &Value) -> Result<(), HandlerError> {
        match value {
            Value::Mapping(map) => {
                for (key, child) in map {
                    if key_name(key) == self.collection {
                        if let Value::Sequence(items) = child {
                            for item in items.iter().filter_map(Value::as_mapping) {
                                self.check_element(item)?;
                            }
                        }
                    }
                    self.check_value(child)?;
                }
                Ok(())
            }
            Value::Sequence(items) => items.iter().try_for_each(|v| self.check_value(v)),
            Value::Tagged(tagged) => self.check_value(&tagged.value),
            _ => Ok(()),
        }
    }
}

fn reserved_char_label(c: char) -> String {
    match c {
        '.' => "Dots".to_string(),
        '/' => "Slashes".to_string(),
        other => format!("'{other}' characters"),
    }
}

/// Ordered collection of rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ValidationRule>,
}

impl RuleSet {
    /// Empty rule set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in rules for workflow phases and AMI selectors
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_rule(ValidationRule {
                collection: "phases",
                field: "name",
                constraint: Constraint::NoReservedChar('.'),
                label: "phase",
            })
            .with_rule(ValidationRule {
                collection: "amiFilters",
                field: "name",
                constraint: Constraint::NonEmpty,
                label: "amiFilter",
            })
            .with_rule(ValidationRule {
                collection: "amiTags",
                field: "name",
                constraint: Constraint::NonEmpty,
                label: "amiTag",
            })
    }

    /// With an additional rule
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Number of rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are configured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check a parsed object against every rule
    ///
    /// Raw content is never inspected. The first violation is returned.
    ///
    /// # Errors
    /// `HandlerError::RuleViolation` describing the offending element
    pub fn check(&self, parsed: &ParsedObject) -> Result<(), HandlerError> {
        let Some(body) = parsed.body() else {
            return Ok(());
        };
        let root = Value::Mapping(body.clone());
        self.rules.iter().try_for_each(|rule| rule.check_value(&root))
    }
}
