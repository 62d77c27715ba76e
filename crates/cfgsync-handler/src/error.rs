//! Handler errors
//!
//! Every variant is isolated to the file that produced it. The pipeline maps
//! each one onto its reported error kind.

/// Errors raised by a per-kind handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerError {
    /// Content could not be read as a document
    #[error("{0}")]
    Malformed(String),

    /// Document carries a field the kind does not know
    #[error("Unrecognized field: {0}")]
    UnknownField(String),

    /// A declarative rule rejected the document
    #[error("{0}")]
    RuleViolation(String),

    /// Operation is not offered for this kind
    #[error("operation not supported for {0}")]
    Unsupported(String),

    /// Tenant exceeded a usage quota
    #[error("usage limit exceeded: {0}")]
    UsageLimitExceeded(String),

    /// Referenced entity does not exist
    #[error("entity not found: {0}")]
    NotFound(String),

    /// Entity is still referenced by dependents
    #[error("entity is still referenced: {0}")]
    InUse(String),

    /// Unexpected failure inside the handler
    #[error("{0}")]
    Internal(String),
}

impl HandlerError {
    /// Malformed-input error from a YAML parse failure
    #[must_use]
    pub fn from_yaml(err: &serde_yaml::Error) -> Self {
        match err.location() {
            Some(loc) => Self::Malformed(format!(
                "Unable to parse yaml at line {} column {}: {err}",
                loc.line(),
                loc.column()
            )),
            None => Self::Malformed(format!("Unable to parse yaml: {err}")),
        }
    }

    /// Whether the failure was a usage-quota violation
    #[inline]
    #[must_use]
    pub fn is_usage_limit(&self) -> bool {
        matches!(self, Self::UsageLimitExceeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_errors_carry_location() {
        let err = serde_yaml::from_str::<serde_yaml::Value>("a: [1, 2").unwrap_err();
        let HandlerError::Malformed(message) = HandlerError::from_yaml(&err) else {
            panic!("expected malformed");
        };
        assert!(message.starts_with("Unable to parse yaml"));
        assert!(message.contains("line"));
    }

    #[test]
    fn unknown_field_message() {
        let err = HandlerError::UnknownField("foo".into());
        assert_eq!(err.to_string(), "Unrecognized field: foo");
    }
}
