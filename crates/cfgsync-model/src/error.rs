//! Classification errors

/// Errors resolving a path to an entity kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// Path looks like configuration but matches no rule
    #[error("unknown yaml type for path: {0}")]
    UnknownKind(String),

    /// Path is not configuration at all
    #[error("not a configuration file: {0}")]
    NotConfiguration(String),
}
