//! Error types for the change-set pipeline
//!
//! Per-file problems never become Rust errors of the pipeline call itself.
//! They are collected as [`ErrorRecord`]s (Failed) or [`SkipRecord`]s (Skipped)
//! and surface together through [`PipelineError::PartialFailure`].

use cfgsync_handler::{ChangeContext, HandlerError};
use cfgsync_model::{Change, ClassifyError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a file failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Content could not be parsed
    MalformedInput,
    /// Path looks like configuration but matches no kind
    UnknownKind,
    /// Document carries an unrecognized field
    UnknownField,
    /// Declarative rule rejected the document
    ValidationRuleViolation,
    /// No handler registered for the kind
    HandlerUnavailable,
    /// Declared entity differs from the one stored at the path
    IdentityConflict,
    /// Unexpected handler or runtime failure
    HandlerException,
}

impl ErrorKind {
    /// Kind reported for a handler failure
    #[must_use]
    pub fn from_handler(err: &HandlerError) -> Self {
        match err {
            HandlerError::Malformed(_) => Self::MalformedInput,
            HandlerError::UnknownField(_) => Self::UnknownField,
            HandlerError::RuleViolation(_) => Self::ValidationRuleViolation,
            HandlerError::Unsupported(_) => Self::HandlerUnavailable,
            HandlerError::UsageLimitExceeded(_)
            | HandlerError::NotFound(_)
            | HandlerError::InUse(_)
            | HandlerError::Internal(_) => Self::HandlerException,
        }
    }

    /// Kind reported for a classification failure
    #[must_use]
    pub fn from_classify(err: &ClassifyError) -> Self {
        match err {
            ClassifyError::UnknownKind(_) | ClassifyError::NotConfiguration(_) => Self::UnknownKind,
        }
    }
}

/// A failed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Input change
    pub change: Change,
    /// Failure class
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
}

impl ErrorRecord {
    /// Create new record
    #[inline]
    #[must_use]
    pub fn new(change: Change, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            change,
            kind,
            message: message.into(),
        }
    }

    /// Record for a handler failure
    #[must_use]
    pub fn from_handler(change: Change, err: &HandlerError) -> Self {
        Self::new(change, ErrorKind::from_handler(err), err.to_string())
    }
}

/// Why a file was skipped without reaching a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Commit is inside its usage-limit window
    RateLimited,
    /// Caller may not change this path
    AuthorizationDenied,
    /// Not a configuration file, or outside the setup root
    NotConfiguration,
    /// Kind is recognized but no longer processed
    Deprecated,
}

/// A skipped file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// Input change
    pub change: Change,
    /// Skip class
    pub reason: SkipReason,
}

impl SkipRecord {
    /// Create new record
    #[inline]
    #[must_use]
    pub fn new(change: Change, reason: SkipReason) -> Self {
        Self { change, reason }
    }

    /// Message reported to the caller, if any
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self.reason {
            SkipReason::RateLimited => Some(format!(
                "Skipped: commit {} exceeded the usage limit",
                self.change.commit().unwrap_or_default()
            )),
            SkipReason::AuthorizationDenied => Some(format!(
                "User unauthorized for changing entity for file path: [{}]",
                self.change.path
            )),
            SkipReason::NotConfiguration | SkipReason::Deprecated => None,
        }
    }
}

/// Failures keyed by file path, in the order they were recorded
pub type FailureMap = IndexMap<String, ErrorRecord>;

/// Skips keyed by file path, in the order they were recorded
pub type SkipMap = IndexMap<String, SkipRecord>;

/// Outcome of a run where at least one file failed
///
/// Everything in `applied` stays applied.
#[derive(Debug, Clone)]
pub struct PartialFailure {
    /// Failed files
    pub failures: FailureMap,
    /// Contexts applied successfully, in scheduled order
    pub applied: Vec<ChangeContext>,
    /// Input changes as received
    pub original: Vec<Change>,
    /// Skipped files
    pub skipped: SkipMap,
}

impl fmt::Display for PartialFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} file(s) failed",
            self.failures.len(),
            self.original.len()
        )
    }
}

/// Errors from pipeline entry points
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Some files failed; successfully applied files remain applied
    #[error("partial failure: {0}")]
    PartialFailure(Box<PartialFailure>),

    /// Caller operation exceeded its wall-clock limit
    #[error("operation timed out after {secs}s")]
    Timeout { secs: u64 },

    /// Archive could not be read
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Partial-failure payload, if that is what this is
    #[inline]
    #[must_use]
    pub fn partial_failure(&self) -> Option<&PartialFailure> {
        match self {
            Self::PartialFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML could not be parsed
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Archive extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Not a readable zip archive
    #[error("cannot open archive: {0}")]
    Open(#[from] zip::result::ZipError),

    /// An entry could not be decompressed
    #[error("cannot read archive entry {name}: {source}")]
    Entry {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Authorization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Caller may not change the path
    #[error("access denied for {path}")]
    Denied { path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_errors_map_to_kinds() {
        assert_eq!(
            ErrorKind::from_handler(&HandlerError::Malformed("x".into())),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            ErrorKind::from_handler(&HandlerError::UnknownField("x".into())),
            ErrorKind::UnknownField
        );
        assert_eq!(
            ErrorKind::from_handler(&HandlerError::UsageLimitExceeded("x".into())),
            ErrorKind::HandlerException
        );
    }

    #[test]
    fn skip_messages() {
        let change = Change::delete("t1", "Setup/Tags.yaml").with_commit("c1");
        let unauthorized = SkipRecord::new(change.clone(), SkipReason::AuthorizationDenied);
        assert_eq!(
            unauthorized.message().as_deref(),
            Some("User unauthorized for changing entity for file path: [Setup/Tags.yaml]")
        );
        let limited = SkipRecord::new(change.clone(), SkipReason::RateLimited);
        assert!(limited.message().unwrap().contains("c1"));
        assert_eq!(SkipRecord::new(change, SkipReason::Deprecated).message(), None);
    }
}
