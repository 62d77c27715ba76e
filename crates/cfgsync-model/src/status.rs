//! Per-file outcome reported to callers

use serde::{Deserialize, Serialize};

/// Terminal status of one input change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Success,
    Failed,
    Skipped,
}

/// Externally reported outcome per file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperationStatus {
    pub path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

impl FileOperationStatus {
    /// Successful file, optionally with the resolved entity id
    #[inline]
    #[must_use]
    pub fn success(path: impl Into<String>, entity_id: Option<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Success,
            error_message: None,
            entity_id,
        }
    }

    /// Failed file with its error message
    #[inline]
    #[must_use]
    pub fn failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Failed,
            error_message: Some(message.into()),
            entity_id: None,
        }
    }

    /// Skipped file, optionally with the reason
    #[inline]
    #[must_use]
    pub fn skipped(path: impl Into<String>, reason: Option<String>) -> Self {
        Self {
            path: path.into(),
            status: FileStatus::Skipped,
            error_message: reason,
            entity_id: None,
        }
    }
}
