//! Failure aggregation and per-file reporting
//!
//! Every input change gets exactly one status. A path in the failure map is
//! Failed, a path in the skip map is Skipped, anything else was applied.

use crate::error::{FailureMap, PipelineError, SkipMap};
use crate::pipeline::AppliedChangeSet;
use cfgsync_handler::ChangeContext;
use cfgsync_model::{Change, FileOperationStatus, FileStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Build one status per input change
#[must_use]
pub fn build_report(
    original: &[Change],
    applied: &[ChangeContext],
    failures: &FailureMap,
    skipped: &SkipMap,
) -> Vec<FileOperationStatus> {
    let entity_ids: HashMap<&str, Option<&str>> = applied
        .iter()
        .map(|ctx| (ctx.path(), ctx.entity_id()))
        .collect();

    original
        .iter()
        .map(|change| {
            let path = change.path.as_str();
            if let Some(record) = failures.get(path) {
                FileOperationStatus::failed(path, record.message.clone())
            } else if let Some(record) = skipped.get(path) {
                FileOperationStatus::skipped(path, record.message())
            } else {
                let entity_id = entity_ids.get(path).copied().flatten().map(str::to_string);
                FileOperationStatus::success(path, entity_id)
            }
        })
        .collect()
}

/// Report for a pipeline result
///
/// `extra_skips` covers changes removed before the pipeline ran, such as
/// unauthorized paths. `original` must list every input change.
///
/// # Errors
/// Any pipeline error other than a partial failure is returned unchanged.
pub fn report_for(
    original: &[Change],
    result: Result<AppliedChangeSet, PipelineError>,
    extra_skips: &SkipMap,
) -> Result<Vec<FileOperationStatus>, PipelineError> {
    let empty = FailureMap::new();
    let (applied, failures, mut skipped) = match result {
        Ok(set) => (set.applied, empty, set.skipped),
        Err(PipelineError::PartialFailure(partial)) => {
            let partial = *partial;
            (partial.applied, partial.failures, partial.skipped)
        }
        Err(other) => return Err(other),
    };
    skipped.extend(extra_skips.iter().map(|(k, v)| (k.clone(), v.clone())));
    Ok(build_report(original, &applied, &failures, &skipped))
}

/// Overall status of a caller operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    /// Every file succeeded or was skipped
    Success,
    /// At least one file failed, or the operation was aborted
    Failed,
}

/// Counts by file status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    /// Files applied
    pub success: usize,
    /// Files that failed
    pub failed: usize,
    /// Files never handed to a handler
    pub skipped: usize,
}

impl StatusSummary {
    /// Total files counted
    #[inline]
    #[must_use]
    pub fn total(&self) -> usize {
        self.success + self.failed + self.skipped
    }
}

/// Response of a caller operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    /// Overall outcome
    pub status: OperationStatus,
    /// Operation-level error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// One status per input file
    pub files: Vec<FileOperationStatus>,
}

impl OperationResponse {
    /// Response derived from per-file statuses
    ///
    /// Failed if any file failed.
    #[must_use]
    pub fn from_files(files: Vec<FileOperationStatus>) -> Self {
        let failed = files.iter().filter(|f| f.status == FileStatus::Failed).count();
        if failed == 0 {
            Self {
                status: OperationStatus::Success,
                error_message: None,
                files,
            }
        } else {
            Self {
                status: OperationStatus::Failed,
                error_message: Some(format!("{failed} file(s) failed")),
                files,
            }
        }
    }

    /// Failed response with a message
    #[must_use]
    pub fn failed(message: impl Into<String>, files: Vec<FileOperationStatus>) -> Self {
        Self {
            status: OperationStatus::Failed,
            error_message: Some(message.into()),
            files,
        }
    }

    /// Count files by status
    #[must_use]
    pub fn summary(&self) -> StatusSummary {
        self.files
            .iter()
            .fold(StatusSummary::default(), |mut acc, f| {
                match f.status {
                    FileStatus::Success => acc.success += 1,
                    FileStatus::Failed => acc.failed += 1,
                    FileStatus::Skipped => acc.skipped += 1,
                }
                acc
            })
    }
}
