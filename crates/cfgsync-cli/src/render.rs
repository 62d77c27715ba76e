//! Human and JSON renderings of plans and responses

use cfgsync_core::{OperationResponse, Plan};
use cfgsync_model::FileStatus;
use serde_json::{json, Value};
use std::fmt::Write;

/// Plan as indented text, one batch per block
#[must_use]
pub fn plan_text(plan: &Plan) -> String {
    let mut out = String::new();
    for (i, batch) in plan.batches.iter().enumerate() {
        let _ = writeln!(
            out,
            "batch {}: {} {} ({} file(s))",
            i + 1,
            batch.change_type,
            batch.kind,
            batch.paths.len()
        );
        for path in &batch.paths {
            let _ = writeln!(out, "    {path}");
        }
    }
    for (path, failure) in &plan.failures {
        let _ = writeln!(out, "FAILED  {path}: {}", failure.message);
    }
    for (path, skip) in &plan.skipped {
        match skip.message() {
            Some(message) => {
                let _ = writeln!(out, "SKIPPED {path}: {message}");
            }
            None => {
                let _ = writeln!(out, "SKIPPED {path}");
            }
        }
    }
    let _ = write!(
        out,
        "{} batch(es), {} failure(s), {} skipped",
        plan.batches.len(),
        plan.failures.len(),
        plan.skipped.len()
    );
    out
}

/// Plan as a JSON document
#[must_use]
pub fn plan_json(plan: &Plan) -> Value {
    let failures: Vec<Value> = plan
        .failures
        .iter()
        .map(|(path, failure)| json!({ "path": path, "kind": failure.kind, "message": failure.message }))
        .collect();
    let skipped: Vec<Value> = plan
        .skipped
        .iter()
        .map(|(path, skip)| json!({ "path": path, "reason": skip.reason, "message": skip.message() }))
        .collect();
    json!({
        "batches": plan.batches,
        "failures": failures,
        "skipped": skipped,
    })
}

/// Response as one line per file plus a summary
#[must_use]
pub fn response_text(response: &OperationResponse) -> String {
    let mut out = String::new();
    for file in &response.files {
        let label = match file.status {
            FileStatus::Success => "OK     ",
            FileStatus::Failed => "FAILED ",
            FileStatus::Skipped => "SKIPPED",
        };
        let detail = file
            .error_message
            .as_deref()
            .or(file.entity_id.as_deref())
            .unwrap_or_default();
        if detail.is_empty() {
            let _ = writeln!(out, "{label} {}", file.path);
        } else {
            let _ = writeln!(out, "{label} {} ({detail})", file.path);
        }
    }
    let summary = response.summary();
    let _ = write!(
        out,
        "{} succeeded, {} failed, {} skipped",
        summary.success, summary.failed, summary.skipped
    );
    if let Some(message) = &response.error_message {
        let _ = write!(out, "\n{message}");
    }
    out
}
