//! Change sources read from disk
//!
//! A source is either a `.zip` archive or a directory tree. Both are filtered
//! the same way: hidden entries are dropped, and only `.yaml` files or files
//! inside a raw-content folder become Add changes.

use anyhow::{Context, Result};
use cfgsync_core::{extract_changes, is_candidate, join_prefix};
use cfgsync_model::Change;
use std::fs;
use std::path::Path;

/// Whether the path names a zip archive
#[must_use]
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Read every candidate file of a source as an Add change
///
/// # Errors
/// Returns an error if the source cannot be read or an archive is malformed.
pub fn load_changes(source: &Path, tenant_id: &str, prefix: Option<&str>) -> Result<Vec<Change>> {
    if is_archive(source) {
        let bytes = fs::read(source).with_context(|| format!("cannot read {}", source.display()))?;
        return Ok(extract_changes(&bytes, tenant_id, prefix)?);
    }

    let mut names = Vec::new();
    walk(source, source, &mut names)
        .with_context(|| format!("cannot walk {}", source.display()))?;

    let mut changes = Vec::with_capacity(names.len());
    for name in names {
        let file = source.join(&name);
        let bytes = fs::read(&file).with_context(|| format!("cannot read {}", file.display()))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        changes.push(Change::add(tenant_id, join_prefix(prefix, &name), content));
    }
    tracing::info!(source = %source.display(), files = changes.len(), "directory loaded");
    Ok(changes)
}

/// Collect candidate files below `dir` as `/`-separated paths relative to `root`
fn walk(root: &Path, dir: &Path, names: &mut Vec<String>) -> std::io::Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let Some(name) = relative_name(root, &path) else {
            tracing::debug!(path = %path.display(), "non UTF-8 path ignored");
            continue;
        };
        if entry.file_type()?.is_dir() {
            if !entry.file_name().to_string_lossy().starts_with('.') {
                walk(root, &path, names)?;
            }
        } else if is_candidate(&name) {
            names.push(name);
        }
    }
    Ok(())
}

fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let segments = path
        .strip_prefix(root)
        .ok()?
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_detection() {
        assert!(is_archive(Path::new("export.zip")));
        assert!(is_archive(Path::new("EXPORT.ZIP")));
        assert!(!is_archive(Path::new("Setup")));
    }

    #[test]
    fn relative_names_use_forward_slashes() {
        let root = Path::new("/tmp/repo");
        assert_eq!(
            relative_name(root, &root.join("Setup").join("Tags.yaml")).as_deref(),
            Some("Setup/Tags.yaml")
        );
    }
}
