//! Zip archive extraction
//!
//! Hidden entries and directories are dropped. Entries ending in `.yaml`, or
//! stored in a raw-content folder, become Add changes.

use crate::error::ArchiveError;
use cfgsync_model::{Change, YAML_EXTENSION};
use std::io::{Cursor, Read};

const RAW_CONTENT_FOLDERS: [&str; 2] = ["Config Files/", "Manifests/Files/"];

fn is_hidden(name: &str) -> bool {
    name.split('/').any(|segment| segment.starts_with('.'))
}

fn is_recognized(name: &str) -> bool {
    name.ends_with(YAML_EXTENSION) || RAW_CONTENT_FOLDERS.iter().any(|f| name.contains(f))
}

/// Whether a file path would be picked up from an archive or a directory tree
#[must_use]
pub fn is_candidate(name: &str) -> bool {
    !is_hidden(name) && is_recognized(name)
}

/// Join an optional target prefix and a relative entry path
#[must_use]
pub fn join_prefix(prefix: Option<&str>, name: &str) -> String {
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}/{}", name.trim_start_matches('/')),
        None => name.trim_start_matches('/').to_string(),
    }
}

/// Build Add changes from the recognized entries of a zip archive
///
/// `prefix` is prepended to every entry path when given.
///
/// # Errors
/// - `ArchiveError::Open` if the bytes are not a zip archive
/// - `ArchiveError::Entry` if a recognized entry cannot be decompressed
///
/// Entry content is decoded lossily, so binary files still become changes.
pub fn extract_changes(
    bytes: &[u8],
    tenant_id: &str,
    prefix: Option<&str>,
) -> Result<Vec<Change>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut changes = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();
        if entry.is_dir() || !is_candidate(&name) {
            tracing::debug!(entry = %name, "archive entry ignored");
            continue;
        }

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| ArchiveError::Entry {
                name: name.clone(),
                source,
            })?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        changes.push(Change::add(tenant_id, join_prefix(prefix, &name), content));
    }

    tracing::info!(files = changes.len(), "archive extracted");
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let raw: Vec<(&str, &[u8])> = entries.iter().map(|(n, c)| (*n, c.as_bytes())).collect();
        archive_bytes(&raw)
    }

    fn archive_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, SimpleFileOptions::default()).unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn keeps_recognized_entries() {
        let bytes = archive(&[
            ("Setup/", ""),
            ("Setup/Tags.yaml", "type: TAG\n"),
            ("Setup/.git/config", "x"),
            ("Setup/.hidden.yaml", "x: 1\n"),
            ("Setup/notes.txt", "hello"),
            ("Setup/Applications/a/Services/s/Config Files/app.properties", "k=v"),
        ]);
        let changes = extract_changes(&bytes, "t1", None).unwrap();
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Setup/Tags.yaml",
                "Setup/Applications/a/Services/s/Config Files/app.properties"
            ]
        );
        assert_eq!(changes[1].content, "k=v");
        assert!(changes.iter().all(|c| c.tenant_id == "t1"));
    }

    #[test]
    fn binary_entry_does_not_abort_extraction() {
        let keystore = "Setup/Applications/a/Services/s/Config Files/keystore.jks";
        let bytes = archive_bytes(&[
            (keystore, &[0xff_u8, 0xfe, 0x00, 0x80][..]),
            ("Setup/Tags.yaml", &b"type: TAG\n"[..]),
        ]);
        let changes = extract_changes(&bytes, "t1", None).unwrap();
        let paths: Vec<&str> = changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec![keystore, "Setup/Tags.yaml"]);
        assert_eq!(changes[0].content, "\u{fffd}\u{fffd}\u{0}\u{fffd}");
        assert_eq!(changes[1].content, "type: TAG\n");
    }

    #[test]
    fn prefix_is_prepended() {
        let bytes = archive(&[("Tags.yaml", "type: TAG\n")]);
        let changes = extract_changes(&bytes, "t1", Some("Setup/")).unwrap();
        assert_eq!(changes[0].path, "Setup/Tags.yaml");
    }

    #[test]
    fn candidate_filter() {
        assert!(is_candidate("Setup/Tags.yaml"));
        assert!(is_candidate("Setup/Applications/a/Services/s/Manifests/Files/deploy.tpl"));
        assert!(!is_candidate("Setup/.git/HEAD"));
        assert!(!is_candidate("README.md"));
        assert_eq!(join_prefix(None, "/Tags.yaml"), "Tags.yaml");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            extract_changes(b"not a zip", "t1", None),
            Err(ArchiveError::Open(_))
        ));
    }
}
