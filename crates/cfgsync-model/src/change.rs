//! Change records
//!
//! A [`Change`] is created per call and never persisted by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Operation requested for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// File was added
    Add,
    /// File content changed
    Modify,
    /// File was removed
    Delete,
    /// File was moved; carries no application semantics
    Rename,
}

impl ChangeType {
    /// Sign applied to the kind ordinal when sorting
    ///
    /// Deletes are negative so they always precede additions, and a larger
    /// ordinal (a more dependent kind) is deleted first.
    #[inline]
    #[must_use]
    pub fn sign(self) -> i64 {
        match self {
            Self::Delete => -1,
            Self::Add | Self::Modify | Self::Rename => 1,
        }
    }

    /// Whether the operation writes the parsed document
    #[inline]
    #[must_use]
    pub fn is_upsert(self) -> bool {
        matches!(self, Self::Add | Self::Modify)
    }

    /// Stable uppercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Modify => "MODIFY",
            Self::Delete => "DELETE",
            Self::Rename => "RENAME",
        }
    }
}

impl Display for ChangeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file-level mutation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    /// Repository-relative file path, including the setup root
    pub path: String,
    /// Raw file content
    pub content: String,
    /// Requested operation
    pub change_type: ChangeType,
    /// Owning tenant
    pub tenant_id: String,
    /// Commit the change was read from, if it came from version control
    pub commit_id: Option<String>,
    /// Entity the caller expects to find at `path`
    pub declared_entity_id: Option<String>,
}

impl Change {
    /// Create new change
    #[inline]
    #[must_use]
    pub fn new(
        tenant_id: impl Into<String>,
        path: impl Into<String>,
        change_type: ChangeType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            change_type,
            tenant_id: tenant_id.into(),
            commit_id: None,
            declared_entity_id: None,
        }
    }

    /// Add change
    #[inline]
    #[must_use]
    pub fn add(tenant_id: impl Into<String>, path: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(tenant_id, path, ChangeType::Add, content)
    }

    /// Modify change
    #[inline]
    #[must_use]
    pub fn modify(
        tenant_id: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new(tenant_id, path, ChangeType::Modify, content)
    }

    /// Delete change with empty content
    #[inline]
    #[must_use]
    pub fn delete(tenant_id: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(tenant_id, path, ChangeType::Delete, String::new())
    }

    /// With commit id
    #[inline]
    #[must_use]
    pub fn with_commit(mut self, commit_id: impl Into<String>) -> Self {
        self.commit_id = Some(commit_id.into());
        self
    }

    /// With declared entity id
    #[inline]
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.declared_entity_id = Some(entity_id.into());
        self
    }

    /// Commit id, treating an empty string as absent
    #[inline]
    #[must_use]
    pub fn commit(&self) -> Option<&str> {
        self.commit_id.as_deref().filter(|c| !c.is_empty())
    }

    /// Declared entity id, treating an empty string as absent
    #[inline]
    #[must_use]
    pub fn declared_entity(&self) -> Option<&str> {
        self.declared_entity_id.as_deref().filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_sign_is_negative() {
        assert_eq!(ChangeType::Delete.sign(), -1);
        assert_eq!(ChangeType::Add.sign(), 1);
        assert_eq!(ChangeType::Modify.sign(), 1);
        assert_eq!(ChangeType::Rename.sign(), 1);
    }

    #[test]
    fn empty_identifiers_are_absent() {
        let change = Change::add("t1", "Setup/Tags.yaml", "")
            .with_commit("")
            .with_entity_id("");
        assert!(change.commit().is_none());
        assert!(change.declared_entity().is_none());

        let change = change.with_commit("abc").with_entity_id("e-1");
        assert_eq!(change.commit(), Some("abc"));
        assert_eq!(change.declared_entity(), Some("e-1"));
    }

    #[test]
    fn change_type_serde_names() {
        let json = serde_json::to_string(&ChangeType::Delete).unwrap();
        assert_eq!(json, "\"DELETE\"");
        let parsed: ChangeType = serde_json::from_str("\"MODIFY\"").unwrap();
        assert_eq!(parsed, ChangeType::Modify);
    }
}
