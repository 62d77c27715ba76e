//! Parsed configuration documents

use crate::error::HandlerError;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

/// Field carrying the document sub-type
const TYPE_FIELD: &str = "type";

/// Domain object produced by a handler's parse step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParsedObject {
    /// Structured YAML document
    Document {
        /// Value of the top-level `type` field, if any
        sub_type: Option<String>,
        /// Top-level mapping
        body: Mapping,
    },
    /// File stored verbatim (config file content, manifests)
    Raw(String),
}

impl ParsedObject {
    /// Document body, if structured
    #[inline]
    #[must_use]
    pub fn body(&self) -> Option<&Mapping> {
        match self {
            Self::Document { body, .. } => Some(body),
            Self::Raw(_) => None,
        }
    }

    /// Document sub-type, if declared
    #[inline]
    #[must_use]
    pub fn sub_type(&self) -> Option<&str> {
        match self {
            Self::Document { sub_type, .. } => sub_type.as_deref(),
            Self::Raw(_) => None,
        }
    }
}

/// Parse YAML content into a top-level mapping
///
/// When `known_fields` is given, any other top-level key is rejected.
///
/// # Errors
/// - `HandlerError::Malformed` for invalid YAML or a non-mapping root
/// - `HandlerError::UnknownField` for an unrecognized top-level key
pub fn parse_document(
    content: &str,
    known_fields: Option<&BTreeSet<String>>,
) -> Result<ParsedObject, HandlerError> {
    if content.trim().is_empty() {
        return Err(HandlerError::Malformed("Unable to parse yaml: empty document".to_string()));
    }

    let value: Value = serde_yaml::from_str(content).map_err(|e| HandlerError::from_yaml(&e))?;
    let Value::Mapping(body) = value else {
        return Err(HandlerError::Malformed(
            "Unable to parse yaml: expected a mapping at the document root".to_string(),
        ));
    };

    if let Some(known) = known_fields {
        for key in body.keys() {
            let name = key_name(key);
            if !known.contains(&name) {
                return Err(HandlerError::UnknownField(name));
            }
        }
    }

    let sub_type = body
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ParsedObject::Document { sub_type, body })
}

pub(crate) fn key_name(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
