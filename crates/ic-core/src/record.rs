//! The record model: an identity plus a set of file-backed field values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// The stored value of a file-backed field.
///
/// Holds the blob's storage-relative name; the storage layer resolves it to a
/// filesystem path. Two values are equal iff their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldFile {
    name: String,
}

impl FieldFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl fmt::Display for FieldFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A persisted (or about-to-be-persisted) entity with file-backed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: Option<RecordId>,
    kind: String,
    files: BTreeMap<String, Option<FieldFile>>,
}

impl Record {
    /// Create an unsaved record with every named field unset.
    pub fn new<'a>(kind: &str, fields: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            id: None,
            kind: kind.to_string(),
            files: fields.into_iter().map(|f| (f.to_string(), None)).collect(),
        }
    }

    /// Rebuild a record from stored parts.
    pub fn from_parts(
        id: RecordId,
        kind: String,
        files: BTreeMap<String, Option<FieldFile>>,
    ) -> Self {
        let files = files
            .into_iter()
            .map(|(name, value)| (name, value.filter(|v| !v.is_empty())))
            .collect();
        Self {
            id: Some(id),
            kind,
            files,
        }
    }

    /// The record's identity, absent until first persisted.
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    /// Assign (or clear) the record's identity. Called by the persistence layer.
    pub fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The current value of a field, `None` when unset or unknown.
    pub fn file(&self, field: &str) -> Option<&FieldFile> {
        self.files.get(field).and_then(Option::as_ref)
    }

    /// Point a field at a stored blob. An empty name clears the field.
    pub fn set(&mut self, field: &str, value: FieldFile) {
        let value = (!value.is_empty()).then_some(value);
        self.files.insert(field.to_string(), value);
    }

    /// Unset a field.
    pub fn clear(&mut self, field: &str) {
        self.files.insert(field.to_string(), None);
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Every field with its current value.
    pub fn files(&self) -> impl Iterator<Item = (&str, Option<&FieldFile>)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// The raw field map, as stored.
    pub fn file_map(&self) -> &BTreeMap<String, Option<FieldFile>> {
        &self.files
    }
}
