//! Rust structs mapping to database tables.

use std::collections::BTreeMap;

use ic_core::{Error, FieldFile, Record, RecordId, Result};
use uuid::Uuid;

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(T::from(uuid))
}

/// A row of the `records` table.
#[derive(Debug, Clone)]
pub struct RecordRow {
    pub id: RecordId,
    pub kind: String,
    pub files: String,
    pub created_at: String,
    pub updated_at: String,
}

impl RecordRow {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            kind: row.get(1)?,
            files: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    /// Decode the JSON field map into a [`Record`].
    pub fn into_record(self) -> Result<Record> {
        let files: BTreeMap<String, Option<FieldFile>> = serde_json::from_str(&self.files)
            .map_err(|e| {
                Error::database(format!("record {} has a malformed field map: {e}", self.id))
            })?;
        Ok(Record::from_parts(self.id, self.kind, files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(files: &str) -> RecordRow {
        RecordRow {
            id: RecordId::new(),
            kind: "profile".into(),
            files: files.into(),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn decodes_field_map() {
        let record = row(r#"{"avatar":"a/b.png","resume":null}"#)
            .into_record()
            .unwrap();
        assert_eq!(record.file("avatar"), Some(&FieldFile::new("a/b.png")));
        assert!(record.file("resume").is_none());
        assert_eq!(record.field_names().count(), 2);
    }

    #[test]
    fn malformed_field_map_is_database_error() {
        let err = row("[1,2]").into_record().unwrap_err();
        assert!(matches!(err, Error::Database { .. }));
    }
}
