//! Record CRUD operations.

use chrono::Utc;
use ic_core::{Error, Record, RecordId, Result};
use rusqlite::{Connection, OptionalExtension};

use crate::models::RecordRow;

const COLS: &str = "id, kind, files, created_at, updated_at";

/// Get the committed copy of a record, `None` if no row exists.
pub fn get_record(conn: &Connection, id: RecordId) -> Result<Option<Record>> {
    let q = format!("SELECT {COLS} FROM records WHERE id = ?1");
    let row = conn
        .query_row(&q, [id.to_string()], RecordRow::from_row)
        .optional()
        .map_err(|e| Error::database(e.to_string()))?;
    row.map(RecordRow::into_record).transpose()
}

/// Get the committed copy of a record, failing with `NotFound` if absent.
pub fn require_record(conn: &Connection, id: RecordId) -> Result<Record> {
    get_record(conn, id)?.ok_or_else(|| Error::not_found("record", id))
}

/// Persist a record.
///
/// A record without identity is inserted under a fresh id, which is written
/// back into `record`. A record with identity is upserted: updated when the
/// row exists, inserted under that id otherwise.
pub fn save_record(conn: &Connection, record: &mut Record) -> Result<RecordId> {
    let now = Utc::now().to_rfc3339();
    let files =
        serde_json::to_string(record.file_map()).map_err(|e| Error::Internal(e.to_string()))?;

    let id = match record.id() {
        Some(id) => {
            conn.execute(
                "INSERT INTO records (id, kind, files, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    files = excluded.files,
                    updated_at = excluded.updated_at",
                rusqlite::params![id.to_string(), record.kind(), files, now],
            )
            .map_err(|e| Error::database(e.to_string()))?;
            id
        }
        None => {
            let id = RecordId::new();
            conn.execute(
                "INSERT INTO records (id, kind, files, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id.to_string(), record.kind(), files, now],
            )
            .map_err(|e| Error::database(e.to_string()))?;
            record.set_id(Some(id));
            id
        }
    };

    tracing::debug!(record = %id, kind = record.kind(), "Persisted record");
    Ok(id)
}

/// Delete a record row by ID. Returns whether a row was removed.
pub fn delete_record(conn: &Connection, id: RecordId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM records WHERE id = ?1", [id.to_string()])
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// List every record of a kind, oldest first.
pub fn list_records(conn: &Connection, kind: &str) -> Result<Vec<Record>> {
    let q = format!("SELECT {COLS} FROM records WHERE kind = ?1 ORDER BY created_at, id");
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([kind], RecordRow::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    rows.into_iter().map(RecordRow::into_record).collect()
}
