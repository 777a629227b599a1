//! Runtime schema inspection.
//!
//! The source database schema drifts across OS versions, so nothing may
//! assume a fixed layout. The probe enumerates which tables and columns
//! actually exist; the query builder then adapts to that result.

use std::collections::{BTreeMap, BTreeSet};

use mx_core::constants::tables;
use mx_core::MxResult;

use crate::engine::ReadOnlyDb;
use crate::value::row_text;

/// Tables the probe inspects. Tables outside this list are ignored.
const TABLES_OF_INTEREST: &[&str] = &[
    tables::CHAT,
    tables::MESSAGE,
    tables::HANDLE,
    tables::CHAT_HANDLE_JOIN,
    tables::CHAT_MESSAGE_JOIN,
    tables::ATTACHMENT,
    tables::MESSAGE_ATTACHMENT_JOIN,
];

/// Minimal contract a database must satisfy to be readable at all.
/// Entries are `(table, Some(column))` or `(table, None)` for bare
/// table presence.
const REQUIRED: &[(&str, Option<&str>)] = &[
    (tables::CHAT, Some("ROWID")),
    (tables::CHAT, Some("guid")),
    (tables::MESSAGE, Some("ROWID")),
    (tables::MESSAGE, Some("date")),
    (tables::MESSAGE, Some("is_from_me")),
    (tables::CHAT_MESSAGE_JOIN, None),
];

/// Immutable snapshot of what the source database actually contains.
#[derive(Debug, Clone)]
pub struct SchemaProbeResult {
    /// Table names present in the database.
    pub tables: BTreeSet<String>,
    /// Column names per table of interest. Absent tables map to an
    /// empty set rather than being missing from the map.
    pub columns: BTreeMap<String, BTreeSet<String>>,
    /// Qualified names (`table.column` or bare table name) from the
    /// required minimum that are absent.
    pub missing_required: Vec<String>,
}

impl SchemaProbeResult {
    /// Whether the database satisfies the minimal contract.
    pub fn is_supported(&self) -> bool {
        self.missing_required.is_empty()
    }

    /// Whether `table` exists.
    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    /// Whether `table.column` exists.
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns
            .get(table)
            .map(|cols| cols.contains(column))
            .unwrap_or(false)
    }
}

/// Probe the open database.
///
/// Introspection failures (the database cannot be enumerated at all)
/// propagate as errors; an unsupported schema is a normal result with
/// `is_supported() == false`.
pub fn probe(db: &ReadOnlyDb) -> MxResult<SchemaProbeResult> {
    let rows = db.query_rows("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let all_tables: BTreeSet<String> = rows
        .iter()
        .filter_map(|row| row_text(row, "name"))
        .collect();

    let mut columns = BTreeMap::new();
    for &table in TABLES_OF_INTEREST {
        let mut cols = BTreeSet::new();
        if all_tables.contains(table) {
            // Table names come from our fixed list, safe to interpolate.
            let info = db.query_rows(&format!("PRAGMA table_info({table})"))?;
            for row in &info {
                if let Some(name) = row_text(row, "name") {
                    cols.insert(name);
                }
            }
        }
        columns.insert(table.to_string(), cols);
    }

    let tables_present: BTreeSet<String> = all_tables
        .into_iter()
        .filter(|t| TABLES_OF_INTEREST.contains(&t.as_str()))
        .collect();

    let mut missing_required = Vec::new();
    for &(table, column) in REQUIRED {
        match column {
            Some(column) => {
                let present = columns
                    .get(table)
                    .map(|cols| cols.contains(column))
                    .unwrap_or(false);
                if !present {
                    missing_required.push(format!("{table}.{column}"));
                }
            }
            None => {
                if !tables_present.contains(table) {
                    missing_required.push(table.to_string());
                }
            }
        }
    }

    let result = SchemaProbeResult {
        tables: tables_present,
        columns,
        missing_required,
    };

    tracing::debug!(
        supported = result.is_supported(),
        tables = result.tables.len(),
        missing = ?result.missing_required,
        "schema probe complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Full modern-looking fixture schema.
    const FULL_SCHEMA: &str = "
        CREATE TABLE chat (
            ROWID INTEGER PRIMARY KEY, guid TEXT, style INTEGER,
            chat_identifier TEXT, display_name TEXT
        );
        CREATE TABLE message (
            ROWID INTEGER PRIMARY KEY, guid TEXT, text TEXT,
            attributedBody BLOB, handle_id INTEGER, date INTEGER,
            is_from_me INTEGER
        );
        CREATE TABLE handle (ROWID INTEGER PRIMARY KEY, id TEXT);
        CREATE TABLE chat_handle_join (chat_id INTEGER, handle_id INTEGER);
        CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
        CREATE TABLE attachment (
            ROWID INTEGER PRIMARY KEY, filename TEXT, mime_type TEXT,
            transfer_name TEXT
        );
        CREATE TABLE message_attachment_join (message_id INTEGER, attachment_id INTEGER);
    ";

    fn fixture(dir: &tempfile::TempDir, schema: &str) -> PathBuf {
        let path = dir.path().join("chat.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(schema).unwrap();
        path
    }

    #[test]
    fn test_full_schema_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(&dir, FULL_SCHEMA);
        let db = ReadOnlyDb::open(&path).unwrap();

        let result = probe(&db).unwrap();
        assert!(result.is_supported());
        assert!(result.missing_required.is_empty());
        assert!(result.has_column("chat", "display_name"));
        assert!(result.has_column("message", "attributedBody"));
    }

    #[test]
    fn test_missing_column_flips_supported() {
        let dir = tempfile::tempdir().unwrap();
        // message table lacks is_from_me.
        let path = fixture(
            &dir,
            "CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, guid TEXT);
             CREATE TABLE message (ROWID INTEGER PRIMARY KEY, date INTEGER);
             CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);",
        );
        let db = ReadOnlyDb::open(&path).unwrap();

        let result = probe(&db).unwrap();
        assert!(!result.is_supported());
        assert_eq!(result.missing_required, vec!["message.is_from_me".to_string()]);
    }

    #[test]
    fn test_missing_join_table_reported_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            &dir,
            "CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, guid TEXT);
             CREATE TABLE message (
                 ROWID INTEGER PRIMARY KEY, date INTEGER, is_from_me INTEGER
             );",
        );
        let db = ReadOnlyDb::open(&path).unwrap();

        let result = probe(&db).unwrap();
        assert!(!result.is_supported());
        assert_eq!(result.missing_required, vec!["chat_message_join".to_string()]);
    }

    #[test]
    fn test_absent_table_yields_empty_column_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = fixture(
            &dir,
            "CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, guid TEXT);
             CREATE TABLE message (
                 ROWID INTEGER PRIMARY KEY, date INTEGER, is_from_me INTEGER
             );
             CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);",
        );
        let db = ReadOnlyDb::open(&path).unwrap();

        let result = probe(&db).unwrap();
        assert!(result.is_supported());
        assert!(!result.has_table("attachment"));
        assert_eq!(result.columns.get("attachment").map(|c| c.len()), Some(0));
    }
}
