//! Read-only SQLite query engine.
//!
//! Opens the source messages database without any write capability and
//! returns rows as dynamically-typed maps, since the set of available
//! columns depends on the schema probe rather than a fixed version.

use std::path::{Path, PathBuf};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use mx_core::{MxError, MxResult};

use crate::value::{Row, SqlValue};

/// A read-only handle to the source database.
///
/// The connection is closed when the handle drops, regardless of which
/// path (success, error, cancellation) releases it.
#[derive(Debug)]
pub struct ReadOnlyDb {
    conn: Connection,
    path: PathBuf,
}

impl ReadOnlyDb {
    /// Open the database at `path` read-only.
    ///
    /// Returns `FileMissing` when the file does not exist and
    /// `OpenFailed` with the engine's code and message for any other
    /// open failure. An open refusal of an existing file is usually a
    /// permission problem on the platforms this tool targets.
    pub fn open(path: &Path) -> MxResult<Self> {
        if !path.exists() {
            return Err(MxError::FileMissing);
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(open_error)?;

        tracing::debug!("opened source database read-only: {}", path.display());

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path the handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Execute `sql` and collect every result row.
    ///
    /// Each row maps column name to a typed [`SqlValue`]. Preparation
    /// failures and mid-stream execution failures carry the engine's
    /// diagnostic text.
    pub fn query_rows(&self, sql: &str) -> MxResult<Vec<Row>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| MxError::PrepareFailed(e.to_string()))?;

        let column_names: Vec<String> =
            stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt
            .query([])
            .map_err(|e| MxError::StepFailed(e.to_string()))?;

        let mut out = Vec::new();
        loop {
            let row = match rows.next() {
                Ok(Some(row)) => row,
                Ok(None) => break,
                Err(e) => return Err(MxError::StepFailed(e.to_string())),
            };

            let mut mapped = Row::with_capacity(column_names.len());
            for (idx, name) in column_names.iter().enumerate() {
                let value = match row.get_ref(idx) {
                    Ok(value) => convert_value(value),
                    Err(e) => return Err(MxError::StepFailed(e.to_string())),
                };
                mapped.insert(name.clone(), value);
            }
            out.push(mapped);
        }

        Ok(out)
    }

    /// Execute `sql` expecting a single integer result (e.g. COUNT).
    pub fn query_scalar_i64(&self, sql: &str) -> MxResult<i64> {
        let rows = self.query_rows(sql)?;
        let value = rows
            .first()
            .and_then(|row| row.values().next())
            .and_then(SqlValue::as_i64)
            .unwrap_or(0);
        Ok(value)
    }
}

fn convert_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}

fn open_error(err: rusqlite::Error) -> MxError {
    match &err {
        rusqlite::Error::SqliteFailure(code, message) => MxError::OpenFailed {
            code: code.extended_code,
            message: message
                .clone()
                .unwrap_or_else(|| code.to_string()),
        },
        other => MxError::OpenFailed {
            code: -1,
            message: other.to_string(),
        },
    }
}
