//! Schema-conditioned SQL generation.
//!
//! Pure functions from a [`SchemaProbeResult`] plus pagination to SQL
//! text. A column or table absent from the probe is never referenced;
//! a fixed fallback literal is substituted instead so the query still
//! executes against older schemas. The only interpolated values are
//! identifiers drawn from the probe's own fixed table list, integer row
//! references, and quote-escaped guids.

use mx_core::constants::{chat_style, tables};

use crate::probe::SchemaProbeResult;

/// How a conversation is addressed when re-querying. The row reference
/// is preferred over the guid, which may collide across chats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionKey {
    RowId(i64),
    Guid(String),
}

impl SelectionKey {
    /// SQL expression selecting the chat ROWID for this key.
    fn chat_rowid_expr(&self) -> String {
        match self {
            SelectionKey::RowId(id) => id.to_string(),
            SelectionKey::Guid(guid) => format!(
                "(SELECT ROWID FROM chat WHERE guid = '{}' LIMIT 1)",
                escape_sql_string(guid)
            ),
        }
    }
}

/// Substitute `present` when `table.column` exists, else `fallback`.
/// This keeps the per-column adaptation data-driven and testable.
fn col_or(
    probe: &SchemaProbeResult,
    table: &str,
    column: &str,
    present: &str,
    fallback: &str,
) -> String {
    if probe.has_column(table, column) {
        present.to_string()
    } else {
        fallback.to_string()
    }
}

/// Double single quotes for safe embedding in a SQL string literal.
fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Paged conversation overview query.
///
/// Produces columns: `rowid`, `identifier`, `title`, `last_date`,
/// `preview`, `is_group`. Ordered by last activity descending with the
/// row id as a stable tie-break.
pub fn conversation_page_query(probe: &SchemaProbeResult, page_size: i64, offset: i64) -> String {
    let identifier = col_or(
        probe,
        tables::CHAT,
        "guid",
        "c.guid",
        "CAST(c.ROWID AS TEXT)",
    );

    let title = if probe.has_column(tables::CHAT, "display_name") {
        if probe.has_column(tables::CHAT, "chat_identifier") {
            "COALESCE(NULLIF(c.display_name, ''), NULLIF(c.chat_identifier, ''), '')".to_string()
        } else {
            "COALESCE(NULLIF(c.display_name, ''), '')".to_string()
        }
    } else if probe.has_column(tables::CHAT, "chat_identifier") {
        "COALESCE(NULLIF(c.chat_identifier, ''), '')".to_string()
    } else {
        "''".to_string()
    };

    let last_date = col_or(
        probe,
        tables::MESSAGE,
        "date",
        "COALESCE(MAX(m.date), 0)",
        "0",
    );

    let preview = if probe.has_column(tables::MESSAGE, "text") {
        "COALESCE(NULLIF(MAX(CASE WHEN m.date = last.max_date THEN m.text END), ''), '')"
            .to_string()
    } else if probe.has_column(tables::MESSAGE, "attributedBody") {
        // Only the binary rich-text column exists; decoding happens per
        // message, not in the overview query.
        "'[Rich text]'".to_string()
    } else {
        "''".to_string()
    };

    let is_group = if probe.has_column(tables::CHAT, "style") {
        format!(
            "CASE WHEN c.style = {} THEN 1 ELSE 0 END",
            chat_style::GROUP
        )
    } else if probe.has_column(tables::CHAT_HANDLE_JOIN, "chat_id")
        && probe.has_column(tables::CHAT_HANDLE_JOIN, "handle_id")
    {
        "CASE WHEN (SELECT COUNT(DISTINCT chj.handle_id) FROM chat_handle_join chj \
         WHERE chj.chat_id = c.ROWID) > 1 THEN 1 ELSE 0 END"
            .to_string()
    } else {
        "0".to_string()
    };

    // The preview needs the timestamp of the newest message, which is
    // only available when message.date exists.
    let (message_join, preview_expr) = if probe.has_column(tables::MESSAGE, "date") {
        (
            "LEFT JOIN chat_message_join cmj ON cmj.chat_id = c.ROWID \
             LEFT JOIN message m ON m.ROWID = cmj.message_id \
             LEFT JOIN (SELECT cmj2.chat_id AS chat_id, MAX(m2.date) AS max_date \
                        FROM chat_message_join cmj2 \
                        JOIN message m2 ON m2.ROWID = cmj2.message_id \
                        GROUP BY cmj2.chat_id) last ON last.chat_id = c.ROWID"
                .to_string(),
            preview,
        )
    } else {
        (
            "LEFT JOIN chat_message_join cmj ON cmj.chat_id = c.ROWID \
             LEFT JOIN message m ON m.ROWID = cmj.message_id"
                .to_string(),
            // Without a timestamp there is no "latest" message to preview.
            "''".to_string(),
        )
    };

    format!(
        "SELECT c.ROWID AS rowid, {identifier} AS identifier, {title} AS title, \
         {last_date} AS last_date, {preview_expr} AS preview, {is_group} AS is_group \
         FROM chat c \
         {message_join} \
         GROUP BY c.ROWID \
         ORDER BY last_date DESC, c.ROWID DESC \
         LIMIT {page_size} OFFSET {offset}"
    )
}

/// Participant handles for one conversation, in join order.
///
/// Returns `None` when the schema cannot express participants at all.
pub fn participants_query(probe: &SchemaProbeResult, key: &SelectionKey) -> Option<String> {
    if !probe.has_table(tables::CHAT_HANDLE_JOIN) || !probe.has_column(tables::HANDLE, "id") {
        return None;
    }
    let chat_rowid = key.chat_rowid_expr();
    Some(format!(
        "SELECT h.id AS handle FROM chat_handle_join chj \
         JOIN handle h ON h.ROWID = chj.handle_id \
         WHERE chj.chat_id = {chat_rowid} \
         ORDER BY chj.handle_id"
    ))
}

/// Messages of one conversation, oldest first, capped at `limit` rows.
pub fn messages_query(probe: &SchemaProbeResult, key: &SelectionKey, limit: i64) -> String {
    let guid = col_or(
        probe,
        tables::MESSAGE,
        "guid",
        "m.guid",
        "CAST(m.ROWID AS TEXT)",
    );
    let text = col_or(probe, tables::MESSAGE, "text", "m.text", "NULL");
    let body = col_or(
        probe,
        tables::MESSAGE,
        "attributedBody",
        "m.attributedBody",
        "NULL",
    );
    let sender = if probe.has_column(tables::MESSAGE, "handle_id")
        && probe.has_column(tables::HANDLE, "id")
    {
        "(SELECT h.id FROM handle h WHERE h.ROWID = m.handle_id)".to_string()
    } else {
        "NULL".to_string()
    };

    let chat_rowid = key.chat_rowid_expr();

    format!(
        "SELECT m.ROWID AS rowid, {guid} AS guid, m.date AS date, \
         m.is_from_me AS is_from_me, {sender} AS sender, {text} AS text, \
         {body} AS attributed_body \
         FROM message m \
         JOIN chat_message_join cmj ON cmj.message_id = m.ROWID \
         WHERE cmj.chat_id = {chat_rowid} \
         ORDER BY m.date ASC, m.ROWID ASC \
         LIMIT {limit}"
    )
}

/// Attachment metadata for one message.
///
/// Returns `None` when the schema has no attachment tables; absence of
/// individual metadata columns falls back to NULL per column.
pub fn attachments_query(probe: &SchemaProbeResult, message_rowid: i64) -> Option<String> {
    if !probe.has_table(tables::ATTACHMENT) || !probe.has_table(tables::MESSAGE_ATTACHMENT_JOIN) {
        return None;
    }
    let filename = col_or(probe, tables::ATTACHMENT, "filename", "a.filename", "NULL");
    let mime = col_or(probe, tables::ATTACHMENT, "mime_type", "a.mime_type", "NULL");
    let transfer = col_or(
        probe,
        tables::ATTACHMENT,
        "transfer_name",
        "a.transfer_name",
        "NULL",
    );

    Some(format!(
        "SELECT {filename} AS filename, {mime} AS mime_type, {transfer} AS transfer_name \
         FROM attachment a \
         JOIN message_attachment_join maj ON maj.attachment_id = a.ROWID \
         WHERE maj.message_id = {message_rowid} \
         ORDER BY a.ROWID"
    ))
}

/// Total row count of a probed table, or 0 when the table is absent.
pub fn count_query(probe: &SchemaProbeResult, table: &str) -> Option<String> {
    if probe.has_table(table) {
        Some(format!("SELECT COUNT(*) AS n FROM {table}"))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ReadOnlyDb;
    use crate::probe::probe;

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

    const MINIMAL_SCHEMA: &str = "
        CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, guid TEXT);
        CREATE TABLE message (
            ROWID INTEGER PRIMARY KEY, date INTEGER, is_from_me INTEGER
        );
        CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
    ";

    fn open_fixture(dir: &tempfile::TempDir, schema: &str) -> ReadOnlyDb {
        let path = dir.path().join("chat.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(schema).unwrap();
        drop(conn);
        ReadOnlyDb::open(&path).unwrap()
    }

    #[test]
    fn test_full_schema_query_executes() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_fixture(&dir, FULL_SCHEMA);
        let result = probe(&db).unwrap();

        let sql = conversation_page_query(&result, 100, 0);
        assert!(sql.contains("c.display_name"));
        db.query_rows(&sql).unwrap();
    }

    #[test]
    fn test_minimal_schema_query_executes_with_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_fixture(&dir, MINIMAL_SCHEMA);
        let result = probe(&db).unwrap();
        assert!(result.is_supported());

        let sql = conversation_page_query(&result, 100, 0);
        // Absent identifiers must never be referenced.
        assert!(!sql.contains("display_name"));
        assert!(!sql.contains("chat_identifier"));
        assert!(!sql.contains("c.style"));
        assert!(!sql.contains("chat_handle_join"));
        db.query_rows(&sql).unwrap();

        let msgs = messages_query(&result, &SelectionKey::RowId(1), 10_000);
        assert!(!msgs.contains("attributedBody"));
        assert!(!msgs.contains("m.text"));
        db.query_rows(&msgs).unwrap();

        assert!(participants_query(&result, &SelectionKey::RowId(1)).is_none());
        assert!(attachments_query(&result, 1).is_none());
    }

    #[test]
    fn test_guid_selection_escapes_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_fixture(&dir, FULL_SCHEMA);
        let result = probe(&db).unwrap();

        let key = SelectionKey::Guid("it's;-;+1555".to_string());
        let sql = messages_query(&result, &key, 100);
        assert!(sql.contains("it''s"));
        db.query_rows(&sql).unwrap();
    }

    #[test]
    fn test_ordering_and_pagination_clause() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_fixture(&dir, FULL_SCHEMA);
        let result = probe(&db).unwrap();

        let sql = conversation_page_query(&result, 100, 200);
        assert!(sql.contains("ORDER BY last_date DESC, c.ROWID DESC"));
        assert!(sql.contains("LIMIT 100 OFFSET 200"));
    }

    #[test]
    fn test_group_flag_from_style_column() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_fixture(&dir, FULL_SCHEMA);
        let result = probe(&db).unwrap();
        let sql = conversation_page_query(&result, 10, 0);
        assert!(sql.contains(&format!("c.style = {}", chat_style::GROUP)));
    }

    #[test]
    fn test_style_45_chat_is_group() {
        use crate::value::{row_i64, row_text};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(FULL_SCHEMA).unwrap();
        conn.execute_batch(
            "INSERT INTO chat (ROWID, guid, style) VALUES (1, 'group-chat', 45);
             INSERT INTO chat (ROWID, guid, style) VALUES (2, 'direct-chat', 43);",
        )
        .unwrap();
        drop(conn);

        let db = ReadOnlyDb::open(&path).unwrap();
        let result = probe(&db).unwrap();
        let rows = db
            .query_rows(&conversation_page_query(&result, 10, 0))
            .unwrap();

        let flag_of = |guid: &str| {
            rows.iter()
                .find(|r| row_text(r, "identifier").as_deref() == Some(guid))
                .and_then(|r| row_i64(r, "is_group"))
        };
        assert_eq!(flag_of("group-chat"), Some(1));
        assert_eq!(flag_of("direct-chat"), Some(0));
    }

    #[test]
    fn test_renamed_join_columns_fall_back_to_not_group() {
        use crate::value::row_i64;

        // No style column, and a join table whose columns do not match
        // the expected names. The builder must not reference them.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE chat (ROWID INTEGER PRIMARY KEY, guid TEXT);
             CREATE TABLE message (
                 ROWID INTEGER PRIMARY KEY, date INTEGER, is_from_me INTEGER
             );
             CREATE TABLE chat_message_join (chat_id INTEGER, message_id INTEGER);
             CREATE TABLE chat_handle_join (cid INTEGER, hid INTEGER);
             INSERT INTO chat (guid) VALUES ('chat-1');
             INSERT INTO chat_handle_join (cid, hid) VALUES (1, 1), (1, 2);",
        )
        .unwrap();
        drop(conn);

        let db = ReadOnlyDb::open(&path).unwrap();
        let result = probe(&db).unwrap();
        assert!(result.is_supported());

        let sql = conversation_page_query(&result, 10, 0);
        assert!(!sql.contains("chj.handle_id"));
        assert!(!sql.contains("chj.chat_id"));

        let rows = db.query_rows(&sql).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(row_i64(&rows[0], "is_group"), Some(0));
    }
}
