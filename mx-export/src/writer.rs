//! Export writers for the four output formats.
//!
//! Every writer shares one precondition: the destination's parent
//! directory must exist and the destination itself must not, so an
//! export can never silently overwrite a file. On success the output
//! is restricted to owner read/write.

use std::path::Path;

use rusqlite::Connection;

use mx_core::{MxError, MxResult};

use crate::bundle::{ExportBundle, ExportFormat};
use crate::package;

/// Write `bundle` to `dest` in the requested format.
///
/// `passphrase` is consulted only by the encrypted format and must be
/// non-empty there.
pub fn export(
    bundle: &ExportBundle,
    format: ExportFormat,
    dest: &Path,
    passphrase: Option<&str>,
) -> MxResult<()> {
    check_destination(dest)?;

    match format {
        ExportFormat::Text => write_text(bundle, dest),
        ExportFormat::Json => write_json(bundle, dest),
        ExportFormat::Sqlite => write_sqlite(bundle, dest),
        ExportFormat::Encrypted => {
            let passphrase = passphrase.unwrap_or_default();
            if passphrase.is_empty() {
                return Err(MxError::PassphraseMissing);
            }
            write_encrypted(bundle, dest, passphrase)
        }
    }?;

    restrict_permissions(dest)?;
    tracing::info!(
        format = %format,
        dest = %dest.display(),
        messages = bundle.messages.len(),
        "export written"
    );
    Ok(())
}

/// Refuse a destination whose parent is missing or that already exists.
fn check_destination(dest: &Path) -> MxResult<()> {
    if dest.exists() {
        return Err(MxError::InvalidDestination);
    }
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(MxError::InvalidDestination);
    }
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(dest: &Path) -> MxResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_dest: &Path) -> MxResult<()> {
    Ok(())
}

fn write_bytes(dest: &Path, bytes: &[u8]) -> MxResult<()> {
    std::fs::write(dest, bytes).map_err(|e| MxError::WriteFailed(e.to_string()))
}

/// One line per message: `[ISO-8601] sender: renderedText`.
fn write_text(bundle: &ExportBundle, dest: &Path) -> MxResult<()> {
    let mut out = String::new();
    for message in &bundle.messages {
        out.push_str(&format!(
            "[{}] {}: {}\n",
            message.iso_timestamp(),
            message.sender_label(),
            message.rendered_text()
        ));
    }
    write_bytes(dest, out.as_bytes())
}

fn write_json(bundle: &ExportBundle, dest: &Path) -> MxResult<()> {
    let json = serde_json::to_vec_pretty(bundle)?;
    write_bytes(dest, &json)
}

fn write_encrypted(bundle: &ExportBundle, dest: &Path, passphrase: &str) -> MxResult<()> {
    let json = serde_json::to_vec_pretty(bundle)?;
    let container = package::encrypt(&json, passphrase)?;
    write_bytes(dest, &container)
}

/// Fresh relational database with conversation, participant, message,
/// and attachment tables, populated inside one transaction. On any
/// insert failure the transaction rolls back and the partial
/// destination file is removed best-effort.
fn write_sqlite(bundle: &ExportBundle, dest: &Path) -> MxResult<()> {
    let result = populate_sqlite(bundle, dest);
    if result.is_err() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

fn populate_sqlite(bundle: &ExportBundle, dest: &Path) -> MxResult<()> {
    let mut conn = Connection::open(dest).map_err(|e| MxError::WriteFailed(e.to_string()))?;

    let tx = conn
        .transaction()
        .map_err(|e| MxError::WriteFailed(e.to_string()))?;

    tx.execute_batch(
        "CREATE TABLE conversation (
             identifier TEXT PRIMARY KEY,
             title TEXT NOT NULL,
             is_group INTEGER NOT NULL,
             last_activity INTEGER
         );
         CREATE TABLE participant (
             conversation_id TEXT NOT NULL REFERENCES conversation(identifier),
             handle TEXT NOT NULL,
             display_name TEXT
         );
         CREATE TABLE message (
             guid TEXT PRIMARY KEY,
             conversation_id TEXT NOT NULL REFERENCES conversation(identifier),
             date INTEGER NOT NULL,
             date_iso TEXT NOT NULL,
             is_from_me INTEGER NOT NULL,
             sender TEXT,
             text TEXT NOT NULL
         );
         CREATE TABLE attachment (
             message_guid TEXT NOT NULL REFERENCES message(guid),
             conversation_id TEXT NOT NULL REFERENCES conversation(identifier),
             filename TEXT,
             mime_type TEXT,
             transfer_name TEXT
         );",
    )
    .map_err(|e| MxError::WriteFailed(e.to_string()))?;

    let conversation = &bundle.conversation;
    tx.execute(
        "INSERT INTO conversation (identifier, title, is_group, last_activity)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            conversation.identifier,
            conversation.title,
            conversation.is_group as i64,
            conversation.last_activity,
        ],
    )
    .map_err(|e| MxError::WriteFailed(e.to_string()))?;

    for (index, handle) in conversation.participant_handles.iter().enumerate() {
        tx.execute(
            "INSERT INTO participant (conversation_id, handle, display_name)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                conversation.identifier,
                handle,
                conversation.participant_display_names.get(index),
            ],
        )
        .map_err(|e| MxError::WriteFailed(e.to_string()))?;
    }

    for message in &bundle.messages {
        tx.execute(
            "INSERT INTO message (guid, conversation_id, date, date_iso, is_from_me, sender, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                message.guid,
                conversation.identifier,
                message.date,
                message.iso_timestamp(),
                message.is_from_me as i64,
                message.sender,
                message.rendered_text(),
            ],
        )
        .map_err(|e| MxError::WriteFailed(e.to_string()))?;

        for attachment in &message.attachments {
            tx.execute(
                "INSERT INTO attachment
                     (message_guid, conversation_id, filename, mime_type, transfer_name)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.guid,
                    conversation.identifier,
                    attachment.filename,
                    attachment.mime_type,
                    attachment.transfer_name,
                ],
            )
            .map_err(|e| MxError::WriteFailed(e.to_string()))?;
        }
    }

    tx.commit().map_err(|e| MxError::WriteFailed(e.to_string()))?;
    Ok(())
}
