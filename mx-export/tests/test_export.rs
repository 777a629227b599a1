//! Integration tests for the export writers.

use std::path::Path;

use mx_core::MxError;
use mx_export::{export, ExportBundle, ExportFormat};
use mx_store::{AttachmentMetadata, ConversationSummary, MessageItem};

fn sample_bundle() -> ExportBundle {
    let conversation = ConversationSummary {
        identifier: "chat-guid-1".into(),
        row_id: Some(1),
        title: "Alice Smith".into(),
        participant_handles: vec!["+15551234567".into()],
        participant_display_names: vec!["Alice Smith".into()],
        preview: Some("See you soon".into()),
        last_activity: Some(631_152_000),
        is_group: false,
    };

    let messages = vec![
        MessageItem {
            row_id: 10,
            guid: "msg-1".into(),
            conversation_id: "chat-guid-1".into(),
            date: 631_152_000,
            is_from_me: false,
            sender: Some("+15551234567".into()),
            text: Some("Are we still on for tonight?".into()),
            attributed_body: None,
            attachments: vec![],
        },
        MessageItem {
            row_id: 11,
            guid: "msg-2".into(),
            conversation_id: "chat-guid-1".into(),
            date: 631_152_060,
            is_from_me: true,
            sender: None,
            text: Some("Yes, see you at 7.".into()),
            attributed_body: None,
            attachments: vec![AttachmentMetadata {
                filename: Some("IMG_0001.heic".into()),
                mime_type: Some("image/heic".into()),
                transfer_name: Some("photo.heic".into()),
            }],
        },
        MessageItem {
            row_id: 12,
            guid: "msg-3".into(),
            conversation_id: "chat-guid-1".into(),
            date: 631_152_120,
            is_from_me: false,
            sender: Some("+15551234567".into()),
            text: None,
            attributed_body: None,
            attachments: vec![
                AttachmentMetadata {
                    filename: Some("a.png".into()),
                    mime_type: Some("image/png".into()),
                    transfer_name: None,
                },
                AttachmentMetadata {
                    filename: None,
                    mime_type: None,
                    transfer_name: Some("b.mov".into()),
                },
            ],
        },
    ];

    ExportBundle::new(conversation, messages)
}

#[test]
fn test_text_export_line_format() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");

    export(&sample_bundle(), ExportFormat::Text, &dest, None).unwrap();

    let content = std::fs::read_to_string(&dest).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "[2021-01-01T00:00:00+00:00] +15551234567: Are we still on for tonight?"
    );
    assert_eq!(lines[1], "[2021-01-01T00:01:00+00:00] Me: Yes, see you at 7.");
    // No text and attachments present: placeholder.
    assert!(lines[2].ends_with("+15551234567: [Attachment]"));
}

#[test]
fn test_json_export_structure() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.json");

    export(&sample_bundle(), ExportFormat::Json, &dest, None).unwrap();

    let content = std::fs::read_to_string(&dest).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(value["conversation"]["identifier"], "chat-guid-1");
    assert_eq!(value["messages"].as_array().unwrap().len(), 3);
    assert_eq!(value["messages"][1]["is_from_me"], true);
}

#[test]
fn test_never_overwrites_existing_destination() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.json");
    std::fs::write(&dest, b"precious").unwrap();

    for format in [
        ExportFormat::Text,
        ExportFormat::Json,
        ExportFormat::Sqlite,
        ExportFormat::Encrypted,
    ] {
        let err = export(&sample_bundle(), format, &dest, Some("pw")).unwrap_err();
        assert!(matches!(err, MxError::InvalidDestination));
    }
    assert_eq!(std::fs::read(&dest).unwrap(), b"precious");
}

#[test]
fn test_missing_parent_directory_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("no_such_dir").join("out.txt");

    let err = export(&sample_bundle(), ExportFormat::Text, &dest, None).unwrap_err();
    assert!(matches!(err, MxError::InvalidDestination));
}

#[test]
fn test_sqlite_export_row_counts() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.sqlite");
    let bundle = sample_bundle();

    export(&bundle, ExportFormat::Sqlite, &dest, None).unwrap();

    let conn = rusqlite::Connection::open(&dest).unwrap();
    let messages: i64 = conn
        .query_row("SELECT COUNT(*) FROM message", [], |r| r.get(0))
        .unwrap();
    let attachments: i64 = conn
        .query_row("SELECT COUNT(*) FROM attachment", [], |r| r.get(0))
        .unwrap();
    assert_eq!(messages, bundle.messages.len() as i64);
    assert_eq!(attachments, 3);

    let distinct_conversations: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM (
                 SELECT conversation_id FROM message
                 UNION SELECT conversation_id FROM attachment
             )",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(distinct_conversations, 1);
}

#[test]
fn test_encrypted_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.imexport");
    let bundle = sample_bundle();

    export(&bundle, ExportFormat::Encrypted, &dest, Some("hunter2!")).unwrap();

    let container = std::fs::read(&dest).unwrap();
    assert!(container.starts_with(b"IMEXPORT1"));

    let plaintext = mx_export::package::decrypt(&container, "hunter2!").unwrap();
    let value: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
    assert_eq!(value["conversation"]["identifier"], "chat-guid-1");
}

#[test]
fn test_encrypted_export_requires_passphrase() {
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.imexport");

    let err = export(&sample_bundle(), ExportFormat::Encrypted, &dest, None).unwrap_err();
    assert!(matches!(err, MxError::PassphraseMissing));
    assert!(!dest.exists());

    let err = export(&sample_bundle(), ExportFormat::Encrypted, &dest, Some("")).unwrap_err();
    assert!(matches!(err, MxError::PassphraseMissing));
    assert!(!dest.exists());
}

#[cfg(unix)]
#[test]
fn test_owner_only_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.txt");

    export(&sample_bundle(), ExportFormat::Text, &dest, None).unwrap();

    let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
