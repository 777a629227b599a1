//! Message model.

use serde::{Deserialize, Serialize};

use crate::decoder;
use crate::models::AttachmentMetadata;
use crate::timestamp;

/// One message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageItem {
    /// Message row id.
    pub row_id: i64,
    /// Message guid (or the row id as text on older schemas).
    pub guid: String,
    /// Identifier of the owning conversation.
    pub conversation_id: String,
    /// Raw timestamp from the source database.
    pub date: i64,
    /// True when the message was sent by the local user.
    pub is_from_me: bool,
    /// Sender handle. Absent with the outbound flag set means
    /// self-authored.
    pub sender: Option<String>,
    /// Plain text body, when the schema recorded one.
    pub text: Option<String>,
    /// Opaque rich-text payload, base64-carried.
    pub attributed_body: Option<String>,
    /// Attachment metadata.
    pub attachments: Vec<AttachmentMetadata>,
}

impl MessageItem {
    /// Best recoverable text, or `None` when no text exists.
    pub fn decoded_text(&self) -> Option<String> {
        decoder::decode_message_text(self.text.as_deref(), self.attributed_body.as_deref())
    }

    /// Text to render at export time. Never empty: a message with no
    /// usable text falls back to "[Attachment]" when attachments
    /// exist, else "[No text body]".
    pub fn rendered_text(&self) -> String {
        match self.decoded_text() {
            Some(text) => text,
            None if !self.attachments.is_empty() => "[Attachment]".to_string(),
            None => "[No text body]".to_string(),
        }
    }

    /// Label identifying the sender for text export.
    pub fn sender_label(&self) -> String {
        match (&self.sender, self.is_from_me) {
            (None, true) => "Me".to_string(),
            (Some(handle), _) => handle.clone(),
            (None, false) => "Unknown".to_string(),
        }
    }

    /// ISO-8601 rendering of the message timestamp.
    pub fn iso_timestamp(&self) -> String {
        timestamp::format_iso8601(self.date)
    }
}
