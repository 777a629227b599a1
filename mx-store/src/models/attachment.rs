//! Attachment metadata model.

use serde::{Deserialize, Serialize};

/// Metadata describing one message attachment.
///
/// Every field is optional because older schemas omit some columns;
/// absence is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    /// On-disk filename, when recorded.
    pub filename: Option<String>,
    /// MIME type, when recorded.
    pub mime_type: Option<String>,
    /// Name used during transfer, when recorded.
    pub transfer_name: Option<String>,
}

impl AttachmentMetadata {
    /// Best human-readable label for the attachment.
    pub fn display_name(&self) -> &str {
        self.transfer_name
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or("attachment")
    }
}
