//! Export bundle: the structure every writer serializes.

use serde::{Deserialize, Serialize};

use mx_core::MxError;
use mx_store::{ConversationSummary, MessageItem};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Json,
    Sqlite,
    Encrypted,
}

impl ExportFormat {
    /// Conventional file extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Sqlite => "sqlite",
            ExportFormat::Encrypted => "imexport",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = MxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "sqlite" | "db" => Ok(ExportFormat::Sqlite),
            "encrypted" => Ok(ExportFormat::Encrypted),
            other => Err(MxError::Config(format!("unknown export format: {other}"))),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Text => "text",
            ExportFormat::Json => "json",
            ExportFormat::Sqlite => "sqlite",
            ExportFormat::Encrypted => "encrypted",
        };
        write!(f, "{name}")
    }
}

/// One conversation with its messages, ready to be written out.
///
/// Field order is the serialized key order, which keeps JSON output
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportBundle {
    pub tool_version: String,
    pub exported_at: String,
    pub conversation: ConversationSummary,
    pub messages: Vec<MessageItem>,
}

impl ExportBundle {
    pub fn new(conversation: ConversationSummary, messages: Vec<MessageItem>) -> Self {
        Self {
            tool_version: mx_core::constants::APP_VERSION.to_string(),
            exported_at: chrono::Utc::now().to_rfc3339(),
            conversation,
            messages,
        }
    }
}
