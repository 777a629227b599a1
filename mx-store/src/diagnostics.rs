//! Access diagnostics.
//!
//! Records the outcome of every load attempt so the user can see why
//! the tool cannot read their database without digging through logs.
//! The rendered report is redacted: the home directory is replaced and
//! no message content or contact handles are ever recorded.

use mx_core::{DiagnosticCategory, MxError};

use crate::probe::SchemaProbeResult;

/// Snapshot of the most recent load attempt.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticsStore {
    /// Source path and whether opening it succeeded.
    pub file_access: Option<(String, bool)>,
    /// Whether the probe accepted the schema, plus its missing list.
    pub schema_supported: Option<bool>,
    pub schema_missing: Vec<String>,
    /// Row counts from the last successful load.
    pub chat_count: Option<i64>,
    pub message_count: Option<i64>,
    /// Category of the last error, if any.
    pub last_error: Option<DiagnosticCategory>,
}

impl DiagnosticsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attempt to open `path`.
    pub fn record_file_access(&mut self, path: &str, opened: bool) {
        self.file_access = Some((path.to_string(), opened));
        if opened {
            self.last_error = None;
        }
    }

    /// Record the schema probe outcome.
    pub fn record_schema(&mut self, result: &SchemaProbeResult) {
        self.schema_supported = Some(result.is_supported());
        self.schema_missing = result.missing_required.clone();
    }

    /// Record row counts from a successful load.
    pub fn record_counts(&mut self, chats: i64, messages: i64) {
        self.chat_count = Some(chats);
        self.message_count = Some(messages);
    }

    /// Record a failed operation by category.
    pub fn record_error(&mut self, err: &MxError) {
        self.last_error = Some(DiagnosticCategory::from_error(err));
    }

    /// Render a redacted plain-text report.
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        match &self.file_access {
            Some((path, opened)) => {
                let shown = redact_home(path);
                lines.push(format!("database: {shown}"));
                lines.push(format!("opened: {}", if *opened { "yes" } else { "no" }));
            }
            None => lines.push("database: not attempted".to_string()),
        }

        match self.schema_supported {
            Some(true) => lines.push("schema: supported".to_string()),
            Some(false) => lines.push(format!(
                "schema: unsupported (missing: {})",
                self.schema_missing.join(", ")
            )),
            None => lines.push("schema: not probed".to_string()),
        }

        if let (Some(chats), Some(messages)) = (self.chat_count, self.message_count) {
            lines.push(format!("chats: {chats}"));
            lines.push(format!("messages: {messages}"));
        }

        if let Some(category) = self.last_error {
            lines.push(format!("last error: {}", category.name()));
        }

        lines.join("\n")
    }
}

/// Replace the user's home directory prefix with `~`.
fn redact_home(path: &str) -> String {
    if let Some(home) = dirs_home() {
        if let Some(rest) = path.strip_prefix(&home) {
            return format!("~{rest}");
        }
    }
    path.to_string()
}

fn dirs_home() -> Option<String> {
    std::env::var("HOME").ok().filter(|h| !h.is_empty())
}
