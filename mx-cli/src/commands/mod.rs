//! CLI command implementations.

pub mod chats;
pub mod decrypt;
pub mod diagnose;
pub mod export;
pub mod schema;

use std::path::PathBuf;

use mx_core::config::AppConfig;
use mx_core::error::MxResult;
use mx_core::MxError;
use mx_store::{ConversationSummary, MessageStore, SelectionKey};

/// Resolve the source database path: CLI flag, then config, then the
/// platform default.
pub fn resolve_db_path(config: &AppConfig, cli_override: Option<&str>) -> MxResult<PathBuf> {
    match cli_override {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => config.effective_db_path(),
    }
}

/// Build a store over the source database using configured limits.
pub fn open_store(config: &AppConfig, db_path: &std::path::Path) -> MessageStore {
    MessageStore::new(db_path).with_limits(
        config.export.page_size as i64,
        config.export.message_limit as i64,
    )
}

/// Scan pages until the requested conversation is found.
pub async fn find_conversation(
    store: &MessageStore,
    key: &SelectionKey,
) -> MxResult<ConversationSummary> {
    let mut page_index = 0;
    loop {
        let page = store.load_page(page_index).await?;
        if page.conversations.is_empty() {
            return Err(MxError::Internal(format!(
                "conversation not found: {key:?}"
            )));
        }
        for conversation in page.conversations {
            let matches = match key {
                SelectionKey::RowId(id) => conversation.row_id == Some(*id),
                SelectionKey::Guid(guid) => conversation.identifier == *guid,
            };
            if matches {
                return Ok(conversation);
            }
        }
        page_index += 1;
    }
}

/// Truncate a string to a maximum length, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}
