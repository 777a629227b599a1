//! Conversation summary model.

use serde::{Deserialize, Serialize};

use crate::query::SelectionKey;

/// Overview of one conversation as shown in listings and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Stable external identifier (guid when the schema has one, else
    /// the row id rendered as text).
    pub identifier: String,
    /// Numeric row reference for precise re-querying, when known.
    pub row_id: Option<i64>,
    /// Display title. Never empty; see [`derive_title`].
    pub title: String,
    /// Participant handles in join order.
    pub participant_handles: Vec<String>,
    /// Resolved display names. Either empty or exactly as long as
    /// `participant_handles`, index-aligned.
    pub participant_display_names: Vec<String>,
    /// Snippet of the most recent message, when one exists.
    pub preview: Option<String>,
    /// Raw timestamp of the most recent message.
    pub last_activity: Option<i64>,
    /// Whether this is a group conversation.
    pub is_group: bool,
}

impl ConversationSummary {
    /// Key used to re-query this conversation. The row reference is
    /// preferred because guids are not guaranteed unique.
    pub fn selection_key(&self) -> SelectionKey {
        match self.row_id {
            Some(id) => SelectionKey::RowId(id),
            None => SelectionKey::Guid(self.identifier.clone()),
        }
    }

    /// Display name for participant `index`, falling back to the raw
    /// handle when no resolved name is available.
    pub fn display_name_at(&self, index: usize) -> Option<&str> {
        let resolved = self
            .participant_display_names
            .get(index)
            .map(String::as_str)
            .filter(|name| !name.is_empty());
        resolved.or_else(|| self.participant_handles.get(index).map(String::as_str))
    }
}

/// Derive a non-empty conversation title.
///
/// A recorded title wins; otherwise the participants name the chat:
/// the single participant's display name, or the first three names
/// joined for a group. A chat with no title and no participants is
/// just "Conversation".
pub fn derive_title(raw_title: &str, handles: &[String], display_names: &[String]) -> String {
    let trimmed = raw_title.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    if handles.is_empty() {
        return "Conversation".to_string();
    }

    let name_at = |i: usize| -> &str {
        display_names
            .get(i)
            .map(String::as_str)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| handles[i].as_str())
    };

    if handles.len() == 1 {
        return name_at(0).to_string();
    }

    let names: Vec<&str> = (0..handles.len().min(3)).map(name_at).collect();
    names.join(", ")
}
