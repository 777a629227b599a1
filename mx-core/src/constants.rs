//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "msgexport";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of conversations fetched per page.
pub const CONVERSATION_PAGE_SIZE: i64 = 100;

/// Hard cap on messages fetched per conversation in one export.
pub const MESSAGE_FETCH_LIMIT: i64 = 10_000;

/// Seconds between the Unix epoch and the Apple reference date (2001-01-01).
pub const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Chat style constants from the source schema.
pub mod chat_style {
    /// Group chat style identifier.
    pub const GROUP: i64 = 45;
}

/// Source schema table names the probe inspects.
pub mod tables {
    pub const CHAT: &str = "chat";
    pub const MESSAGE: &str = "message";
    pub const HANDLE: &str = "handle";
    pub const CHAT_HANDLE_JOIN: &str = "chat_handle_join";
    pub const CHAT_MESSAGE_JOIN: &str = "chat_message_join";
    pub const ATTACHMENT: &str = "attachment";
    pub const MESSAGE_ATTACHMENT_JOIN: &str = "message_attachment_join";
}
