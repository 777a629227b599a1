//! Entity models assembled from query rows.

pub mod attachment;
pub mod conversation;
pub mod message;

pub use attachment::AttachmentMetadata;
pub use conversation::ConversationSummary;
pub use message::MessageItem;
