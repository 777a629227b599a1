//! msgexport store - read side of the export pipeline.
//!
//! Opens the source messages database read-only, probes its schema,
//! generates schema-conditioned SQL, assembles conversation and
//! message entities, and recovers text from binary rich-text payloads.

pub mod decoder;
pub mod diagnostics;
pub mod engine;
pub mod models;
pub mod probe;
pub mod query;
pub mod resolver;
pub mod store;
pub mod timestamp;
pub mod value;

pub use diagnostics::DiagnosticsStore;
pub use engine::ReadOnlyDb;
pub use models::{AttachmentMetadata, ConversationSummary, MessageItem};
pub use probe::{probe, SchemaProbeResult};
pub use query::SelectionKey;
pub use resolver::{ContactRecord, ContactResolver, ContactSource};
pub use store::{CancelToken, ConversationPage, MessageStore};
pub use value::{Row, SqlValue};
