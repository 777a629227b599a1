//! msgexport export - write side of the export pipeline.
//!
//! Takes assembled conversations and writes them to plain text, JSON,
//! a fresh relational SQLite database, or an authenticated-encrypted
//! container.

pub mod bundle;
pub mod package;
pub mod writer;

pub use bundle::{ExportBundle, ExportFormat};
pub use writer::export;
