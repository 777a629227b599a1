//! msgexport core - foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by the other msgexport crates:
//! - Application configuration (source database path, export defaults)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform path resolution (data dir, default chat.db location)
//! - Common constants

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{DiagnosticCategory, MxError, MxResult};
pub use logging::init_logging;
pub use platform::Platform;
