//! Global error types for msgexport.
//!
//! All error categories across the workspace are unified into a single
//! `MxError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using MxError.
pub type MxResult<T> = Result<T, MxError>;

/// Unified error type covering all error categories in msgexport.
#[derive(Error, Debug)]
pub enum MxError {
    // -- Source database errors --
    /// The source database file does not exist.
    #[error("messages database file is missing")]
    FileMissing,

    /// SQLite refused to open the source database. On macOS this is most
    /// often a missing Full Disk Access grant, but the engine cannot tell
    /// a permission failure from other open failures at this layer.
    #[error("sqlite open failed ({code}): {message}")]
    OpenFailed {
        /// SQLite extended result code.
        code: i32,
        /// Diagnostic text from the engine.
        message: String,
    },

    /// SQL statement preparation failed (malformed or unexpected SQL).
    #[error("sqlite prepare failed: {0}")]
    PrepareFailed(String),

    /// SQL statement execution failed mid-stream.
    #[error("sqlite step failed: {0}")]
    StepFailed(String),

    /// The schema probe found required tables/columns absent. This is an
    /// expected, user-facing condition, not an internal failure.
    #[error("unsupported messages database schema, missing: {}", .0.join(", "))]
    UnsupportedSchema(Vec<String>),

    // -- Export errors --
    /// A passphrase is required for encrypted export.
    #[error("passphrase is required for encrypted export")]
    PassphraseMissing,

    /// Destination already exists or its parent directory is missing.
    #[error("invalid destination or file already exists")]
    InvalidDestination,

    /// Writing the export file failed.
    #[error("failed to write export file: {0}")]
    WriteFailed(String),

    // -- Crypto errors --
    /// Authenticated decryption failed (wrong passphrase or tampered data).
    #[error("decryption failed: authentication error")]
    Authentication,

    /// Encryption/key-derivation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    // -- Control flow --
    /// An in-flight load was cancelled by a newer request. Not a failure;
    /// callers must swallow this instead of surfacing it to the user.
    #[error("operation cancelled")]
    Cancelled,

    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for MxError {
    fn from(e: serde_json::Error) -> Self {
        MxError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for MxError {
    fn from(e: toml::de::Error) -> Self {
        MxError::Config(e.to_string())
    }
}

/// Coarse error categories reported to the diagnostics sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCategory {
    /// Likely missing read permission (e.g. no Full Disk Access).
    Permission,
    /// The source database file is absent.
    MissingFile,
    /// The schema probe rejected the database.
    SchemaMismatch,
    /// Anything else.
    Unknown,
}

impl DiagnosticCategory {
    /// Map an error to its diagnostics category.
    ///
    /// `OpenFailed` is treated as permission-related: the SQLite layer cannot
    /// distinguish an access-control refusal from other open failures, and on
    /// the platforms this tool targets a refused open of an existing file is
    /// almost always a sandbox/permission issue.
    pub fn from_error(err: &MxError) -> Self {
        match err {
            MxError::FileMissing => Self::MissingFile,
            MxError::OpenFailed { .. } => Self::Permission,
            MxError::UnsupportedSchema(_) => Self::SchemaMismatch,
            _ => Self::Unknown,
        }
    }

    /// Stable lowercase name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Permission => "permission",
            Self::MissingFile => "missingFile",
            Self::SchemaMismatch => "schemaMismatch",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
