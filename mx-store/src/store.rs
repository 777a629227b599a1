//! Paginated conversation loading.
//!
//! All database reads run on a blocking worker off the caller's task.
//! One load is in flight at a time per store: starting a new page load
//! cancels the previous one (last-request-wins). Cancellation is
//! cooperative and surfaces as [`MxError::Cancelled`], which callers
//! drop silently instead of reporting as a failure.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use mx_core::constants::{tables, CONVERSATION_PAGE_SIZE, MESSAGE_FETCH_LIMIT};
use mx_core::{MxError, MxResult};

use crate::diagnostics::DiagnosticsStore;
use crate::engine::ReadOnlyDb;
use crate::models::{AttachmentMetadata, ConversationSummary, MessageItem};
use crate::models::conversation::derive_title;
use crate::probe::{probe, SchemaProbeResult};
use crate::query::{self, SelectionKey};
use crate::value::{row_blob, row_i64, row_text, Row};

/// Opaque handle-to-name lookup injected by the caller.
pub type ResolveFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Cooperative cancellation token for one in-flight load.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One page of conversation summaries plus dataset totals.
#[derive(Debug, Clone)]
pub struct ConversationPage {
    pub conversations: Vec<ConversationSummary>,
    pub total_chats: i64,
    pub total_messages: i64,
    pub page_index: i64,
}

/// Paginated reader over the source database.
pub struct MessageStore {
    db_path: PathBuf,
    page_size: i64,
    message_limit: i64,
    resolve: Option<ResolveFn>,
    diagnostics: Arc<Mutex<DiagnosticsStore>>,
    in_flight: Mutex<Option<CancelToken>>,
}

impl MessageStore {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
            page_size: CONVERSATION_PAGE_SIZE,
            message_limit: MESSAGE_FETCH_LIMIT,
            resolve: None,
            diagnostics: Arc::new(Mutex::new(DiagnosticsStore::new())),
            in_flight: Mutex::new(None),
        }
    }

    /// Override page size and per-conversation message cap.
    pub fn with_limits(mut self, page_size: i64, message_limit: i64) -> Self {
        self.page_size = page_size;
        self.message_limit = message_limit;
        self
    }

    /// Inject a handle-to-name lookup for participant display names.
    pub fn with_resolver(mut self, resolve: ResolveFn) -> Self {
        self.resolve = Some(resolve);
        self
    }

    /// Redacted diagnostics report for the last load attempt.
    pub fn diagnostics_report(&self) -> String {
        self.lock_diagnostics().report()
    }

    fn lock_diagnostics(&self) -> std::sync::MutexGuard<'_, DiagnosticsStore> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Load one page of conversation summaries.
    ///
    /// Cancels any prior in-flight load for this store first.
    pub async fn load_page(&self, page_index: i64) -> MxResult<ConversationPage> {
        let token = self.begin_load();

        let db_path = self.db_path.clone();
        let page_size = self.page_size;
        let resolve = self.resolve.clone();
        let worker_token = token.clone();

        let result = tokio::task::spawn_blocking(move || {
            load_page_blocking(&db_path, page_size, page_index, resolve, &worker_token)
        })
        .await
        .map_err(|e| MxError::Internal(format!("load task panicked: {e}")))?;

        self.finish(result, &token)
    }

    /// Load the full message list of one conversation, with
    /// attachments, capped at the store's message limit.
    pub async fn load_messages(
        &self,
        conversation_id: &str,
        key: SelectionKey,
    ) -> MxResult<Vec<MessageItem>> {
        let token = self.begin_load();

        let db_path = self.db_path.clone();
        let limit = self.message_limit;
        let conversation_id = conversation_id.to_string();
        let worker_token = token.clone();

        let result = tokio::task::spawn_blocking(move || {
            load_messages_blocking(&db_path, &conversation_id, &key, limit, &worker_token)
        })
        .await
        .map_err(|e| MxError::Internal(format!("load task panicked: {e}")))?;

        self.finish(result, &token)
    }

    /// Cancel any prior load and register a fresh token.
    fn begin_load(&self) -> CancelToken {
        let token = CancelToken::new();
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = in_flight.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Commit a load outcome: refuse cancelled results and keep the
    /// diagnostics store current.
    fn finish<T>(&self, result: MxResult<LoadOutcome<T>>, token: &CancelToken) -> MxResult<T> {
        if token.is_cancelled() {
            return Err(MxError::Cancelled);
        }
        let mut diagnostics = self.lock_diagnostics();
        match result {
            Ok(outcome) => {
                outcome.apply(&mut diagnostics);
                Ok(outcome.value)
            }
            Err(err) => {
                if matches!(err, MxError::FileMissing | MxError::OpenFailed { .. }) {
                    diagnostics.record_file_access(&self.db_path.display().to_string(), false);
                }
                if !matches!(err, MxError::Cancelled) {
                    diagnostics.record_error(&err);
                }
                Err(err)
            }
        }
    }
}

/// Load result plus the diagnostics facts gathered along the way.
#[derive(Debug)]
struct LoadOutcome<T> {
    value: T,
    opened_path: String,
    schema: SchemaProbeResult,
    counts: Option<(i64, i64)>,
}

impl<T> LoadOutcome<T> {
    fn apply(&self, diagnostics: &mut DiagnosticsStore) {
        diagnostics.record_file_access(&self.opened_path, true);
        diagnostics.record_schema(&self.schema);
        if let Some((chats, messages)) = self.counts {
            diagnostics.record_counts(chats, messages);
        }
    }
}

/// Open, probe, and verify the database. Shared by both load paths.
fn open_supported(db_path: &Path) -> MxResult<(ReadOnlyDb, SchemaProbeResult)> {
    let db = ReadOnlyDb::open(db_path)?;
    let schema = probe(&db)?;
    if !schema.is_supported() {
        return Err(MxError::UnsupportedSchema(schema.missing_required.clone()));
    }
    Ok((db, schema))
}

fn check_cancelled(token: &CancelToken) -> MxResult<()> {
    if token.is_cancelled() {
        Err(MxError::Cancelled)
    } else {
        Ok(())
    }
}

fn load_page_blocking(
    db_path: &Path,
    page_size: i64,
    page_index: i64,
    resolve: Option<ResolveFn>,
    token: &CancelToken,
) -> MxResult<LoadOutcome<ConversationPage>> {
    check_cancelled(token)?;
    let (db, schema) = open_supported(db_path)?;

    let offset = page_index * page_size;
    let sql = query::conversation_page_query(&schema, page_size, offset);
    let rows = db.query_rows(&sql)?;
    check_cancelled(token)?;

    let mut conversations = Vec::with_capacity(rows.len());
    for row in &rows {
        conversations.push(assemble_summary(&db, &schema, row, resolve.as_ref())?);
    }

    let total_chats = match query::count_query(&schema, tables::CHAT) {
        Some(sql) => db.query_scalar_i64(&sql)?,
        None => 0,
    };
    let total_messages = match query::count_query(&schema, tables::MESSAGE) {
        Some(sql) => db.query_scalar_i64(&sql)?,
        None => 0,
    };
    check_cancelled(token)?;

    tracing::info!(
        page = page_index,
        loaded = conversations.len(),
        total_chats,
        total_messages,
        "conversation page loaded"
    );

    Ok(LoadOutcome {
        value: ConversationPage {
            conversations,
            total_chats,
            total_messages,
            page_index,
        },
        opened_path: db_path.display().to_string(),
        schema,
        counts: Some((total_chats, total_messages)),
    })
}

fn assemble_summary(
    db: &ReadOnlyDb,
    schema: &SchemaProbeResult,
    row: &Row,
    resolve: Option<&ResolveFn>,
) -> MxResult<ConversationSummary> {
    let row_id = row_i64(row, "rowid");
    let identifier = row_text(row, "identifier")
        .or_else(|| row_id.map(|id| id.to_string()))
        .unwrap_or_default();
    let raw_title = row_text(row, "title").unwrap_or_default();
    let preview = row_text(row, "preview").filter(|p| !p.is_empty());
    let last_activity = row_i64(row, "last_date").filter(|d| *d != 0);
    let is_group = row_i64(row, "is_group").unwrap_or(0) != 0;

    let key = match row_id {
        Some(id) => SelectionKey::RowId(id),
        None => SelectionKey::Guid(identifier.clone()),
    };
    let participant_handles = match query::participants_query(schema, &key) {
        Some(sql) => db
            .query_rows(&sql)?
            .iter()
            .filter_map(|r| row_text(r, "handle"))
            .collect(),
        None => Vec::new(),
    };

    let participant_display_names: Vec<String> = match resolve {
        Some(resolve) => participant_handles.iter().map(|h| resolve(h)).collect(),
        None => Vec::new(),
    };

    let title = derive_title(&raw_title, &participant_handles, &participant_display_names);

    Ok(ConversationSummary {
        identifier,
        row_id,
        title,
        participant_handles,
        participant_display_names,
        preview,
        last_activity,
        is_group,
    })
}

fn load_messages_blocking(
    db_path: &Path,
    conversation_id: &str,
    key: &SelectionKey,
    limit: i64,
    token: &CancelToken,
) -> MxResult<LoadOutcome<Vec<MessageItem>>> {
    check_cancelled(token)?;
    let (db, schema) = open_supported(db_path)?;

    let sql = query::messages_query(&schema, key, limit);
    let rows = db.query_rows(&sql)?;
    check_cancelled(token)?;

    let mut messages = Vec::with_capacity(rows.len());
    for row in &rows {
        let row_id = row_i64(row, "rowid").unwrap_or(0);

        let attachments = match query::attachments_query(&schema, row_id) {
            Some(sql) => db
                .query_rows(&sql)?
                .iter()
                .map(|r| AttachmentMetadata {
                    filename: row_text(r, "filename"),
                    mime_type: row_text(r, "mime_type"),
                    transfer_name: row_text(r, "transfer_name"),
                })
                .collect(),
            None => Vec::new(),
        };

        messages.push(MessageItem {
            row_id,
            guid: row_text(row, "guid").unwrap_or_else(|| row_id.to_string()),
            conversation_id: conversation_id.to_string(),
            date: row_i64(row, "date").unwrap_or(0),
            is_from_me: row_i64(row, "is_from_me").unwrap_or(0) != 0,
            sender: row_text(row, "sender"),
            text: row_text(row, "text"),
            attributed_body: row_blob(row, "attributed_body").map(|b| BASE64.encode(b)),
            attachments,
        });
    }
    check_cancelled(token)?;

    tracing::info!(
        conversation = conversation_id,
        loaded = messages.len(),
        "messages loaded"
    );

    Ok(LoadOutcome {
        value: messages,
        opened_path: db_path.display().to_string(),
        schema,
        counts: None,
    })
}
