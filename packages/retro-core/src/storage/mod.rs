pub mod local;
pub mod remote;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RetroConfig;
use crate::listeners::{Listener, Subscription};
use crate::session::BoardMode;
use crate::types::{ActionItem, Board, Column, Note};

/// Storage contract shared by the local and remote board backends.
///
/// Mutations never return errors: failures of the underlying medium are
/// logged and leave the board unchanged. Not-found ids are no-ops.
#[async_trait]
pub trait BoardStore<C: Column>: Send + Sync {
    /// Register a listener that receives the board on every change. The
    /// current board is delivered once right away when the store has one.
    fn subscribe(&self, listener: Listener<C>) -> Subscription<C>;

    /// Point-in-time read of the board.
    async fn snapshot(&self) -> Board<C>;

    /// Replace the note with the same id in `column`, or append it.
    async fn upsert_note(&self, column: C, note: Note<C>);

    /// Remove the note with `note_id` from whichever column holds it.
    async fn delete_note(&self, note_id: &str);

    async fn upsert_action_item(&self, item: ActionItem);

    async fn delete_action_item(&self, item_id: &str);

    /// Overwrite the sprint label and date only.
    async fn set_sprint_info(&self, label: &str, date: &str);

    /// Empty every column and the action items.
    async fn clear_board(&self);

    /// Release timers, watchers and network subscriptions. Safe to call more than once.
    fn dispose(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid board document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Remote database error: {0}")]
    Remote(String),

    #[error("Remote database rejected {path}: HTTP {status}")]
    Rejected { path: String, status: u16 },

    #[error("Invalid session code: {0:?}")]
    InvalidSession(String),

    #[error("No relay URL configured for session {0}")]
    RelayNotConfigured(String),

    #[error("Board stores must be opened inside a tokio runtime")]
    NoRuntime,

    #[cfg(feature = "file-watcher")]
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl StoreError {
    pub fn remote(message: impl std::fmt::Display) -> Self {
        Self::Remote(message.to_string())
    }
}

/// Open the store selected by `mode`: the local document for local mode, or
/// the relay-backed session document for remote mode.
///
/// Must be called from within a tokio runtime.
pub async fn open_board_store<C: Column>(
    config: &RetroConfig,
    mode: BoardMode,
) -> Result<Arc<dyn BoardStore<C>>, StoreError> {
    match mode {
        BoardMode::Local => {
            let store = local::LocalBoardStore::<C>::open(&config.local_options())?;
            Ok(Arc::new(store))
        }
        BoardMode::Remote(session) => open_remote(config, session).await,
    }
}

#[cfg(feature = "relay")]
async fn open_remote<C: Column>(
    config: &RetroConfig,
    session: crate::session::SessionCode,
) -> Result<Arc<dyn BoardStore<C>>, StoreError> {
    let relay_url = config
        .relay_url
        .as_deref()
        .ok_or_else(|| StoreError::RelayNotConfigured(session.to_string()))?;
    let db = Arc::new(crate::remote::relay::RelayDatabase::new(relay_url));
    let store =
        remote::RemoteBoardStore::<C>::connect(db, Some(session), &config.share_base_url).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "relay"))]
async fn open_remote<C: Column>(
    _config: &RetroConfig,
    session: crate::session::SessionCode,
) -> Result<Arc<dyn BoardStore<C>>, StoreError> {
    Err(StoreError::RelayNotConfigured(session.to_string()))
}
