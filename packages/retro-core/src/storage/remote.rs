/// Remote board storage backend.
///
/// One board document per session, stored at `sessions/{code}` in a
/// `RealtimeDatabase`. A watch on that path pushes every change from any
/// participant to this store's listeners, including changes this store wrote.
///
/// Mutations are read-modify-write over the network with no transaction:
/// two writers racing on the same board silently overwrite each other
/// (last write wins).
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::{BoardStore, StoreError};
use crate::listeners::{Listener, ListenerSet, Subscription};
use crate::remote::{RealtimeDatabase, WatchReceiver};
use crate::session::SessionCode;
use crate::types::{ActionItem, Board, Column, Note};

const WATCH_RETRY_INITIAL: Duration = Duration::from_millis(250);
const WATCH_RETRY_MAX: Duration = Duration::from_secs(10);

struct RemoteSession<C: Column> {
    code: SessionCode,
    path: String,
    db: Arc<dyn RealtimeDatabase>,
    listeners: Arc<ListenerSet<C>>,
    /// Last board pushed by the database, handed to new subscribers.
    latest: RwLock<Option<Board<C>>>,
}

impl<C: Column> RemoteSession<C> {
    /// One-shot read. An absent or unparseable document yields the default
    /// board; transport failures are returned.
    async fn read(&self) -> Result<Board<C>, StoreError> {
        match self.db.get(&self.path).await? {
            Some(value) => Ok(serde_json::from_value(value).unwrap_or_else(|e| {
                log::warn!(
                    "[retro.storage.remote] Unreadable board in session {}, using default: {}",
                    self.code,
                    e
                );
                Board::for_today()
            })),
            None => Ok(Board::for_today()),
        }
    }

    async fn write(&self, board: &Board<C>) -> Result<(), StoreError> {
        let value = serde_json::to_value(board)?;
        self.db.set(&self.path, value).await
    }

    async fn mutate(&self, op: &str, apply: impl FnOnce(&mut Board<C>) + Send) {
        let mut board = match self.read().await {
            Ok(board) => board,
            Err(e) => {
                log::error!("[retro.storage.remote] {} failed to read session {}: {}", op, self.code, e);
                return;
            }
        };
        apply(&mut board);
        if let Err(e) = self.write(&board).await {
            log::error!("[retro.storage.remote] {} failed to write session {}: {}", op, self.code, e);
        }
    }

    /// Handle one value pushed by the database watch.
    async fn handle_push(&self, value: Option<serde_json::Value>) {
        match value {
            Some(value) => match serde_json::from_value::<Board<C>>(value) {
                Ok(board) => {
                    *self.latest.write().unwrap_or_else(PoisonError::into_inner) =
                        Some(board.clone());
                    self.listeners.notify(&board);
                }
                Err(e) => {
                    log::error!(
                        "[retro.storage.remote] Ignoring unreadable push for session {}: {}",
                        self.code,
                        e
                    );
                }
            },
            None => {
                log::info!(
                    "[retro.storage.remote] Session {} has no board, initializing",
                    self.code
                );
                if let Err(e) = self.write(&Board::for_today()).await {
                    log::error!(
                        "[retro.storage.remote] Failed to initialize session {}: {}",
                        self.code,
                        e
                    );
                }
            }
        }
    }
}

/// Board store backed by a session document in a real-time database.
pub struct RemoteBoardStore<C: Column> {
    session: Arc<RemoteSession<C>>,
    share_base_url: String,
    watch_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: Column> RemoteBoardStore<C> {
    /// Join `session` (or a freshly generated one), creating its board if the
    /// session does not exist yet, and start watching it.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn connect(
        db: Arc<dyn RealtimeDatabase>,
        session: Option<SessionCode>,
        share_base_url: &str,
    ) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        let code = session.unwrap_or_else(SessionCode::generate);
        let path = code.document_path();

        if db.get(&path).await?.is_none() {
            let value = serde_json::to_value(Board::<C>::for_today())?;
            db.set(&path, value).await?;
            log::info!("[retro.storage.remote] Created session {}", code);
        }

        let pushes = db.watch(&path).await?;
        let session = Arc::new(RemoteSession {
            code,
            path,
            db,
            listeners: Arc::new(ListenerSet::new()),
            latest: RwLock::new(None),
        });
        let watch_task = runtime.spawn(forward_pushes(session.clone(), pushes));

        log::info!("[retro.storage.remote] Joined session {}", session.code);

        Ok(Self {
            session,
            share_base_url: share_base_url.to_string(),
            watch_task: Mutex::new(Some(watch_task)),
        })
    }

    pub fn session_code(&self) -> &SessionCode {
        &self.session.code
    }

    /// Link other participants open to join this board.
    pub fn share_url(&self) -> String {
        self.session.code.share_url(&self.share_base_url)
    }
}

/// Feed pushes to the session until the store is disposed. A watch that ends
/// (relay restart, dropped connection) is re-established with backoff.
async fn forward_pushes<C: Column>(session: Arc<RemoteSession<C>>, mut pushes: WatchReceiver) {
    let mut delay = WATCH_RETRY_INITIAL;
    loop {
        let mut received = false;
        while let Some(value) = pushes.recv().await {
            received = true;
            session.handle_push(value).await;
        }
        if received {
            delay = WATCH_RETRY_INITIAL;
        }
        log::warn!(
            "[retro.storage.remote] Watch for session {} ended, resubscribing",
            session.code
        );

        pushes = loop {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(WATCH_RETRY_MAX);
            match session.db.watch(&session.path).await {
                Ok(rx) => break rx,
                Err(e) => log::warn!(
                    "[retro.storage.remote] Resubscribing to session {} failed: {}",
                    session.code,
                    e
                ),
            }
        };
    }
}

#[async_trait]
impl<C: Column> BoardStore<C> for RemoteBoardStore<C> {
    fn subscribe(&self, listener: Listener<C>) -> Subscription<C> {
        let id = self.session.listeners.add(listener.clone());
        let latest = self
            .session
            .latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(board) = latest {
            listener(&board);
        }
        Subscription::new(id, &self.session.listeners)
    }

    async fn snapshot(&self) -> Board<C> {
        self.session.read().await.unwrap_or_else(|e| {
            log::error!(
                "[retro.storage.remote] Error reading session {}: {}",
                self.session.code,
                e
            );
            Board::for_today()
        })
    }

    async fn upsert_note(&self, column: C, mut note: Note<C>) {
        note.clamp();
        self.session
            .mutate("upsert_note", move |board| board.upsert_note(column, note))
            .await;
    }

    async fn delete_note(&self, note_id: &str) {
        self.session
            .mutate("delete_note", |board| {
                board.remove_note(note_id);
            })
            .await;
    }

    async fn upsert_action_item(&self, mut item: ActionItem) {
        item.clamp();
        self.session
            .mutate("upsert_action_item", move |board| board.upsert_action_item(item))
            .await;
    }

    async fn delete_action_item(&self, item_id: &str) {
        self.session
            .mutate("delete_action_item", |board| {
                board.remove_action_item(item_id);
            })
            .await;
    }

    async fn set_sprint_info(&self, label: &str, date: &str) {
        self.session
            .mutate("set_sprint_info", |board| board.set_sprint_info(label, date))
            .await;
    }

    async fn clear_board(&self) {
        self.session.mutate("clear_board", Board::clear).await;
    }

    fn dispose(&self) {
        if let Some(task) = self
            .watch_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.session.listeners.clear();
    }
}

impl<C: Column> Drop for RemoteBoardStore<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
