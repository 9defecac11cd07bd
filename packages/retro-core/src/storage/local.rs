/// Local board storage backend.
///
/// Persists one JSON document under a fixed key in a storage directory.
/// Changes become visible to subscribers through three paths:
/// - every mutation notifies this store's listeners right after the write
/// - a refresh timer re-reads the document and pushes it on every tick
/// - a document watcher pushes writes made by other stores or processes
///   (own writes are recognized by fingerprint and skipped)
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::{BoardStore, StoreError};
use crate::listeners::{Listener, ListenerSet, Subscription};
use crate::types::{ActionItem, Board, Column, Note};
use crate::watcher::self_write::SelfWriteTracker;
#[cfg(feature = "file-watcher")]
use crate::watcher::{file_watcher::DocumentWatcher, types::StorageEvent};

/// Fixed key of the board document inside the storage directory.
pub const STORAGE_KEY: &str = "retro-board-data";

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct LocalStoreOptions {
    pub storage_dir: PathBuf,
    /// Period of the re-read-and-push timer.
    pub refresh_interval: Duration,
    /// Watch the document for writes made outside this store.
    pub watch_external: bool,
}

impl LocalStoreOptions {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            watch_external: true,
        }
    }

    pub fn document_path(&self) -> PathBuf {
        self.storage_dir.join(format!("{}.json", STORAGE_KEY))
    }
}

/// The on-disk document plus everything needed to publish it.
struct LocalDocument<C: Column> {
    path: PathBuf,
    listeners: Arc<ListenerSet<C>>,
    self_writes: Mutex<SelfWriteTracker>,
}

impl<C: Column> LocalDocument<C> {
    /// Read the board. A missing or corrupt document yields the default board;
    /// any other IO failure is returned.
    fn read(&self) -> Result<Board<C>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Board::for_today()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(board) => Ok(board),
            Err(e) => {
                log::warn!(
                    "[retro.storage.local] Unreadable board document {:?}, using default: {}",
                    self.path,
                    e
                );
                Ok(Board::for_today())
            }
        }
    }

    fn read_or_default(&self) -> Board<C> {
        self.read().unwrap_or_else(|e| {
            log::error!("[retro.storage.local] Error reading board: {}", e);
            Board::for_today()
        })
    }

    /// Serialize, write atomically, then notify listeners.
    fn write(&self, board: &Board<C>) -> Result<(), StoreError> {
        let content = serde_json::to_string(board)?;

        self.self_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .register(&content);

        atomic_write(&self.path, &content)?;
        self.listeners.notify(board);
        Ok(())
    }

    /// Read-modify-write. A failed read or write leaves the document untouched.
    fn mutate(&self, op: &str, apply: impl FnOnce(&mut Board<C>)) {
        let result = self.read().and_then(|mut board| {
            apply(&mut board);
            self.write(&board)
        });
        if let Err(e) = result {
            log::error!("[retro.storage.local] {} failed: {}", op, e);
        }
    }

    /// Refresh tick: push whatever is on disk to every listener.
    fn publish_current(&self) {
        self.self_writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cleanup_expired();
        if self.listeners.is_empty() {
            return;
        }
        let board = self.read_or_default();
        self.listeners.notify(&board);
    }

    #[cfg(feature = "file-watcher")]
    fn handle_storage_event(&self, event: &StorageEvent) {
        match event {
            StorageEvent::DocumentChanged { path } => {
                let content = match fs::read_to_string(path) {
                    Ok(content) => content,
                    Err(e) => {
                        log::warn!("[retro.storage.local] Changed document unreadable: {}", e);
                        return;
                    }
                };
                let own_write = self
                    .self_writes
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .check_and_consume(&content);
                if own_write {
                    return;
                }
                match serde_json::from_str::<Board<C>>(&content) {
                    Ok(board) => {
                        log::debug!("[retro.storage.local] External change to {:?}", path);
                        self.listeners.notify(&board);
                    }
                    Err(e) => {
                        log::error!("[retro.storage.local] Error parsing storage data: {}", e);
                    }
                }
            }
            StorageEvent::DocumentRemoved { path } => {
                log::debug!("[retro.storage.local] Document removed: {:?}", path);
            }
        }
    }
}

/// Board store backed by a JSON document on the local filesystem.
pub struct LocalBoardStore<C: Column> {
    doc: Arc<LocalDocument<C>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    #[cfg(feature = "file-watcher")]
    watcher: Mutex<Option<DocumentWatcher>>,
}

impl<C: Column> LocalBoardStore<C> {
    /// Open the store and start its refresh timer (and watcher, if enabled).
    /// Must be called from within a tokio runtime.
    pub fn open(options: &LocalStoreOptions) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| StoreError::NoRuntime)?;
        fs::create_dir_all(&options.storage_dir)?;

        let doc = Arc::new(LocalDocument {
            path: options.document_path(),
            listeners: Arc::new(ListenerSet::new()),
            self_writes: Mutex::new(SelfWriteTracker::new()),
        });

        #[cfg_attr(not(feature = "file-watcher"), allow(unused_mut))]
        let mut tasks = vec![runtime.spawn(refresh_loop(doc.clone(), options.refresh_interval))];

        #[cfg(feature = "file-watcher")]
        let watcher = if options.watch_external {
            match DocumentWatcher::new(&doc.path) {
                Ok((watcher, mut events)) => {
                    let doc_events = doc.clone();
                    tasks.push(runtime.spawn(async move {
                        use tokio::sync::broadcast::error::RecvError;
                        loop {
                            match events.recv().await {
                                Ok(event) => doc_events.handle_storage_event(&event),
                                Err(RecvError::Lagged(n)) => {
                                    log::warn!("[retro.storage.local] Skipped {} watcher events", n);
                                }
                                Err(RecvError::Closed) => break,
                            }
                        }
                    }));
                    Some(watcher)
                }
                Err(e) => {
                    log::warn!(
                        "[retro.storage.local] Watcher unavailable, relying on refresh timer: {}",
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        log::info!("[retro.storage.local] Opened board document {:?}", doc.path);

        Ok(Self {
            doc,
            tasks: Mutex::new(tasks),
            #[cfg(feature = "file-watcher")]
            watcher: Mutex::new(watcher),
        })
    }

    /// Synchronous read of the document.
    pub fn read_board(&self) -> Board<C> {
        self.doc.read_or_default()
    }

    pub fn document_path(&self) -> &Path {
        &self.doc.path
    }
}

async fn refresh_loop<C: Column>(doc: Arc<LocalDocument<C>>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately; subscribers already got the board.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        doc.publish_current();
    }
}

#[async_trait]
impl<C: Column> BoardStore<C> for LocalBoardStore<C> {
    fn subscribe(&self, listener: Listener<C>) -> Subscription<C> {
        let id = self.doc.listeners.add(listener.clone());
        listener(&self.doc.read_or_default());
        Subscription::new(id, &self.doc.listeners)
    }

    async fn snapshot(&self) -> Board<C> {
        self.doc.read_or_default()
    }

    async fn upsert_note(&self, column: C, mut note: Note<C>) {
        note.clamp();
        self.doc
            .mutate("upsert_note", |board| board.upsert_note(column, note));
    }

    async fn delete_note(&self, note_id: &str) {
        self.doc.mutate("delete_note", |board| {
            board.remove_note(note_id);
        });
    }

    async fn upsert_action_item(&self, mut item: ActionItem) {
        item.clamp();
        self.doc
            .mutate("upsert_action_item", |board| board.upsert_action_item(item));
    }

    async fn delete_action_item(&self, item_id: &str) {
        self.doc.mutate("delete_action_item", |board| {
            board.remove_action_item(item_id);
        });
    }

    async fn set_sprint_info(&self, label: &str, date: &str) {
        self.doc
            .mutate("set_sprint_info", |board| board.set_sprint_info(label, date));
    }

    async fn clear_board(&self) {
        self.doc.mutate("clear_board", Board::clear);
    }

    fn dispose(&self) {
        let tasks: Vec<JoinHandle<()>> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }
        self.doc.listeners.clear();
        #[cfg(feature = "file-watcher")]
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl<C: Column> Drop for LocalBoardStore<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Atomic write with fsync: write to .tmp, fsync, rename, fsync directory.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
    let tmp_path = path.with_extension("retro-sync.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;

    if let Some(dir) = path.parent() {
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}
