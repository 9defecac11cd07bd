/// In-process real-time database.
///
/// Documents live in a map keyed by path; each path has a room of watchers
/// that receive every write. Closed watchers are pruned on the next write.
/// The relay server serves one of these over HTTP and WebSocket.
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{RealtimeDatabase, WatchReceiver};
use crate::storage::StoreError;

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Value>,
    watchers: HashMap<String, Vec<mpsc::UnboundedSender<Option<Value>>>>,
}

impl Inner {
    fn broadcast(&mut self, path: &str, value: Option<&Value>) {
        if let Some(room) = self.watchers.get_mut(path) {
            room.retain(|tx| tx.send(value.cloned()).is_ok());
            if room.is_empty() {
                self.watchers.remove(path);
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryDatabase {
    inner: Mutex<Inner>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read(&self, path: &str) -> Option<Value> {
        self.lock().documents.get(path).cloned()
    }

    pub fn write(&self, path: &str, value: Value) {
        let mut inner = self.lock();
        inner.documents.insert(path.to_string(), value.clone());
        inner.broadcast(path, Some(&value));
    }

    pub fn delete(&self, path: &str) {
        let mut inner = self.lock();
        if inner.documents.remove(path).is_some() {
            inner.broadcast(path, None);
        }
    }

    /// Register a watcher; the current value is queued before any later write.
    pub fn subscribe(&self, path: &str) -> WatchReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let current = inner.documents.get(path).cloned();
        // The receiver is alive here, so the send cannot fail.
        let _ = tx.send(current);
        inner.watchers.entry(path.to_string()).or_default().push(tx);
        rx
    }

    pub fn document_count(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn watcher_count(&self) -> usize {
        self.lock()
            .watchers
            .values()
            .flatten()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

#[async_trait]
impl RealtimeDatabase for MemoryDatabase {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read(path))
    }

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        if value.is_null() {
            self.delete(path);
        } else {
            self.write(path, value);
        }
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<(), StoreError> {
        self.delete(path);
        Ok(())
    }

    async fn watch(&self, path: &str) -> Result<WatchReceiver, StoreError> {
        Ok(self.subscribe(path))
    }
}
