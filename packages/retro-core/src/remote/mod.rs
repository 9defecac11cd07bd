pub mod memory;
#[cfg(feature = "relay")]
pub mod relay;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::storage::StoreError;

/// Stream of values for one watched path: the current value first, then one
/// item per change. `None` means the path holds no document.
pub type WatchReceiver = mpsc::UnboundedReceiver<Option<Value>>;

/// A real-time JSON document database addressed by slash-separated paths.
///
/// Writes replace the whole document at a path; there are no partial updates
/// and no transactions. Every watcher of a path, including the writer's own
/// watches, observes every write.
#[async_trait]
pub trait RealtimeDatabase: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, path: &str) -> Result<(), StoreError>;

    /// Subscribe to a path. Dropping the receiver ends the subscription.
    async fn watch(&self, path: &str) -> Result<WatchReceiver, StoreError>;
}
