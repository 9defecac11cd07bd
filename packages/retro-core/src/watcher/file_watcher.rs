/// Document watcher using notify-debouncer-full.
///
/// Watches the directory holding the board document and emits a
/// `StorageEvent` on a broadcast channel whenever the document itself is
/// written or removed. Temporary files from atomic writes are ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebouncedEvent, Debouncer, RecommendedCache};
use tokio::sync::broadcast;

use super::types::StorageEvent;

const DEBOUNCE_DURATION: Duration = Duration::from_millis(100);

/// Watches a single document file for changes.
pub struct DocumentWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher, RecommendedCache>,
}

impl DocumentWatcher {
    /// Start watching `path`. The parent directory must exist.
    /// Returns the watcher and a broadcast receiver for events.
    pub fn new(
        path: &Path,
    ) -> Result<(Self, broadcast::Receiver<StorageEvent>), notify::Error> {
        let (event_tx, event_rx) = broadcast::channel(64);
        let target = canonical_document_path(path);
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let target_for_events = target.clone();
        let mut debouncer = new_debouncer(
            DEBOUNCE_DURATION,
            None,
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| match result {
                Ok(events) => {
                    for event in events {
                        handle_debounced_event(&event, &target_for_events, &event_tx);
                    }
                }
                Err(errors) => {
                    for e in errors {
                        log::error!("[retro.watcher.error] Watch error: {}", e);
                    }
                }
            },
        )?;

        debouncer.watch(&dir, RecursiveMode::NonRecursive)?;
        log::info!("[retro.watcher.document] Watching {:?}", target);

        Ok((
            Self {
                _debouncer: debouncer,
            },
            event_rx,
        ))
    }
}

/// Canonicalize via the parent directory so a document that does not exist
/// yet still compares equal to the paths reported once it is created.
fn canonical_document_path(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            std::fs::canonicalize(parent)
                .map(|p| p.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        }
        _ => path.to_path_buf(),
    }
}

fn handle_debounced_event(
    event: &DebouncedEvent,
    target: &Path,
    tx: &broadcast::Sender<StorageEvent>,
) {
    use notify::EventKind;

    if !event.paths.iter().any(|p| canonical_document_path(p) == target) {
        return;
    }

    let storage_event = match event.kind {
        EventKind::Remove(_) if !target.exists() => StorageEvent::DocumentRemoved {
            path: target.to_path_buf(),
        },
        EventKind::Access(_) => return,
        _ => StorageEvent::DocumentChanged {
            path: target.to_path_buf(),
        },
    };

    if let Err(e) = tx.send(storage_event) {
        log::debug!("[retro.watcher.send] No receivers: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_path_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("board.json");
        let canonical = canonical_document_path(&doc);
        assert_eq!(canonical.file_name().unwrap(), "board.json");
        assert_eq!(
            canonical.parent().unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[tokio::test]
    async fn test_reports_write_to_document() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("board.json");
        let (_watcher, mut rx) = DocumentWatcher::new(&doc).unwrap();

        std::fs::write(&doc, "{}").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no watcher event")
            .unwrap();
        assert!(matches!(event, StorageEvent::DocumentChanged { .. }));
    }
}
