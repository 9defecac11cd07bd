/// Self-write tracker using SHA-256 fingerprints.
///
/// A store registers the fingerprint of every document it writes. When the
/// watcher reports a change, the store reads the document back and consumes a
/// matching fingerprint: a match is its own write and is not re-broadcast as a
/// foreign change, which keeps the "storage changed" notification limited to
/// writes made elsewhere.
use std::time::{Duration, Instant};

use super::types::ContentFingerprint;

const FINGERPRINT_TTL: Duration = Duration::from_secs(10);

struct PendingFingerprint {
    fingerprint: ContentFingerprint,
    registered_at: Instant,
}

/// Pending fingerprints for one document (several writes may land before
/// the watcher fires).
#[derive(Default)]
pub struct SelfWriteTracker {
    pending: Vec<PendingFingerprint>,
}

impl SelfWriteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content about to be written.
    pub fn register(&mut self, content: &str) {
        self.pending.push(PendingFingerprint {
            fingerprint: ContentFingerprint::from_content(content),
            registered_at: Instant::now(),
        });
    }

    /// Returns true (and consumes the fingerprint) if `current_content` is one
    /// of our own pending writes.
    pub fn check_and_consume(&mut self, current_content: &str) -> bool {
        let fingerprint = ContentFingerprint::from_content(current_content);
        match self.pending.iter().position(|e| e.fingerprint == fingerprint) {
            Some(pos) => {
                self.pending.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove expired fingerprints (cleanup, not functional).
    pub fn cleanup_expired(&mut self) {
        let now = Instant::now();
        self.pending
            .retain(|e| now.duration_since(e.registered_at) < FINGERPRINT_TTL);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
