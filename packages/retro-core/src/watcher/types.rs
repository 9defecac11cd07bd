/// Event types emitted by the document watcher.

use std::path::PathBuf;

/// SHA-256 fingerprint of a serialized document, used for self-write detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(pub String);

impl ContentFingerprint {
    /// Compute SHA-256 fingerprint of content with normalized line endings.
    pub fn from_content(content: &str) -> Self {
        use sha2::{Digest, Sha256};
        let normalized = content.replace("\r\n", "\n");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

/// "Storage changed" notifications for the board document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageEvent {
    /// The document was written (by this process or another one).
    DocumentChanged { path: PathBuf },
    /// The document was deleted.
    DocumentRemoved { path: PathBuf },
}
