//! Attachment hash index.
//!
//! This module handles:
//! - AttachmentRef for file deduplication
//! - The hash -> reference lookup table loaded once from the store
//!
//! The index is logically independent of the windowing logic but lives
//! inside the cache for lifecycle convenience: it is warmed once after
//! login and dropped on logout together with the windows.

use std::collections::HashMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::shared::ResultExt;
use crate::store::EventStore;

/// Lightweight attachment reference for file deduplication
///
/// Contains only the data needed to reuse an existing upload instead of
/// re-encrypting and re-uploading a file the store already has.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AttachmentRef {
    /// The SHA256 hash of the original file (used as ID)
    pub hash: String,
    /// The event ID containing this attachment
    pub event_id: String,
    /// The conversation containing that event
    pub conversation_id: String,
    /// The encrypted file URL on the server
    pub url: String,
    /// The encryption key
    pub key: String,
    /// The encryption nonce
    pub nonce: String,
    /// The file extension
    pub extension: String,
    /// The encrypted file size
    pub size: u64,
}

/// Hash -> attachment reference lookup table
#[derive(Debug, Default)]
pub struct AttachmentIndex {
    entries: HashMap<String, AttachmentRef>,
    loaded: bool,
}

impl AttachmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from the store, replacing any previous contents
    ///
    /// A store failure leaves the index unloaded; lookups then simply miss
    /// and callers fall back to a fresh upload.
    pub async fn warm(&mut self, store: &dyn EventStore) {
        let result = store
            .all_attachment_hashes()
            .await
            .context("Failed to warm file hash index");
        match result {
            Ok(entries) => {
                info!("[AttachmentIndex] Warmed with {} file hashes", entries.len());
                self.entries = entries;
                self.loaded = true;
            }
            Err(e) => {
                warn!("[AttachmentIndex] {}", e);
            }
        }
    }

    /// Look up a known attachment by its file hash
    pub fn lookup(&self, hash: &str) -> Option<&AttachmentRef> {
        self.entries.get(hash)
    }

    /// Whether the index has been loaded from the store
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Number of indexed attachments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries (logout)
    pub fn clear(&mut self) {
        self.entries.clear();
        self.loaded = false;
    }
}
