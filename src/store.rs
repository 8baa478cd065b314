//! Backend query port.
//!
//! The cache never talks to storage directly; it goes through this trait.
//! The persistence tier behind it is expected to serve *materialized
//! views* - events already composed for display, reactions attached -
//! ordered and counted the same way the cache orders them.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::attachments::AttachmentRef;
use crate::Event;

/// Asynchronous interface to the persistent event store
///
/// All methods are best-effort from the cache's point of view: a failing
/// store degrades pagination to "serve what is cached", it never surfaces
/// an error to the UI.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Total number of displayable events for a conversation
    async fn event_count(&self, conversation_id: &str) -> Result<usize, String>;

    /// Get paginated events for a conversation (newest first, with offset)
    ///
    /// `offset` counts already-loaded events back from the most recent end:
    /// skip the `offset` newest events, return up to `limit` of the next
    /// older block. The returned batch is in chronological order (oldest
    /// first within the batch). An empty or undersized result means no
    /// more data.
    async fn events_paginated(
        &self,
        conversation_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Event>, String>;

    /// Ask the store to trim its own materialized cache for a conversation
    /// down to the `keep_count` most recent entries
    ///
    /// Called when the in-memory cache evicts a window, so the two tiers
    /// shrink together. Fire-and-forget from the caller's side; failures
    /// are ignored.
    async fn evict_conversation(
        &self,
        conversation_id: &str,
        keep_count: usize,
    ) -> Result<(), String>;

    /// Build the file hash index from all attachments in the store
    ///
    /// Loaded once at startup; used for file deduplication without loading
    /// full event content.
    async fn all_attachment_hashes(&self) -> Result<HashMap<String, AttachmentRef>, String>;
}
