//! Conversation window cache.
//!
//! This module handles:
//! - The LRU-ordered window collection and its bounds
//! - Paginated history loading through the store port
//! - Real-time event ingestion and reaction attachment
//! - Eviction, kept in sync with the store's own materialized cache
//!
//! The cache is a single owned service object: construct one per session
//! and hand it to call sites by reference. Multi-threaded callers wrap it
//! in a `tokio::sync::Mutex`, which also serializes pagination per
//! conversation - a second older-page load can never race ahead of the
//! first.

pub mod stats;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};

use crate::attachments::{AttachmentIndex, AttachmentRef};
use crate::shared::ResultExt;
use crate::store::EventStore;
use crate::window::ConversationWindow;
use crate::{Event, Reaction};

pub use stats::{CacheStats, WindowStats};

/// Log a cache summary line every this many recorded inserts
const STATS_LOG_INTERVAL: u64 = 500;

/// Tunables for the window cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of conversations tracked at once
    pub max_windows: usize,
    /// Per-window event cap, enforced on live inserts and at eviction
    pub max_events_per_window: usize,
    /// Default page size when a load is asked for 0 events
    pub batch_size: usize,
    /// Events retained in the store's preview when a window is evicted
    pub min_preview_events: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_windows: 5,
            max_events_per_window: 100,
            batch_size: 20,
            min_preview_events: 1,
        }
    }
}

/// Bounded per-conversation event cache with LRU eviction
///
/// Windows are kept in recency order: index 0 is the least recently used,
/// the back is the most recent. Touching a window moves it to the back;
/// eviction pops the front.
pub struct WindowCache {
    windows: Vec<ConversationWindow>,
    store: Arc<dyn EventStore>,
    attachments: AttachmentIndex,
    config: CacheConfig,
    stats: CacheStats,
}

impl WindowCache {
    /// Create a cache with the default configuration
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    /// Create a cache with an explicit configuration
    pub fn with_config(store: Arc<dyn EventStore>, config: CacheConfig) -> Self {
        Self {
            windows: Vec::new(),
            store,
            attachments: AttachmentIndex::new(),
            config,
            stats: CacheStats::new(),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Crate-wide insert instrumentation
    pub fn cache_stats(&self) -> &CacheStats {
        &self.stats
    }

    // ========================================================================
    // Window lookup and lifecycle
    // ========================================================================

    /// Whether a window is currently cached for a conversation
    pub fn has(&self, conversation_id: &str) -> bool {
        self.position(conversation_id).is_some()
    }

    /// Get the window for a conversation, creating an empty one if absent
    ///
    /// The returned window is marked most-recently-used. Never fails: if
    /// creation pushes the cache over `max_windows`, the least recently
    /// used window is evicted first.
    pub fn get_or_create_entry(&mut self, conversation_id: &str) -> &mut ConversationWindow {
        let pos = match self.position(conversation_id) {
            Some(pos) => pos,
            None => {
                self.windows
                    .push(ConversationWindow::new(conversation_id.to_string()));
                self.evict_if_needed();
                // Eviction only ever pops the front; the new window stays last
                self.windows.len() - 1
            }
        };

        // Move to the back: most-recently-used
        let window = self.windows.remove(pos);
        self.windows.push(window);
        let window = self.windows.last_mut().unwrap();
        window.touch();
        window
    }

    /// Read a conversation's cached events, touching it for LRU purposes
    ///
    /// Returns `None` when no window exists - absence of data, not an
    /// error. Does not create a window.
    pub fn get_events(&mut self, conversation_id: &str) -> Option<&[Event]> {
        let pos = self.position(conversation_id)?;
        let window = self.windows.remove(pos);
        self.windows.push(window);
        let window = self.windows.last_mut().unwrap();
        window.touch();
        Some(window.events())
    }

    /// Get an event by ID within a conversation's window
    pub fn get_event(&self, conversation_id: &str, event_id: &str) -> Option<&Event> {
        self.windows
            .iter()
            .find(|w| w.conversation_id == conversation_id)
            .and_then(|w| w.get_event(event_id))
    }

    /// Snapshot a conversation's cache state
    pub fn get_stats(&self, conversation_id: &str) -> Option<WindowStats> {
        self.windows
            .iter()
            .find(|w| w.conversation_id == conversation_id)
            .map(WindowStats::from_window)
    }

    /// Drop all windows and the attachment index (logout)
    pub fn clear(&mut self) {
        info!("[WindowCache] Clearing {} windows", self.windows.len());
        self.windows.clear();
        self.attachments.clear();
        self.stats.update_from_windows(&self.windows);
    }

    /// Remove a single conversation's window entirely (view closed)
    ///
    /// Returns `false` if nothing was cached for the conversation.
    pub fn clear_conversation(&mut self, conversation_id: &str) -> bool {
        match self.position(conversation_id) {
            Some(pos) => {
                self.windows.remove(pos);
                self.stats.update_from_windows(&self.windows);
                true
            }
            None => false,
        }
    }

    /// Collapse a conversation's window to the per-window cap
    pub fn trim_conversation(&mut self, conversation_id: &str) {
        let max_events = self.config.max_events_per_window;
        if let Some(window) = self.window_mut(conversation_id) {
            window.trim_to_max(max_events);
        }
    }

    // ========================================================================
    // Pagination
    // ========================================================================

    /// Ensure at least `count` most-recent events are loaded for a
    /// conversation, fetching from the store only when the cache falls
    /// short
    ///
    /// Idempotent, and never raises: a failing store degrades to whatever
    /// is already cached. A `count` of 0 means the configured batch size.
    pub async fn load_initial_events(
        &mut self,
        conversation_id: &str,
        count: usize,
    ) -> Vec<Event> {
        let count = if count == 0 { self.config.batch_size } else { count };
        self.get_or_create_entry(conversation_id);

        // Refresh the total first; the store may have changed since the
        // last load
        let count_result = self
            .store
            .event_count(conversation_id)
            .await
            .with_context(|| format!("Count refresh failed for {}", conversation_id));
        let total = match count_result {
            Ok(total) => total,
            Err(e) => {
                warn!("[WindowCache] {}", e);
                return self.cached_events(conversation_id);
            }
        };

        {
            let window = self.get_or_create_entry(conversation_id);
            window.total_in_db = total;

            // Nothing stored: the window is trivially complete
            if total == 0 {
                window.is_fully_loaded = true;
                return Vec::new();
            }

            // Enough already cached: serve without another store round-trip
            if window.event_count() >= count {
                return window.events().to_vec();
            }
        }

        // Fetch the most recent `count` events
        let page_result = self
            .store
            .events_paginated(conversation_id, count, 0)
            .await
            .with_context(|| format!("Initial load failed for {}", conversation_id));
        let fetched = match page_result {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("[WindowCache] {}", e);
                return self.cached_events(conversation_id);
            }
        };

        let window = self.get_or_create_entry(conversation_id);
        let fetched_count = fetched.len();
        let fetched_ids: HashSet<String> = fetched.iter().map(|e| e.id.clone()).collect();

        // The fetched page is authoritative. Cached events the store does
        // not know about yet (real-time arrivals racing the write path)
        // are preserved and merged back in.
        let preserved: Vec<Event> = window
            .events
            .drain(..)
            .filter(|e| !fetched_ids.contains(&e.id))
            .collect();

        let mut merged = fetched;
        merged.extend(preserved);
        merged.sort_by_key(|e| e.at);

        window.events = merged;
        window.rebuild_ids();
        window.loaded_offset = fetched_count;
        window.is_fully_loaded = window.loaded_offset >= window.total_in_db;

        debug!(
            "[WindowCache] Initial load for {}: {} fetched, {} cached",
            conversation_id,
            fetched_count,
            window.event_count()
        );
        window.events().to_vec()
    }

    /// Fetch the next older page for a conversation
    ///
    /// No-op (returns empty) when no window exists or nothing older
    /// remains. A store failure also returns empty with state untouched:
    /// "no more available right now", not an error. A `count` of 0 means
    /// the configured batch size.
    pub async fn load_more_events(&mut self, conversation_id: &str, count: usize) -> Vec<Event> {
        let count = if count == 0 { self.config.batch_size } else { count };

        // Only page conversations we are already tracking
        let offset = {
            let window = match self.window_mut(conversation_id) {
                Some(window) => window,
                None => return Vec::new(),
            };
            if window.is_fully_loaded || !window.has_more_events() {
                return Vec::new();
            }
            window.loaded_offset
        };

        let page_result = self
            .store
            .events_paginated(conversation_id, count, offset)
            .await
            .with_context(|| format!("Older page load failed for {}", conversation_id));
        let page = match page_result {
            Ok(page) => page,
            Err(e) => {
                warn!("[WindowCache] {}", e);
                return Vec::new();
            }
        };

        let window = match self.window_mut(conversation_id) {
            Some(window) => window,
            None => return Vec::new(),
        };

        if page.is_empty() {
            // The store ran dry before the counters agreed; treat the
            // conversation as fully loaded rather than re-requesting the
            // same empty page forever
            window.is_fully_loaded = true;
            return Vec::new();
        }

        // Clone for return, move the originals into the window
        let page_for_return = page.clone();
        let page_len = page.len();
        window.add_events(page, true);
        window.loaded_offset += page_len;
        window.is_fully_loaded = window.loaded_offset >= window.total_in_db;

        debug!(
            "[WindowCache] Loaded {} older events for {} (offset now {})",
            page_len, conversation_id, window.loaded_offset
        );
        page_for_return
    }

    /// Externally-driven correction of a conversation's stored total
    /// (e.g. after an out-of-band sync)
    pub fn update_total_count(&mut self, conversation_id: &str, count: usize) {
        let window = self.get_or_create_entry(conversation_id);
        window.total_in_db = count;
        window.is_fully_loaded = window.loaded_offset >= count;
    }

    // ========================================================================
    // Real-time ingestion
    // ========================================================================

    /// Merge a single pushed event into its conversation's window
    ///
    /// The sole entry point for real-time traffic, agnostic to event kind.
    /// Returns `false` for an already-known event id.
    pub fn add_event(&mut self, conversation_id: &str, event: Event) -> bool {
        let start = Instant::now();
        let max_events = self.config.max_events_per_window;
        let added = self
            .get_or_create_entry(conversation_id)
            .add_event(event, max_events);

        if added {
            self.stats.record_insert(start.elapsed());
            self.stats.update_from_windows(&self.windows);
            if self.stats.should_log(STATS_LOG_INTERVAL) {
                debug!("[WindowCache] {}", self.stats.summary());
            }
        }
        added
    }

    /// Attach a reaction to an already-cached event
    ///
    /// Returns `false` when the conversation or the event is not cached,
    /// or when the reaction id is already present. Reactions are frequent
    /// small mutations; this path exists so they never force a re-fetch.
    pub fn add_reaction_to_event(
        &mut self,
        conversation_id: &str,
        event_id: &str,
        reaction: Reaction,
    ) -> bool {
        if let Some(window) = self.window_mut(conversation_id) {
            if let Some(event) = window.get_event_mut(event_id) {
                return event.add_reaction(reaction);
            }
        }
        false
    }

    // ========================================================================
    // Attachment hash index
    // ========================================================================

    /// Load the attachment hash index from the store (once, at startup)
    pub async fn warm_attachment_index(&mut self) {
        let store = Arc::clone(&self.store);
        self.attachments.warm(store.as_ref()).await;
    }

    /// Look up a known attachment by file hash
    pub fn lookup_attachment(&self, hash: &str) -> Option<&AttachmentRef> {
        self.attachments.lookup(hash)
    }

    /// The attachment hash index
    pub fn attachments(&self) -> &AttachmentIndex {
        &self.attachments
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn position(&self, conversation_id: &str) -> Option<usize> {
        self.windows
            .iter()
            .position(|w| w.conversation_id == conversation_id)
    }

    /// Find a window without reordering the LRU sequence
    fn window_mut(&mut self, conversation_id: &str) -> Option<&mut ConversationWindow> {
        self.windows
            .iter_mut()
            .find(|w| w.conversation_id == conversation_id)
    }

    /// Clone a conversation's cached events, or empty when untracked
    fn cached_events(&self, conversation_id: &str) -> Vec<Event> {
        self.windows
            .iter()
            .find(|w| w.conversation_id == conversation_id)
            .map(|w| w.events().to_vec())
            .unwrap_or_default()
    }

    /// Evict least-recently-used windows until the cache fits its bound
    ///
    /// Each victim is collapsed to the preview size, the store is told to
    /// trim its own materialized cache to match, and the window is then
    /// dropped entirely - the next access recreates it from scratch.
    fn evict_if_needed(&mut self) {
        // Keep at least the window currently being handed out
        let floor = self.config.max_windows.max(1);
        while self.windows.len() > floor {
            let mut evicted = self.windows.remove(0);
            evicted.trim_to_max(self.config.min_preview_events);
            info!(
                "[WindowCache] Evicted window for {} ({} still cached)",
                evicted.conversation_id,
                self.windows.len()
            );
            self.notify_evicted(evicted.conversation_id);
        }
    }

    /// Tell the store a conversation was evicted, without waiting
    ///
    /// Best-effort by contract: local eviction has already happened, and a
    /// failed or impossible notification (no ambient runtime) is ignored.
    fn notify_evicted(&self, conversation_id: String) {
        let store = Arc::clone(&self.store);
        let keep_count = self.config.min_preview_events;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = store.evict_conversation(&conversation_id, keep_count).await {
                    warn!(
                        "[WindowCache] Store eviction notify failed for {}: {}",
                        conversation_id, e
                    );
                }
            });
        }
    }
}
