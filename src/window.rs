//! Per-conversation event window.
//!
//! A ConversationWindow is the in-memory, bounded subset of one
//! conversation's history: an ordered event sequence, a mirrored id set for
//! O(1) duplicate detection, and the pagination cursors that tie the window
//! back to the persistent store.

use std::collections::HashSet;

use serde::Serialize;

use crate::shared::now_ms;
use crate::Event;

/// Cached state for a single conversation
///
/// Invariants held across every public operation:
/// - `events` is sorted non-decreasing by `at`; ties keep insertion order
/// - `event_ids` mirrors the ids in `events` exactly
/// - `loaded_offset <= total_in_db`
#[derive(Serialize, Clone, Debug)]
pub struct ConversationWindow {
    /// The conversation this window belongs to
    pub conversation_id: String,
    /// Cached events, ascending by `at`
    pub(crate) events: Vec<Event>,
    /// Ids of every cached event, kept in lockstep with `events`
    #[serde(skip)]
    pub(crate) event_ids: HashSet<String>,
    /// Last time this window was touched (Unix ms), for LRU bookkeeping
    pub(crate) last_access: u64,
    /// Total number of events the store reports for this conversation
    pub(crate) total_in_db: usize,
    /// How many of the most recent events have been loaded from the store
    pub(crate) loaded_offset: usize,
    /// Whether the full history is resident in this window
    pub(crate) is_fully_loaded: bool,
}

impl ConversationWindow {
    /// Create a new empty window for a conversation
    pub fn new(conversation_id: String) -> Self {
        Self {
            conversation_id,
            events: Vec::new(),
            event_ids: HashSet::new(),
            last_access: now_ms(),
            total_in_db: 0,
            loaded_offset: 0,
            is_fully_loaded: false,
        }
    }

    /// Mark this window as just-used
    pub fn touch(&mut self) {
        self.last_access = now_ms();
    }

    /// The cached events, oldest first
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of cached events
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Whether older events exist in the store beyond what is cached
    pub fn has_more_events(&self) -> bool {
        !self.is_fully_loaded && self.loaded_offset < self.total_in_db
    }

    /// Get an event by ID
    pub fn get_event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Get a mutable event by ID
    pub fn get_event_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == id)
    }

    /// Add a single real-time event to this window
    ///
    /// Returns `false` without mutating state if the event id is already
    /// cached. On success the store total is bumped and, if the window now
    /// exceeds `max_events`, the single oldest event is dropped so live
    /// traffic can never grow a window without bound.
    pub fn add_event(&mut self, event: Event, max_events: usize) -> bool {
        // Make sure we don't add the same event twice
        if self.event_ids.contains(&event.id) {
            // Event is already known by the window
            return false;
        }
        self.event_ids.insert(event.id.clone());

        // Fast path for common cases: newest or oldest events
        if self.events.is_empty() {
            // First event
            self.events.push(event);
        } else if event.at >= self.events.last().unwrap().at {
            // Common case 1: Latest event (append to end)
            self.events.push(event);
        } else if event.at < self.events.first().unwrap().at {
            // Common case 2: Oldest event (insert at beginning)
            self.events.insert(0, event);
        } else {
            // Less common case: Event belongs somewhere in the middle.
            // partition_point lands after any tied timestamps, keeping
            // arrival order stable among equals.
            let idx = self.events.partition_point(|e| e.at <= event.at);
            self.events.insert(idx, event);
        }

        // A pushed event is one the store will also come to know about
        self.total_in_db += 1;

        // Enforce the per-window cap on the live-insert path only;
        // pagination is allowed to overshoot until eviction
        if self.events.len() > max_events {
            let removed = self.events.remove(0);
            self.event_ids.remove(&removed.id);
            self.loaded_offset = self.loaded_offset.saturating_sub(1);
            self.is_fully_loaded = false;
        }

        true
    }

    /// Merge a batch of already-sorted events into this window
    ///
    /// `prepend` is used for older pages (scrollback), append for newer
    /// data. Events whose ids are already cached are skipped. Returns the
    /// number of events actually added.
    ///
    /// The per-window cap is deliberately not enforced here: a
    /// scroll-triggered load must never be blocked by eviction policy.
    pub fn add_events(&mut self, batch: Vec<Event>, prepend: bool) -> usize {
        let fresh: Vec<Event> = batch
            .into_iter()
            .filter(|e| !self.event_ids.contains(&e.id))
            .collect();
        if fresh.is_empty() {
            return 0;
        }

        for event in &fresh {
            self.event_ids.insert(event.id.clone());
        }

        let added = fresh.len();
        if prepend {
            self.events.splice(0..0, fresh);
        } else {
            self.events.extend(fresh);
        }
        added
    }

    /// Collapse this window to its most recent `max_events` events
    ///
    /// Called during cache-level eviction and explicit trims. Discarded
    /// events are subtracted from `loaded_offset` so the next older-page
    /// fetch resumes where the cache now actually ends. Trimming always
    /// invalidates completeness.
    pub fn trim_to_max(&mut self, max_events: usize) {
        if self.events.len() > max_events {
            let discard = self.events.len() - max_events;
            self.events.drain(0..discard);
            self.loaded_offset = self.loaded_offset.saturating_sub(discard);
            self.rebuild_ids();
        }
        self.is_fully_loaded = false;
    }

    /// Recompute `event_ids` from the events currently cached
    pub(crate) fn rebuild_ids(&mut self) {
        self.event_ids = self.events.iter().map(|e| e.id.clone()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_kind;

    fn ev(id: &str, at: u64) -> Event {
        Event::new(
            id.to_string(),
            event_kind::TEXT_MESSAGE,
            at,
            serde_json::Value::Null,
        )
    }

    /// The id set must mirror the event list exactly
    fn assert_ids_mirror(window: &ConversationWindow) {
        let from_events: HashSet<String> =
            window.events.iter().map(|e| e.id.clone()).collect();
        assert_eq!(window.event_ids, from_events);
    }

    /// Events must be sorted non-decreasing by `at`
    fn assert_sorted(window: &ConversationWindow) {
        assert!(window.events.windows(2).all(|pair| pair[0].at <= pair[1].at));
    }

    #[test]
    fn test_add_event_append_path() {
        let mut window = ConversationWindow::new("conv1".to_string());

        assert!(window.add_event(ev("a", 10), 100));
        assert!(window.add_event(ev("b", 20), 100));
        assert!(window.add_event(ev("c", 30), 100));

        assert_eq!(window.event_count(), 3);
        assert_eq!(window.total_in_db, 3);
        assert_sorted(&window);
        assert_ids_mirror(&window);
    }

    #[test]
    fn test_add_event_duplicate_is_rejected() {
        let mut window = ConversationWindow::new("conv1".to_string());

        assert!(window.add_event(ev("a", 10), 100));
        // Second insert of the same id returns false and changes nothing
        assert!(!window.add_event(ev("a", 10), 100));

        assert_eq!(window.event_count(), 1);
        assert_eq!(window.total_in_db, 1);
        assert_ids_mirror(&window);
    }

    #[test]
    fn test_add_event_out_of_order() {
        let mut window = ConversationWindow::new("conv1".to_string());
        window.add_event(ev("a", 10), 100);
        window.add_event(ev("b", 20), 100);
        window.add_event(ev("c", 30), 100);

        // Late delivery lands between its neighbours
        assert!(window.add_event(ev("x", 25), 100));

        let ats: Vec<u64> = window.events.iter().map(|e| e.at).collect();
        assert_eq!(ats, vec![10, 20, 25, 30]);
        assert_eq!(window.events[2].id, "x");
        assert_ids_mirror(&window);
    }

    #[test]
    fn test_add_event_older_than_all() {
        let mut window = ConversationWindow::new("conv1".to_string());
        window.add_event(ev("b", 20), 100);
        window.add_event(ev("c", 30), 100);

        assert!(window.add_event(ev("a", 10), 100));
        assert_eq!(window.events[0].id, "a");
        assert_sorted(&window);
    }

    #[test]
    fn test_add_event_tied_timestamp_is_stable() {
        let mut window = ConversationWindow::new("conv1".to_string());
        window.add_event(ev("a", 10), 100);
        window.add_event(ev("b", 20), 100);
        window.add_event(ev("c", 30), 100);

        // A tie with an existing timestamp goes after the earlier arrival
        window.add_event(ev("late", 20), 100);
        let ids: Vec<&str> = window.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "late", "c"]);
    }

    #[test]
    fn test_add_event_overflow_drops_oldest() {
        let mut window = ConversationWindow::new("conv1".to_string());
        for i in 0..3 {
            window.add_event(ev(&format!("e{}", i), 10 * (i as u64 + 1)), 3);
        }
        window.loaded_offset = 3;
        window.is_fully_loaded = true;

        // The 4th insert overflows a cap of 3: the oldest event goes
        assert!(window.add_event(ev("e3", 40), 3));
        assert_eq!(window.event_count(), 3);
        assert_eq!(window.events[0].id, "e1");
        // Bookkeeping follows the drop: one fewer loaded, no longer complete
        assert_eq!(window.loaded_offset, 2);
        assert!(!window.is_fully_loaded);
        assert_ids_mirror(&window);
    }

    #[test]
    fn test_add_events_prepend_and_dedup() {
        let mut window = ConversationWindow::new("conv1".to_string());
        window.add_event(ev("c", 30), 100);
        window.add_event(ev("d", 40), 100);

        // An older page, already containing one cached id
        let added = window.add_events(vec![ev("a", 10), ev("b", 20), ev("c", 30)], true);
        assert_eq!(added, 2);

        let ids: Vec<&str> = window.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_sorted(&window);
        assert_ids_mirror(&window);
    }

    #[test]
    fn test_add_events_does_not_enforce_cap() {
        let mut window = ConversationWindow::new("conv1".to_string());
        window.add_event(ev("z", 100), 5);

        let page: Vec<Event> = (0..10).map(|i| ev(&format!("p{}", i), i)).collect();
        // Pagination may overshoot the cap; only eviction trims
        assert_eq!(window.add_events(page, true), 10);
        assert_eq!(window.event_count(), 11);
    }

    #[test]
    fn test_trim_to_max() {
        let mut window = ConversationWindow::new("conv1".to_string());
        for i in 0..10 {
            window.add_event(ev(&format!("e{}", i), i), 100);
        }
        window.loaded_offset = 10;
        window.total_in_db = 10;
        window.is_fully_loaded = true;

        window.trim_to_max(4);

        assert_eq!(window.event_count(), 4);
        assert_eq!(window.events[0].id, "e6");
        assert_eq!(window.loaded_offset, 4);
        assert!(!window.is_fully_loaded);
        assert!(window.has_more_events());
        assert_ids_mirror(&window);
    }

    #[test]
    fn test_trim_to_max_noop_still_invalidates_completeness() {
        let mut window = ConversationWindow::new("conv1".to_string());
        window.add_event(ev("a", 10), 100);
        window.loaded_offset = 1;
        window.is_fully_loaded = true;

        window.trim_to_max(100);

        assert_eq!(window.event_count(), 1);
        assert!(!window.is_fully_loaded);
    }

    #[test]
    fn test_has_more_events() {
        let mut window = ConversationWindow::new("conv1".to_string());
        assert!(!window.has_more_events());

        window.total_in_db = 45;
        assert!(window.has_more_events());

        window.loaded_offset = 45;
        assert!(!window.has_more_events());

        window.loaded_offset = 20;
        window.is_fully_loaded = true;
        assert!(!window.has_more_events());
    }
}
