//! Cache statistics and instrumentation.
//!
//! `WindowStats` is the per-conversation snapshot exposed to the UI;
//! `CacheStats` is crate-wide insert-timing instrumentation for spotting
//! cache regressions during development.

use std::time::Duration;

use serde::Serialize;

use crate::window::ConversationWindow;

/// Snapshot of one conversation window's cache state
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WindowStats {
    /// Number of events currently cached in the window
    pub cached_count: usize,
    /// Total events the store reports for the conversation
    pub total_in_db: usize,
    /// How many of the most recent events have been loaded
    pub loaded_offset: usize,
    /// Whether the full history is resident
    pub is_fully_loaded: bool,
    /// Whether an older page can still be fetched
    pub has_more_events: bool,
    /// Last time the window was touched (Unix ms)
    pub last_access: u64,
}

impl WindowStats {
    /// Build a snapshot from a window
    pub(crate) fn from_window(window: &ConversationWindow) -> Self {
        Self {
            cached_count: window.event_count(),
            total_in_db: window.total_in_db,
            loaded_offset: window.loaded_offset,
            is_fully_loaded: window.is_fully_loaded,
            has_more_events: window.has_more_events(),
            last_access: window.last_access,
        }
    }
}

/// Statistics for cache insert operations
#[derive(Debug, Default, Clone)]
pub struct CacheStats {
    /// Total number of events across all windows
    pub event_count: usize,
    /// Total number of windows
    pub window_count: usize,
    /// Duration of last insert operation
    pub last_insert_duration: Duration,
    /// Average insert duration in nanoseconds
    pub avg_insert_duration_ns: u64,
    /// Number of insert operations recorded
    pub insert_count: u64,
    /// Total nanoseconds spent inserting
    insert_total_ns: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an insert operation's duration
    pub fn record_insert(&mut self, duration: Duration) {
        self.last_insert_duration = duration;
        self.insert_count += 1;
        self.insert_total_ns += duration.as_nanos() as u64;
        self.avg_insert_duration_ns = self.insert_total_ns / self.insert_count;
    }

    /// Update counts from the current window set
    pub fn update_from_windows(&mut self, windows: &[ConversationWindow]) {
        self.window_count = windows.len();
        self.event_count = windows.iter().map(|w| w.event_count()).sum();
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "windows={} events={} avg_insert={}ns inserts={}",
            self.window_count, self.event_count, self.avg_insert_duration_ns, self.insert_count,
        )
    }

    /// Check if we should log (every N inserts)
    pub fn should_log(&self, interval: u64) -> bool {
        self.insert_count > 0 && self.insert_count % interval == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_insert_averages() {
        let mut stats = CacheStats::new();
        stats.record_insert(Duration::from_nanos(100));
        stats.record_insert(Duration::from_nanos(300));

        assert_eq!(stats.insert_count, 2);
        assert_eq!(stats.avg_insert_duration_ns, 200);
        assert_eq!(stats.last_insert_duration, Duration::from_nanos(300));
    }

    #[test]
    fn test_should_log_interval() {
        let mut stats = CacheStats::new();
        assert!(!stats.should_log(10));

        for _ in 0..10 {
            stats.record_insert(Duration::from_nanos(1));
        }
        assert!(stats.should_log(10));

        stats.record_insert(Duration::from_nanos(1));
        assert!(!stats.should_log(10));
    }
}
