//! Displayable event types.
//!
//! This module contains:
//! - Event, Reaction structs
//! - Event kind constants
//! - EventBuilder for constructing events fluently
//!
//! An Event is a *materialized view*: the persistence tier has already
//! composed the raw protocol record into a displayable unit (reactions
//! attached, edits applied) before it ever reaches the cache. The cache
//! treats the payload as opaque and only ever looks at `id` and `at`.

use serde::{Deserialize, Serialize};

/// Event kinds used in Murmur
///
/// The cache itself never branches on kind - windows hold messages, file
/// posts, payment records and system notices side by side. Unknown kinds
/// are cached like any other event, not dropped.
pub mod event_kind {
    /// Plain text message
    pub const TEXT_MESSAGE: u16 = 1;
    /// File attachment post (image, voice note, arbitrary file)
    pub const FILE_ATTACHMENT: u16 = 2;
    /// In-chat payment record
    pub const PAYMENT_RECORD: u16 = 3;
    /// System notice (member joined/left, etc.)
    pub const SYSTEM_NOTICE: u16 = 4;
    /// Emoji reaction delivered as a standalone event
    pub const REACTION: u16 = 5;
}

/// A displayable conversation event
///
/// Immutable once cached, with one exception: the `reactions` list supports
/// in-place appends so that frequent small reaction updates never force a
/// full re-fetch of the event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Event ID, globally unique within a conversation
    pub id: String,

    /// Sort key: Unix-millisecond timestamp. Monotonic per conversation
    /// in the common case, but not necessarily unique.
    pub at: u64,

    /// Event kind (1=text, 2=file, 3=payment, ...)
    pub kind: u16,

    /// Display payload, opaque to the cache
    ///
    /// The persistence tier materializes this (rendered content, attachment
    /// descriptors, sender info); the cache stores and returns it untouched.
    pub payload: serde_json::Value,

    /// Reactions attached to this event
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Event {
    /// Create a new Event with required fields
    pub fn new(id: String, kind: u16, at: u64, payload: serde_json::Value) -> Self {
        Self {
            id,
            at,
            kind,
            payload,
            reactions: Vec::new(),
        }
    }

    /// Check if this is a content-bearing message event (text or file)
    pub fn is_message(&self) -> bool {
        self.kind == event_kind::TEXT_MESSAGE || self.kind == event_kind::FILE_ATTACHMENT
    }

    /// Check if this is a reaction event
    pub fn is_reaction(&self) -> bool {
        self.kind == event_kind::REACTION
    }

    /// Check if this is a known event kind
    pub fn is_known_kind(&self) -> bool {
        matches!(
            self.kind,
            event_kind::TEXT_MESSAGE
                | event_kind::FILE_ATTACHMENT
                | event_kind::PAYMENT_RECORD
                | event_kind::SYSTEM_NOTICE
                | event_kind::REACTION
        )
    }

    /// Add a Reaction - if it was not already added
    pub fn add_reaction(&mut self, reaction: Reaction) -> bool {
        // Make sure we don't add the same reaction twice
        if !self.reactions.iter().any(|r| r.id == reaction.id) {
            self.reactions.push(reaction);
            true
        } else {
            // Reaction was already added previously
            false
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Reaction {
    pub id: String,
    /// The ID of the event being reacted to
    pub reference_id: String,
    /// The ID of the author
    pub author_id: String,
    /// The emoji of the reaction
    pub emoji: String,
}

/// Builder for creating an Event
#[derive(Debug, Default)]
pub struct EventBuilder {
    id: String,
    at: u64,
    kind: u16,
    payload: serde_json::Value,
    reactions: Vec<Reaction>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn at(mut self, at: u64) -> Self {
        self.at = at;
        self
    }

    pub fn kind(mut self, kind: u16) -> Self {
        self.kind = kind;
        self
    }

    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn reactions(mut self, reactions: Vec<Reaction>) -> Self {
        self.reactions = reactions;
        self
    }

    pub fn build(self) -> Event {
        Event {
            id: self.id,
            at: self.at,
            kind: self.kind,
            payload: self.payload,
            reactions: self.reactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_new() {
        let event = Event::new(
            "abc123".to_string(),
            event_kind::TEXT_MESSAGE,
            1234567890000,
            serde_json::json!({"content": "Hello world"}),
        );

        assert_eq!(event.id, "abc123");
        assert_eq!(event.kind, 1);
        assert!(event.is_message());
        assert!(!event.is_reaction());
        assert!(event.is_known_kind());
        assert!(event.reactions.is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        let event = Event::new(
            "abc123".to_string(),
            65535, // Unknown kind (max u16 value)
            1234567890000,
            serde_json::Value::Null,
        );

        assert!(!event.is_message());
        assert!(!event.is_reaction());
        assert!(!event.is_known_kind());
    }

    #[test]
    fn test_add_reaction_dedup() {
        let mut event = Event::new(
            "msg1".to_string(),
            event_kind::TEXT_MESSAGE,
            1000,
            serde_json::Value::Null,
        );

        let reaction = Reaction {
            id: "r1".to_string(),
            reference_id: "msg1".to_string(),
            author_id: "alice".to_string(),
            emoji: "👍".to_string(),
        };

        assert!(event.add_reaction(reaction.clone()));
        assert_eq!(event.reactions.len(), 1);

        // Same reaction id again is rejected
        assert!(!event.add_reaction(reaction));
        assert_eq!(event.reactions.len(), 1);
    }

    #[test]
    fn test_builder() {
        let event = EventBuilder::new()
            .id("abc123")
            .kind(event_kind::PAYMENT_RECORD)
            .at(1234567890456)
            .payload(serde_json::json!({"amount": "0.1"}))
            .build();

        assert_eq!(event.id, "abc123");
        assert_eq!(event.at, 1234567890456);
        assert_eq!(event.kind, event_kind::PAYMENT_RECORD);
        assert!(!event.is_message());
    }
}
