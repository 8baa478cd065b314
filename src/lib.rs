//! Conversation event window cache for Murmur.
//!
//! The cache sits between the UI and the persistent event store, serving
//! paginated pages of conversation history, merging real-time pushed
//! events into in-memory windows, and keeping its footprint bounded across
//! many conversations.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ UI                                                             │
//! │ - asks for a conversation's events, scrolls for older pages    │
//! └────────────────────────────────────────────────────────────────┘
//!                               ↕
//! ┌────────────────────────────────────────────────────────────────┐
//! │ WindowCache (this crate)                                       │
//! │ - LRU-bounded ConversationWindows, one per tracked chat        │
//! │ - dedup by id, chronological order by `at`                     │
//! │ - eviction mirrored to the store, best-effort                  │
//! └────────────────────────────────────────────────────────────────┘
//!                               ↕
//! ┌────────────────────────────────────────────────────────────────┐
//! │ EventStore port (implemented by the persistence tier)          │
//! │ - count / page / evict / attachment hash index                 │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache never fails the UI: store outages degrade pagination to
//! whatever is already cached, duplicates are a normal `false` return,
//! and eviction notifications are fire-and-forget.

mod attachments;
mod cache;
mod event;
mod shared;
mod store;
mod window;

pub use attachments::{AttachmentIndex, AttachmentRef};
pub use cache::{CacheConfig, CacheStats, WindowCache, WindowStats};
pub use event::{event_kind, Event, EventBuilder, Reaction};
pub use shared::{OptionExt, ResultExt};
pub use store::EventStore;
pub use window::ConversationWindow;
