//! Conversation records
//!
//! Two persisted collections share this module:
//!
//! - [`HistoryStore`]: bounded (100 entries) long-term history, kept across chats
//! - [`SessionBuffer`]: the active conversation, used to build follow-up context
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use truth_core::conversation::{HistoryStore, SessionBuffer};
//! use truth_core::storage::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut history = HistoryStore::load(store.clone());
//! let mut session = SessionBuffer::load(store);
//!
//! history.append("2+2?", "4", "m1").unwrap();
//! session.append("2+2?", "4", "m1").unwrap();
//!
//! assert_eq!(session.context_window(5), "User: 2+2?\nAI: 4");
//! ```

mod history;
mod session;

pub use history::{
    HISTORY_CAPACITY, HistoryEntry, HistoryStore, ImportCandidate, MergeSummary, SOURCE_IMPORT,
    SOURCE_LOCAL, UNKNOWN_MODEL,
};
pub use session::{DEFAULT_CONTEXT_WINDOW, SessionBuffer, SessionEntry};
