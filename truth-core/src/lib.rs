//! # Truth Engine core
//!
//! Client-side state for the Truth Engine question-answering assistant:
//! - Bounded long-term history (100 entries) kept across chats
//! - Session buffer that supplies follow-up context to the answer provider
//! - Export and deduplicating import of the history
//! - Self-dismissing toasts, an export prompt and simulated playback progress
//! - Persisted theme and model preferences
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use truth_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TruthConfig::load()?;
//!     let store = Arc::new(FileStore::open(&config.storage.data_dir)?);
//!     let provider = Arc::new(MockAnswerProvider::new(config.query.mock_latency));
//!
//!     let engine = TruthEngine::initialize(config, store, provider);
//!     let answer = engine.submit_query("What is 2+2?").await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Storage**: synchronous key/value adapter ([`storage::KeyValueStore`])
//! - **Conversation**: history and session collections, persisted on every change
//! - **Query**: single-flight orchestration around an [`query::AnswerProvider`]
//! - **Notify**: single-slot timers published over `tokio::sync::watch`
//! - **Engine**: facade tying it together for a front end

pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod notify;
pub mod preferences;
pub mod query;
pub mod storage;
pub mod transfer;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clipboard::{Clipboard, MemoryClipboard, UnavailableClipboard};
    pub use crate::config::{
        ConfigBuilder, NotificationConfig, PreferenceDefaults, QueryConfig, StorageConfig,
        TruthConfig,
    };
    pub use crate::conversation::{
        HistoryEntry, HistoryStore, ImportCandidate, MergeSummary, SessionBuffer, SessionEntry,
    };
    pub use crate::engine::TruthEngine;
    pub use crate::error::{Result, TruthError};
    pub use crate::notify::{ExportPrompt, NotificationState, Toast, TtsPlayback, TtsState};
    pub use crate::preferences::{PreferenceSnapshot, Preferences};
    pub use crate::query::{
        Answer, AnswerProvider, AnswerRequest, MockAnswerProvider, QueryOrchestrator, QueryPhase,
    };
    pub use crate::storage::{FileStore, KeyValueStore, MemoryStore};
    pub use crate::transfer::ExportDocument;
}
