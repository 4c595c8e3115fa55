//! Timer-driven notifications
//!
//! Toasts, the export prompt and the playback indicator each own a single
//! timer slot. Showing again supersedes whatever was scheduled before, and
//! dropping a handle aborts its outstanding timer. State is published through
//! `tokio::sync::watch` so a presenter can subscribe instead of polling.

mod timer;
mod toast;
mod tts;


pub use toast::{ExportPrompt, NotificationState, Toast};
pub use tts::{MIN_TICK, PLAYBACK_COMPLETE, TtsPlayback, TtsState};
