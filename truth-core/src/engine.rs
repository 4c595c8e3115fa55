//! Engine facade
//!
//! [`TruthEngine`] wires the collections, the query orchestrator and the
//! notification handles together behind the operations a front end needs.
//! Every user-facing operation reports its outcome through the toast as well
//! as its return value.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::clipboard::{Clipboard, UnavailableClipboard};
use crate::config::TruthConfig;
use crate::conversation::{HistoryEntry, HistoryStore, MergeSummary, SessionBuffer, SessionEntry};
use crate::error::Result;
use crate::notify::{ExportPrompt, NotificationState, Toast, TtsPlayback, TtsState};
use crate::preferences::{PreferenceSnapshot, Preferences};
use crate::query::{Answer, AnswerProvider, QueryOrchestrator, QueryPhase};
use crate::storage::KeyValueStore;
use crate::transfer::{self, ExportDocument};

/// Default toast for a successful copy
pub const COPIED: &str = "Copied!";

/// Toast for a failed copy
pub const COPY_FAILED: &str = "Copy failed.";

/// Toast after starting a new chat
pub const NEW_CHAT_STARTED: &str = "New chat started. Remote context cleared.";

/// Toast after clearing the history
pub const HISTORY_CLEARED: &str = "Local history cleared";

/// Truth Engine application core
pub struct TruthEngine {
    config: TruthConfig,
    history: Arc<Mutex<HistoryStore>>,
    session: Arc<Mutex<SessionBuffer>>,
    preferences: Mutex<Preferences>,
    orchestrator: QueryOrchestrator,
    toast: Arc<Toast>,
    export_prompt: Arc<ExportPrompt>,
    playback: TtsPlayback,
    clipboard: Arc<dyn Clipboard>,
}

impl TruthEngine {
    /// Load persisted state from `store` and assemble the engine.
    ///
    /// Missing or malformed persisted state falls back to empty collections and
    /// the configured preference defaults.
    pub fn initialize(
        config: TruthConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn AnswerProvider>,
    ) -> Self {
        let history = Arc::new(Mutex::new(HistoryStore::load(store.clone())));
        let session = Arc::new(Mutex::new(SessionBuffer::load(store.clone())));
        let preferences = Preferences::load(store, &config.preferences);

        let notifications = &config.notifications;
        let toast = Arc::new(Toast::new(notifications.toast_duration));
        let export_prompt = Arc::new(ExportPrompt::new(notifications.export_prompt_duration));
        let playback = TtsPlayback::new(notifications.tts_tick, notifications.tts_step);

        let orchestrator = QueryOrchestrator::new(
            provider,
            history.clone(),
            session.clone(),
            toast.clone(),
            export_prompt.clone(),
            config.query.context_window,
        );

        tracing::info!(
            theme = preferences.theme(),
            model = preferences.model(),
            "Truth engine initialized"
        );

        Self {
            config,
            history,
            session,
            preferences: Mutex::new(preferences),
            orchestrator,
            toast,
            export_prompt,
            playback,
            clipboard: Arc::new(UnavailableClipboard),
        }
    }

    /// Use `clipboard` for copy operations
    pub fn with_clipboard(mut self, clipboard: Arc<dyn Clipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Ask `query` under the active model
    pub async fn submit_query(&self, query: &str) -> Result<Answer> {
        let model = self.preferences.lock().await.model().to_string();
        self.orchestrator.submit(query, &model).await
    }

    /// Start a new logical conversation; the history is kept
    pub async fn new_chat(&self) -> Result<()> {
        let cleared = self.session.lock().await.clear();
        match cleared {
            Ok(()) => {
                self.toast.show(NEW_CHAT_STARTED);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear session");
                self.toast.show(format!("New chat failed: {}", e.reason()));
                Err(e)
            }
        }
    }

    /// Empty the long-term history
    pub async fn clear_history(&self) -> Result<()> {
        let cleared = self.history.lock().await.clear();
        match cleared {
            Ok(()) => {
                self.toast.show(HISTORY_CLEARED);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to clear history");
                self.toast.show(format!("Clear failed: {}", e.reason()));
                Err(e)
            }
        }
    }

    /// Export the full history
    pub async fn export_history(&self) -> ExportDocument {
        let document = transfer::export(&*self.history.lock().await);
        self.announce_export(&document);
        document
    }

    /// Export the full history into a backup file under `dir`
    pub async fn save_export(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let document = transfer::export(&*self.history.lock().await);
        match document.save(dir) {
            Ok(path) => {
                self.announce_export(&document);
                Ok(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to write export file");
                self.toast.show(format!("Export failed: {}", e.reason()));
                Err(e)
            }
        }
    }

    /// Merge a backup document into the history
    pub async fn import_history(&self, raw: &str) -> Result<MergeSummary> {
        let merged = {
            let mut history = self.history.lock().await;
            transfer::import(raw, &mut history)
        };

        match merged {
            Ok(summary) => {
                tracing::info!(
                    imported = summary.imported,
                    total = summary.total,
                    "History imported"
                );
                self.toast
                    .show(format!("Imported {} conversations", summary.imported));
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Import rejected");
                self.toast.show(format!("Import failed: {}", e.reason()));
                Err(e)
            }
        }
    }

    /// Switch the display theme
    pub async fn set_theme(&self, theme: &str) -> Result<()> {
        let changed = self.preferences.lock().await.set_theme(theme);
        self.announce_preference(changed, "Theme", theme)
    }

    /// Switch the answer-producing model
    pub async fn set_model(&self, model: &str) -> Result<()> {
        let changed = self.preferences.lock().await.set_model(model);
        self.announce_preference(changed, "Model", model)
    }

    /// Copy `text`, toasting `message` (or "Copied!") on success
    pub async fn copy_to_clipboard(&self, text: &str, message: Option<&str>) -> Result<()> {
        match self.clipboard.write_text(text).await {
            Ok(()) => {
                self.toast.show(message.unwrap_or(COPIED));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Clipboard write failed");
                self.toast.show(COPY_FAILED);
                Err(e)
            }
        }
    }

    /// Start simulated playback of `text`
    pub fn start_playback(&self, text: &str) {
        self.playback.start(text);
    }

    /// Stop simulated playback
    pub fn stop_playback(&self) {
        self.playback.stop();
    }

    /// The result view was closed
    pub fn close_view(&self) {
        self.orchestrator.reset();
        self.export_prompt.dismiss();
        self.playback.close();
    }

    /// History entries, newest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.entries().to_vec()
    }

    /// Session turns, newest first
    pub async fn session(&self) -> Vec<SessionEntry> {
        self.session.lock().await.entries().to_vec()
    }

    /// Context that would accompany the next query
    pub async fn context(&self) -> String {
        self.session
            .lock()
            .await
            .context_window(self.config.query.context_window)
    }

    pub async fn preferences(&self) -> PreferenceSnapshot {
        self.preferences.lock().await.snapshot()
    }

    pub fn phase(&self) -> QueryPhase {
        self.orchestrator.phase()
    }

    pub fn notification(&self) -> NotificationState {
        self.toast.state()
    }

    pub fn export_prompt_visible(&self) -> bool {
        self.export_prompt.is_visible()
    }

    pub fn playback(&self) -> TtsState {
        self.playback.state()
    }

    /// Toast handle, for presenters that subscribe to changes
    pub fn toast(&self) -> &Toast {
        &self.toast
    }

    pub fn export_prompt(&self) -> &ExportPrompt {
        &self.export_prompt
    }

    pub fn playback_handle(&self) -> &TtsPlayback {
        &self.playback
    }

    pub fn orchestrator(&self) -> &QueryOrchestrator {
        &self.orchestrator
    }

    pub fn config(&self) -> &TruthConfig {
        &self.config
    }

    fn announce_export(&self, document: &ExportDocument) {
        self.toast.show(format!(
            "Exported {} conversations",
            document.conversations.len()
        ));
    }

    fn announce_preference(&self, changed: Result<()>, label: &str, value: &str) -> Result<()> {
        match changed {
            Ok(()) => {
                self.toast.show(format!("{}: {}", label, value.trim()));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, preference = label, "Failed to change preference");
                self.toast.show(format!("{} change failed: {}", label, e.reason()));
                Err(e)
            }
        }
    }
}
