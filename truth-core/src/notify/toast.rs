//! Toast notifications and the export prompt

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::timer::DismissTimer;

/// What a toast presenter should render
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotificationState {
    pub message: String,
    pub visible: bool,
}

/// Single-slot toast with auto-dismiss.
///
/// A new toast replaces the current one and restarts the dismissal clock.
pub struct Toast {
    state: Arc<watch::Sender<NotificationState>>,
    timer: DismissTimer,
    default_duration: Duration,
}

impl Toast {
    /// Create a hidden toast whose `show` lasts `default_duration`
    pub fn new(default_duration: Duration) -> Self {
        let (state, _) = watch::channel(NotificationState::default());
        Self {
            state: Arc::new(state),
            timer: DismissTimer::new(),
            default_duration,
        }
    }

    /// Show `message` for the default duration
    pub fn show(&self, message: impl Into<String>) {
        self.show_for(message, self.default_duration);
    }

    /// Show `message` for `duration`
    pub fn show_for(&self, message: impl Into<String>, duration: Duration) {
        let message = message.into();
        tracing::debug!(toast = %message, "Showing toast");

        let state = self.state.clone();
        let expired = self.state.clone();
        self.timer.restart(
            duration,
            move || {
                state.send_replace(NotificationState {
                    message,
                    visible: true,
                });
            },
            move || {
                expired.send_replace(NotificationState::default());
            },
        );
    }

    /// Hide immediately, cancelling the pending dismissal
    pub fn hide(&self) {
        self.timer.cancel(|| {
            self.state.send_replace(NotificationState::default());
        });
    }

    /// Current state
    pub fn state(&self) -> NotificationState {
        self.state.borrow().clone()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<NotificationState> {
        self.state.subscribe()
    }

    /// Whether a dismissal is scheduled
    pub fn is_dismissal_pending(&self) -> bool {
        self.timer.is_pending()
    }
}

/// Auto-dismissing "export your history" prompt
pub struct ExportPrompt {
    visible: Arc<watch::Sender<bool>>,
    timer: DismissTimer,
    duration: Duration,
}

impl ExportPrompt {
    /// Create a hidden prompt that stays up for `duration` once shown
    pub fn new(duration: Duration) -> Self {
        let (visible, _) = watch::channel(false);
        Self {
            visible: Arc::new(visible),
            timer: DismissTimer::new(),
            duration,
        }
    }

    /// Show the prompt, restarting its dismissal clock
    pub fn show(&self) {
        let visible = self.visible.clone();
        let expired = self.visible.clone();
        self.timer.restart(
            self.duration,
            move || {
                visible.send_replace(true);
            },
            move || {
                expired.send_replace(false);
                tracing::debug!("Export prompt expired");
            },
        );
    }

    /// Hide the prompt now
    pub fn dismiss(&self) {
        self.timer.cancel(|| {
            self.visible.send_replace(false);
        });
    }

    /// Whether the prompt is showing
    pub fn is_visible(&self) -> bool {
        *self.visible.borrow()
    }

    /// Watch visibility changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.visible.subscribe()
    }
}
