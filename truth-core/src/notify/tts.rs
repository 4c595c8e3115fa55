//! Simulated text-to-speech playback progress

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Progress ceiling
pub const PLAYBACK_COMPLETE: u8 = 100;

/// Shortest accepted tick period
pub const MIN_TICK: Duration = Duration::from_millis(1);

/// Playback snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TtsState {
    /// 0..=100
    pub progress: u8,
    pub playing: bool,
}

/// Ticking playback indicator.
///
/// `start` runs a schedule that raises progress by `step` every `tick` until it
/// reaches [`PLAYBACK_COMPLETE`]. The schedule is owned by a cancellation token;
/// once cancelled, a tick that is already in flight will not touch the state.
pub struct TtsPlayback {
    state: Arc<watch::Sender<TtsState>>,
    schedule: Mutex<Option<CancellationToken>>,
    tick: Duration,
    step: u8,
}

impl TtsPlayback {
    pub fn new(tick: Duration, step: u8) -> Self {
        let (state, _) = watch::channel(TtsState::default());
        Self {
            state: Arc::new(state),
            schedule: Mutex::new(None),
            tick: tick.max(MIN_TICK),
            step: step.max(1),
        }
    }

    /// Restart playback of `text` from zero
    pub fn start(&self, text: &str) {
        let token = CancellationToken::new();
        if let Some(previous) = self.swap_schedule(Some(token.clone())) {
            previous.cancel();
        }

        self.state.send_replace(TtsState {
            progress: 0,
            playing: true,
        });
        tracing::debug!(chars = text.chars().count(), "Playback started");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No Tokio runtime available, playback will not advance");
            return;
        };

        let state = self.state.clone();
        let (tick, step) = (self.tick, self.step);
        runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if advance(&state, &token, step) {
                            tracing::debug!("Playback finished");
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Stop playback, keeping the progress reached so far
    pub fn stop(&self) {
        if let Some(token) = self.swap_schedule(None) {
            token.cancel();
        }
        self.state.send_if_modified(|s| {
            let was_playing = s.playing;
            s.playing = false;
            was_playing
        });
    }

    /// The hosting view went away
    pub fn close(&self) {
        self.stop();
        tracing::debug!("Playback view closed");
    }

    pub fn state(&self) -> TtsState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TtsState> {
        self.state.subscribe()
    }

    fn swap_schedule(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut schedule = self.schedule.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *schedule, next)
    }
}

impl Drop for TtsPlayback {
    fn drop(&mut self) {
        if let Some(token) = self.swap_schedule(None) {
            token.cancel();
        }
    }
}

/// Apply one tick; returns true once playback is complete
fn advance(state: &watch::Sender<TtsState>, token: &CancellationToken, step: u8) -> bool {
    let mut finished = false;
    state.send_if_modified(|s| {
        // checked under the channel lock so a concurrent stop wins
        if token.is_cancelled() || !s.playing {
            finished = true;
            return false;
        }
        s.progress = s.progress.saturating_add(step).min(PLAYBACK_COMPLETE);
        if s.progress >= PLAYBACK_COMPLETE {
            s.playing = false;
            finished = true;
        }
        true
    });
    finished
}
