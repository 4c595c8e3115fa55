//! Query orchestration
//!
//! [`QueryOrchestrator::submit`] validates a query, asks the [`AnswerProvider`]
//! for an answer with the session context attached, and records the outcome in
//! the history and session collections. Only one query may be pending at a
//! time.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};

use crate::conversation::{HistoryStore, SessionBuffer};
use crate::error::{Result, TruthError};
use crate::notify::{ExportPrompt, Toast};

/// Toast shown for an empty submission
pub const QUERY_REQUIRED: &str = "Query required.";

/// Toast shown when the provider fails
pub const QUERY_FAILED: &str = "Query failed. Saved locally only.";

/// Toast shown when a second submission arrives while one is pending
pub const QUERY_IN_FLIGHT: &str = "A query is already running.";

/// Toast shown when an outcome could not be persisted
pub const SAVE_FAILED: &str = "Could not save to local history.";

/// What the provider is asked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRequest {
    pub query: String,
    pub model: String,
    /// Rendered session context, empty for a fresh chat
    pub context: String,
}

/// What the provider returns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    pub model: String,
    pub created: DateTime<Utc>,
    pub cached: bool,
}

/// Answer-producing collaborator.
///
/// Implementations wrap whatever actually produces answers (a remote service, a
/// local model). Failures should be reported as [`TruthError::Remote`].
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// Produce an answer for `request`
    async fn answer(&self, request: &AnswerRequest) -> Result<Answer>;

    /// Provider name for logs
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Provider that answers every query with a canned text after a fixed delay
pub struct MockAnswerProvider {
    latency: Duration,
}

impl MockAnswerProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

impl Default for MockAnswerProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl AnswerProvider for MockAnswerProvider {
    async fn answer(&self, request: &AnswerRequest) -> Result<Answer> {
        tokio::time::sleep(self.latency).await;
        Ok(Answer {
            answer: format!(
                "This is a mock response to your query: \"{}\". In a real implementation, this would be the actual AI response.",
                request.query
            ),
            model: request.model.clone(),
            created: Utc::now(),
            cached: false,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Lifecycle of the current query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum QueryPhase {
    #[default]
    Idle,
    Pending {
        query: String,
    },
    Fulfilled(Answer),
    Failed {
        reason: String,
    },
}

impl QueryPhase {
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryPhase::Pending { .. })
    }
}

/// Runs queries and records their outcomes
pub struct QueryOrchestrator {
    provider: Arc<dyn AnswerProvider>,
    history: Arc<Mutex<HistoryStore>>,
    session: Arc<Mutex<SessionBuffer>>,
    toast: Arc<Toast>,
    export_prompt: Arc<ExportPrompt>,
    phase: watch::Sender<QueryPhase>,
    context_window: usize,
}

impl QueryOrchestrator {
    pub fn new(
        provider: Arc<dyn AnswerProvider>,
        history: Arc<Mutex<HistoryStore>>,
        session: Arc<Mutex<SessionBuffer>>,
        toast: Arc<Toast>,
        export_prompt: Arc<ExportPrompt>,
        context_window: usize,
    ) -> Self {
        let (phase, _) = watch::channel(QueryPhase::Idle);
        Self {
            provider,
            history,
            session,
            toast,
            export_prompt,
            phase,
            context_window,
        }
    }

    /// Submit `query` under `model`.
    ///
    /// # Errors
    ///
    /// - [`TruthError::Validation`] for an empty or whitespace-only query
    /// - [`TruthError::QueryInFlight`] while another query is pending
    /// - the provider's error when it fails; the failure is still recorded in
    ///   the history as an `Error: <reason>` entry
    ///
    /// Failing to persist an outcome does not change the result; it is logged
    /// and surfaced as a toast.
    pub async fn submit(&self, query: &str, model: &str) -> Result<Answer> {
        if query.trim().is_empty() {
            self.toast.show(QUERY_REQUIRED);
            return Err(TruthError::Validation("query is empty".to_string()));
        }

        let in_flight = self.claim(query)?;

        let context = self.session.lock().await.context_window(self.context_window);
        let request = AnswerRequest {
            query: query.to_string(),
            model: model.to_string(),
            context,
        };

        tracing::info!(
            provider = self.provider.name(),
            model = %request.model,
            context_chars = request.context.len(),
            "Submitting query"
        );

        let outcome = self.provider.answer(&request).await;

        // the phase is published only once the outcome is recorded
        match outcome {
            Ok(answer) => {
                self.record_answer(&request, &answer).await;
                in_flight.settle(QueryPhase::Fulfilled(answer.clone()));
                self.export_prompt.show();
                Ok(answer)
            }
            Err(e) => {
                let reason = e.reason();
                tracing::warn!(error = %e, model = %request.model, "Query failed");
                self.toast.show(QUERY_FAILED);
                self.record_failure(&request, &reason).await;
                in_flight.settle(QueryPhase::Failed { reason });
                Err(e)
            }
        }
    }

    /// Current phase
    pub fn phase(&self) -> QueryPhase {
        self.phase.borrow().clone()
    }

    /// Watch phase changes
    pub fn subscribe(&self) -> watch::Receiver<QueryPhase> {
        self.phase.subscribe()
    }

    /// Return to `Idle` once the result has been dismissed.
    ///
    /// A pending query is left alone; it settles on its own.
    pub fn reset(&self) {
        self.phase.send_if_modified(|phase| match phase {
            QueryPhase::Pending { .. } | QueryPhase::Idle => false,
            _ => {
                *phase = QueryPhase::Idle;
                true
            }
        });
    }

    fn claim(&self, query: &str) -> Result<InFlight<'_>> {
        let mut claimed = false;
        self.phase.send_if_modified(|phase| {
            if phase.is_pending() {
                return false;
            }
            *phase = QueryPhase::Pending {
                query: query.to_string(),
            };
            claimed = true;
            true
        });

        if !claimed {
            tracing::debug!("Rejected submission while a query is pending");
            self.toast.show(QUERY_IN_FLIGHT);
            return Err(TruthError::QueryInFlight);
        }
        Ok(InFlight {
            phase: &self.phase,
            settled: false,
        })
    }

    /// Both collections are locked before either is written, so a cancelled
    /// submission records the answer in both or in neither.
    async fn record_answer(&self, request: &AnswerRequest, answer: &Answer) {
        let mut history = self.history.lock().await;
        let mut session = self.session.lock().await;

        let saved = history
            .append(&request.query, &answer.answer, &request.model)
            .map(|_| ());
        self.escalate(saved, "history");

        let saved = session
            .append(&request.query, &answer.answer, &request.model)
            .map(|_| ());
        self.escalate(saved, "session");
    }

    async fn record_failure(&self, request: &AnswerRequest, reason: &str) {
        let saved = self
            .history
            .lock()
            .await
            .append(&request.query, format!("Error: {}", reason), &request.model)
            .map(|_| ());
        self.escalate(saved, "history");
    }

    fn escalate(&self, saved: Result<()>, collection: &'static str) {
        if let Err(e) = saved {
            tracing::warn!(error = %e, collection, "Failed to persist query outcome");
            self.toast.show(SAVE_FAILED);
        }
    }
}

/// Returns the phase to `Idle` if a submission is dropped before it settles
struct InFlight<'a> {
    phase: &'a watch::Sender<QueryPhase>,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: QueryPhase) {
        self.phase.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.phase.send_if_modified(|phase| {
            if phase.is_pending() {
                *phase = QueryPhase::Idle;
                true
            } else {
                false
            }
        });
    }
}
