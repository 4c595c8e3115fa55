//! Session Buffer
//!
//! Short-term record of the active conversation. It is only bounded by the
//! session lifetime: starting a new chat clears it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::UNKNOWN_MODEL;
use crate::error::Result;
use crate::storage::{self, KeyValueStore, SESSION_KEY};

/// Default number of turns rendered into a context window
pub const DEFAULT_CONTEXT_WINDOW: usize = 5;

/// A turn of the active conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEntry {
    pub query: String,
    pub answer: String,
    #[serde(default = "unknown_model")]
    pub model: String,
    /// Seconds since epoch
    #[serde(default)]
    pub timestamp: i64,
}

fn unknown_model() -> String {
    UNKNOWN_MODEL.to_string()
}

impl SessionEntry {
    fn render(&self) -> String {
        format!("User: {}\nAI: {}", self.query, self.answer)
    }
}

/// Persisted short-term collection, newest first
pub struct SessionBuffer {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<SessionEntry>,
}

impl SessionBuffer {
    /// Load the session from the durable store, empty on absence or corruption.
    /// Unreadable turns are dropped individually.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let entries: Vec<SessionEntry> = storage::load_json_records(store.as_ref(), SESSION_KEY);
        tracing::debug!(len = entries.len(), "Loaded session");
        Self { store, entries }
    }

    /// Record a turn at the front of the session
    pub fn append(
        &mut self,
        query: impl Into<String>,
        answer: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<SessionEntry> {
        let entry = SessionEntry {
            query: query.into(),
            answer: answer.into(),
            model: model.into(),
            timestamp: Utc::now().timestamp(),
        };

        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(entry.clone());
        next.extend(self.entries.iter().cloned());

        self.commit(next)?;
        Ok(entry)
    }

    /// Drop every turn, starting a new logical conversation
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())?;
        tracing::info!("Session cleared");
        Ok(())
    }

    /// Render the newest `limit` turns, oldest first, as prompt context.
    ///
    /// Each turn becomes `"User: <query>\nAI: <answer>"`; turns are separated by a
    /// blank line. An empty session renders as an empty string.
    pub fn context_window(&self, limit: usize) -> String {
        self.entries
            .iter()
            .take(limit)
            .rev()
            .map(SessionEntry::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// All turns, newest first
    pub fn entries(&self) -> &[SessionEntry] {
        &self.entries
    }

    /// Number of turns
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the session is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn commit(&mut self, next: Vec<SessionEntry>) -> Result<()> {
        storage::save_json(self.store.as_ref(), SESSION_KEY, &next)?;
        self.entries = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn buffer() -> (MemoryStore, SessionBuffer) {
        let backend = MemoryStore::new();
        let session = SessionBuffer::load(Arc::new(backend.clone()));
        (backend, session)
    }

    #[test]
    fn test_context_window_example() {
        let (_, mut session) = buffer();
        session.append("2+2?", "4", "m1").unwrap();
        session.append("capital of France?", "Paris", "m1").unwrap();

        assert_eq!(
            session.context_window(DEFAULT_CONTEXT_WINDOW),
            "User: 2+2?\nAI: 4\n\nUser: capital of France?\nAI: Paris"
        );
    }

    #[test]
    fn test_context_window_keeps_most_recent() {
        let (_, mut session) = buffer();
        for i in 1..=7 {
            session.append(format!("q{}", i), format!("a{}", i), "m1").unwrap();
        }

        let expected = (3..=7)
            .map(|i| format!("User: q{}\nAI: a{}", i, i))
            .collect::<Vec<_>>()
            .join("\n\n");
        assert_eq!(session.context_window(5), expected);
        assert_eq!(session.len(), 7);
    }

    #[test]
    fn test_context_window_empty_session() {
        let (_, session) = buffer();
        assert_eq!(session.context_window(5), "");
    }

    #[test]
    fn test_unbounded() {
        let (_, mut session) = buffer();
        for i in 0..150 {
            session.append(format!("q{}", i), "a", "m1").unwrap();
        }
        assert_eq!(session.len(), 150);
        assert_eq!(session.entries()[0].query, "q149");
    }

    #[test]
    fn test_persisted_and_cleared() {
        let (backend, mut session) = buffer();
        session.append("q", "a", "m1").unwrap();

        let reloaded = SessionBuffer::load(Arc::new(backend.clone()));
        assert_eq!(reloaded.len(), 1);

        session.clear().unwrap();
        assert!(session.is_empty());
        assert_eq!(backend.read(SESSION_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_legacy_turns_load_with_defaults() {
        let backend = MemoryStore::new();
        backend
            .write(
                SESSION_KEY,
                r#"[{"query": "q2", "answer": "a2"}, {"query": 5}, {"query": "q1", "answer": "a1", "model": "m1", "timestamp": 10}]"#,
            )
            .unwrap();

        let session = SessionBuffer::load(Arc::new(backend));
        assert_eq!(session.len(), 2);
        assert_eq!(session.entries()[0].model, UNKNOWN_MODEL);
        assert_eq!(session.context_window(5), "User: q1\nAI: a1\n\nUser: q2\nAI: a2");
    }

    #[test]
    fn test_failed_write_leaves_session_unchanged() {
        let (backend, mut session) = buffer();
        session.append("q", "a", "m1").unwrap();
        backend.set_fail_writes(true);

        assert!(session.append("q2", "a2", "m1").is_err());
        assert!(session.clear().is_err());
        assert_eq!(session.len(), 1);
    }
}
