//! Long-term History Store
//!
//! Bounded, newest-first collection of answered queries. Every mutation is
//! computed on a copy, persisted, and only then committed, so a failed write
//! leaves the in-memory collection untouched.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::storage::{self, KeyValueStore, HISTORY_KEY};

/// Maximum number of entries kept in the history
pub const HISTORY_CAPACITY: usize = 100;

/// Provenance tag for entries recorded locally
pub const SOURCE_LOCAL: &str = "local";

/// Provenance tag for entries admitted by an import
pub const SOURCE_IMPORT: &str = "import";

/// Model recorded for entries that do not name one
pub const UNKNOWN_MODEL: &str = "unknown";

/// A single answered query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique id derived from the creation time in milliseconds
    pub id: String,
    pub query: String,
    /// Answer text, or an `Error: …` marker for failed calls
    pub answer: String,
    /// Answer-producing mode used
    #[serde(default = "unknown_model")]
    pub model: String,
    /// Seconds since epoch
    #[serde(default)]
    pub timestamp: i64,
    /// Provenance tag
    #[serde(default = "local_source")]
    pub source: String,
}

fn unknown_model() -> String {
    UNKNOWN_MODEL.to_string()
}

fn local_source() -> String {
    SOURCE_LOCAL.to_string()
}

/// Untrusted record offered to [`HistoryStore::merge_imported`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportCandidate {
    pub query: String,
    pub answer: String,
    pub model: String,
}

/// Outcome of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Admitted candidates still present after capacity truncation
    pub imported: usize,
    /// Collection length after the merge
    pub total: usize,
}

/// Bounded long-term record collection
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<HistoryEntry>,
    last_id: i64,
}

impl HistoryStore {
    /// Load the collection from the durable store.
    ///
    /// Absent or malformed content yields an empty history; unreadable records
    /// are dropped one by one.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let mut entries: Vec<HistoryEntry> = storage::load_json_records(store.as_ref(), HISTORY_KEY);
        if entries.len() > HISTORY_CAPACITY {
            tracing::warn!(
                len = entries.len(),
                capacity = HISTORY_CAPACITY,
                "Persisted history exceeds capacity, truncating"
            );
            entries.truncate(HISTORY_CAPACITY);
        }

        let last_id = entries
            .iter()
            .filter_map(|e| e.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        tracing::debug!(len = entries.len(), "Loaded history");
        Self {
            store,
            entries,
            last_id,
        }
    }

    /// Record a new entry at the front of the history
    pub fn append(
        &mut self,
        query: impl Into<String>,
        answer: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<HistoryEntry> {
        let (entry, next_id) = self.new_entry(query.into(), answer.into(), model.into(), SOURCE_LOCAL);

        let mut next = Vec::with_capacity(self.entries.len() + 1);
        next.push(entry.clone());
        next.extend(self.entries.iter().cloned());
        next.truncate(HISTORY_CAPACITY);

        self.commit(next)?;
        self.last_id = next_id;
        tracing::debug!(id = %entry.id, model = %entry.model, "History entry appended");
        Ok(entry)
    }

    /// Remove every entry
    pub fn clear(&mut self) -> Result<()> {
        self.commit(Vec::new())?;
        tracing::info!("History cleared");
        Ok(())
    }

    /// Merge externally supplied records.
    ///
    /// Only candidates with a non-empty query and answer whose `(query, answer)`
    /// pair is absent from the entries present before the call are admitted.
    /// Candidates are not deduplicated against each other.
    pub fn merge_imported<I>(&mut self, candidates: I) -> Result<MergeSummary>
    where
        I: IntoIterator<Item = ImportCandidate>,
    {
        let existing: HashSet<(&str, &str)> = self
            .entries
            .iter()
            .map(|e| (e.query.as_str(), e.answer.as_str()))
            .collect();

        let mut last_id = self.last_id;
        let mut accepted = Vec::new();
        for candidate in candidates {
            if candidate.query.is_empty() || candidate.answer.is_empty() {
                continue;
            }
            if existing.contains(&(candidate.query.as_str(), candidate.answer.as_str())) {
                continue;
            }
            let id = next_id(last_id);
            last_id = id;
            accepted.push(HistoryEntry {
                id: id.to_string(),
                query: candidate.query,
                answer: candidate.answer,
                model: candidate.model,
                timestamp: Utc::now().timestamp(),
                source: SOURCE_IMPORT.to_string(),
            });
        }

        let admitted = accepted.len();
        if admitted == 0 {
            return Ok(MergeSummary {
                imported: 0,
                total: self.entries.len(),
            });
        }

        let mut next = accepted;
        next.extend(self.entries.iter().cloned());
        if next.len() > HISTORY_CAPACITY {
            tracing::warn!(
                dropped = next.len() - HISTORY_CAPACITY,
                "Import overflowed history capacity, oldest entries dropped"
            );
            next.truncate(HISTORY_CAPACITY);
        }

        self.commit(next)?;
        self.last_id = last_id;

        // admitted entries sit at the front, so only the tail of the batch can be cut
        let summary = MergeSummary {
            imported: admitted.min(HISTORY_CAPACITY),
            total: self.entries.len(),
        };
        tracing::info!(imported = summary.imported, total = summary.total, "History merged");
        Ok(summary)
    }

    /// All entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Look up an entry by id
    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn new_entry(
        &self,
        query: String,
        answer: String,
        model: String,
        source: &str,
    ) -> (HistoryEntry, i64) {
        let id = next_id(self.last_id);
        let entry = HistoryEntry {
            id: id.to_string(),
            query,
            answer,
            model,
            timestamp: Utc::now().timestamp(),
            source: source.to_string(),
        };
        (entry, id)
    }

    fn commit(&mut self, next: Vec<HistoryEntry>) -> Result<()> {
        storage::save_json(self.store.as_ref(), HISTORY_KEY, &next)?;
        self.entries = next;
        Ok(())
    }
}

/// Millisecond clock reading, bumped past `last` so ids stay unique.
fn next_id(last: i64) -> i64 {
    Utc::now().timestamp_millis().max(last + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TruthError;
    use crate::storage::MemoryStore;

    fn store() -> (MemoryStore, HistoryStore) {
        let backend = MemoryStore::new();
        let history = HistoryStore::load(Arc::new(backend.clone()));
        (backend, history)
    }

    fn candidate(query: &str, answer: &str) -> ImportCandidate {
        ImportCandidate {
            query: query.to_string(),
            answer: answer.to_string(),
            model: "m1".to_string(),
        }
    }

    #[test]
    fn test_append_newest_first() {
        let (_, mut history) = store();
        history.append("2+2?", "4", "m1").unwrap();
        history.append("capital of France?", "Paris", "m1").unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].query, "capital of France?");
        assert_eq!(history.entries()[1].query, "2+2?");
        assert_eq!(history.entries()[0].source, SOURCE_LOCAL);
    }

    #[test]
    fn test_capacity_bound() {
        let (_, mut history) = store();
        for i in 0..130 {
            history.append(format!("q{}", i), "a", "m1").unwrap();
            assert_eq!(history.len(), (i + 1).min(HISTORY_CAPACITY));
        }
        assert_eq!(history.entries()[0].query, "q129");
        assert_eq!(history.entries()[99].query, "q30");
    }

    #[test]
    fn test_ids_unique_and_increasing() {
        let (_, mut history) = store();
        for i in 0..50 {
            history.append(format!("q{}", i), "a", "m1").unwrap();
        }
        let ids: HashSet<&str> = history.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 50);

        let newest: i64 = history.entries()[0].id.parse().unwrap();
        let oldest: i64 = history.entries()[49].id.parse().unwrap();
        assert!(newest > oldest);
    }

    #[test]
    fn test_persisted_and_reloaded() {
        let (backend, mut history) = store();
        let entry = history.append("2+2?", "4", "m1").unwrap();

        let reloaded = HistoryStore::load(Arc::new(backend));
        assert_eq!(reloaded.entries(), &[entry.clone()]);
        assert_eq!(reloaded.get(&entry.id), Some(&entry));
    }

    #[test]
    fn test_reload_keeps_ids_unique() {
        let (backend, mut history) = store();
        history.append("a", "1", "m1").unwrap();
        let mut reloaded = HistoryStore::load(Arc::new(backend));
        reloaded.append("b", "2", "m1").unwrap();
        assert_ne!(reloaded.entries()[0].id, reloaded.entries()[1].id);
    }

    #[test]
    fn test_malformed_blob_loads_empty() {
        let backend = MemoryStore::new();
        backend.write(HISTORY_KEY, "[{\"query\": 1}]").unwrap();
        let history = HistoryStore::load(Arc::new(backend));
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let (backend, mut history) = store();
        history.append("q", "a", "m1").unwrap();
        history.clear().unwrap();
        assert!(history.is_empty());
        assert_eq!(backend.read(HISTORY_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_failed_write_leaves_collection_unchanged() {
        let (backend, mut history) = store();
        history.append("q1", "a1", "m1").unwrap();
        backend.set_fail_writes(true);

        let err = history.append("q2", "a2", "m1").unwrap_err();
        assert!(matches!(err, TruthError::Storage(_)));
        assert_eq!(history.len(), 1);

        assert!(history.clear().is_err());
        assert_eq!(history.len(), 1);

        assert!(history.merge_imported(vec![candidate("x", "y")]).is_err());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_merge_skips_existing_pairs() {
        let (_, mut history) = store();
        history.append("2+2?", "4", "m1").unwrap();

        let summary = history
            .merge_imported(vec![candidate("2+2?", "4"), candidate("3+3?", "6")])
            .unwrap();
        assert_eq!(summary, MergeSummary { imported: 1, total: 2 });
        assert_eq!(history.entries()[0].query, "3+3?");
        assert_eq!(history.entries()[0].source, SOURCE_IMPORT);
    }

    #[test]
    fn test_merge_same_query_different_answer_is_admitted() {
        let (_, mut history) = store();
        history.append("2+2?", "4", "m1").unwrap();
        let summary = history.merge_imported(vec![candidate("2+2?", "four")]).unwrap();
        assert_eq!(summary.imported, 1);
    }

    #[test]
    fn test_merge_skips_empty_fields() {
        let (_, mut history) = store();
        let summary = history
            .merge_imported(vec![candidate("", "a"), candidate("q", "")])
            .unwrap();
        assert_eq!(summary, MergeSummary { imported: 0, total: 0 });
    }

    #[test]
    fn test_merge_keeps_supplied_order_ahead_of_existing() {
        let (_, mut history) = store();
        history.append("old", "a", "m1").unwrap();
        history
            .merge_imported(vec![candidate("first", "1"), candidate("second", "2")])
            .unwrap();

        let queries: Vec<&str> = history.entries().iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["first", "second", "old"]);
    }

    #[test]
    fn test_merge_admits_in_batch_duplicates() {
        let (_, mut history) = store();
        let summary = history
            .merge_imported(vec![candidate("q", "a"), candidate("q", "a")])
            .unwrap();
        assert_eq!(summary.imported, 2);
        assert_ne!(history.entries()[0].id, history.entries()[1].id);
    }

    #[test]
    fn test_merge_respects_capacity() {
        let (_, mut history) = store();
        for i in 0..90 {
            history.append(format!("q{}", i), "a", "m1").unwrap();
        }
        let batch: Vec<_> = (0..20).map(|i| candidate(&format!("imp{}", i), "b")).collect();
        let summary = history.merge_imported(batch).unwrap();
        assert_eq!(summary, MergeSummary { imported: 20, total: HISTORY_CAPACITY });
        assert_eq!(history.entries()[0].query, "imp0");
    }

    #[test]
    fn test_merge_overflowing_batch_reports_survivors() {
        let (_, mut history) = store();
        let batch: Vec<_> = (0..150).map(|i| candidate(&format!("imp{}", i), "b")).collect();

        let summary = history.merge_imported(batch).unwrap();
        assert_eq!(summary, MergeSummary { imported: HISTORY_CAPACITY, total: HISTORY_CAPACITY });
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.entries()[HISTORY_CAPACITY - 1].query, "imp99");
    }

    #[test]
    fn test_legacy_records_load_with_defaults() {
        let backend = MemoryStore::new();
        backend
            .write(
                HISTORY_KEY,
                r#"[
                    {"id": "3", "query": "no source", "answer": "a", "model": "m1", "timestamp": 30},
                    {"id": "2", "query": "no model", "answer": "b", "timestamp": 20, "source": "import"},
                    {"id": "1", "answer": "no query"}
                ]"#,
            )
            .unwrap();

        let mut history = HistoryStore::load(Arc::new(backend.clone()));
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries()[0].source, SOURCE_LOCAL);
        assert_eq!(history.entries()[1].model, UNKNOWN_MODEL);
        assert_eq!(history.entries()[1].source, SOURCE_IMPORT);

        history.append("new", "c", "m1").unwrap();
        let reloaded = HistoryStore::load(Arc::new(backend));
        let queries: Vec<&str> = reloaded.entries().iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["new", "no source", "no model"]);
    }
}
