//! History export and import
//!
//! Export wraps the full history in a portable [`ExportDocument`]. Import parses a
//! user-supplied document and merges its conversations back into the history,
//! skipping `(query, answer)` pairs that are already present. Imported records
//! never carry their own `id`, `timestamp` or `source`: only `query`, `answer` and
//! `model` are read, the rest is regenerated by the history store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::conversation::{HistoryEntry, HistoryStore, ImportCandidate, MergeSummary};
use crate::error::{Result, TruthError};

pub use crate::conversation::UNKNOWN_MODEL;

/// Version tag written into every export
pub const EXPORT_VERSION: &str = "2.0";

/// Provenance tag written into every export
pub const EXPORT_SOURCE: &str = "truth-engine-local";

/// Portable history backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub source: String,
    pub conversations: Vec<HistoryEntry>,
}

impl ExportDocument {
    /// Snapshot the history as it is right now
    pub fn from_history(history: &HistoryStore) -> Self {
        Self {
            version: EXPORT_VERSION.to_string(),
            exported_at: Utc::now(),
            source: EXPORT_SOURCE.to_string(),
            conversations: history.entries().to_vec(),
        }
    }

    /// Pretty-printed JSON, two-space indented
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `truth-engine-backup-<YYYY-MM-DD>.json`, dated by the export time
    pub fn file_name(&self) -> String {
        format!(
            "truth-engine-backup-{}.json",
            self.exported_at.format("%Y-%m-%d")
        )
    }

    /// Write the document into `dir` under [`Self::file_name`]
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_json()?)?;
        tracing::info!(
            path = %path.display(),
            conversations = self.conversations.len(),
            "History exported"
        );
        Ok(path)
    }
}

/// Export the full history
pub fn export(history: &HistoryStore) -> ExportDocument {
    ExportDocument::from_history(history)
}

/// Parse `raw` into import candidates.
///
/// Fails with [`TruthError::Format`] when `raw` is not JSON, or when its
/// `conversations` field is missing or not an array.
pub fn parse_import(raw: &str) -> Result<Vec<ImportCandidate>> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|e| TruthError::Format(format!("not a JSON document: {}", e)))?;

    let conversations = document
        .get("conversations")
        .and_then(Value::as_array)
        .ok_or_else(|| TruthError::Format("missing conversations array".to_string()))?;

    Ok(conversations.iter().map(candidate_from).collect())
}

/// Parse `raw` and merge its conversations into `history`.
///
/// The history is left untouched when parsing fails.
pub fn import(raw: &str, history: &mut HistoryStore) -> Result<MergeSummary> {
    let candidates = parse_import(raw)?;
    let offered = candidates.len();
    let summary = history.merge_imported(candidates)?;
    tracing::debug!(offered, imported = summary.imported, "Import processed");
    Ok(summary)
}

fn candidate_from(record: &Value) -> ImportCandidate {
    let field = |name: &str| {
        record
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let model = field("model");
    ImportCandidate {
        query: field("query"),
        answer: field("answer"),
        model: if model.is_empty() {
            UNKNOWN_MODEL.to_string()
        } else {
            model
        },
    }
}
