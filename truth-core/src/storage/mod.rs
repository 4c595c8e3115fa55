//! Durable key/value store adapter
//!
//! A synchronous, string-keyed store of serialized text blobs. Reads and writes
//! block the caller and are never retried: a failure is returned immediately and
//! each caller decides whether to fall back to a default.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Key holding the serialized history collection
pub const HISTORY_KEY: &str = "TRUTH_ENGINE_LOCAL_HISTORY";

/// Key holding the serialized session collection
pub const SESSION_KEY: &str = "TRUTH_ENGINE_CURRENT_SESSION";

/// Key holding the active theme name
pub const THEME_KEY: &str = "theme";

/// Key holding the active model identifier
pub const MODEL_KEY: &str = "truth-model";

/// Trait for durable store backends
pub trait KeyValueStore: Send + Sync {
    /// Read the blob stored under `key`, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the blob stored under `key`
    fn write(&self, key: &str, value: &str) -> Result<()>;
}

/// Read a JSON array blob record by record.
///
/// An absent, unreadable or non-array blob yields an empty collection. Records
/// that fail to deserialize are dropped individually, so one bad record never
/// costs the rest of the collection.
pub(crate) fn load_json_records<T>(store: &dyn KeyValueStore, key: &str) -> Vec<T>
where
    T: serde::de::DeserializeOwned,
{
    let raw = match store.read(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Durable store read failed, using empty default");
            return Vec::new();
        }
    };

    let records: Vec<serde_json::Value> = match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Malformed blob in durable store, using empty default");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = key, index, error = %e, "Dropping unreadable record");
                None
            }
        })
        .collect()
}

/// Serialize `value` as JSON and write it under `key`.
pub(crate) fn save_json<T>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()>
where
    T: serde::Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.write(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_records_absent_key() {
        let store = MemoryStore::new();
        let value: Vec<String> = load_json_records(&store, HISTORY_KEY);
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_records_malformed() {
        let store = MemoryStore::new();
        store.write(HISTORY_KEY, "{not json").unwrap();
        let value: Vec<String> = load_json_records(&store, HISTORY_KEY);
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_records_drops_only_bad_elements() {
        let store = MemoryStore::new();
        store.write(HISTORY_KEY, r#"["a", 7, "b", null]"#).unwrap();
        let value: Vec<String> = load_json_records(&store, HISTORY_KEY);
        assert_eq!(value, vec!["a", "b"]);
    }

    #[test]
    fn test_save_then_load() {
        let store = MemoryStore::new();
        save_json(&store, SESSION_KEY, &vec!["a".to_string(), "b".to_string()]).unwrap();
        let value: Vec<String> = load_json_records(&store, SESSION_KEY);
        assert_eq!(value, vec!["a", "b"]);
    }
}
