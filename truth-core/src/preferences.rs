//! Persisted display and model preferences
//!
//! Both values are stored as raw strings, not JSON.

use serde::Serialize;
use std::sync::Arc;

use crate::config::PreferenceDefaults;
use crate::error::{Result, TruthError};
use crate::storage::{KeyValueStore, MODEL_KEY, THEME_KEY};

/// Snapshot of the active preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreferenceSnapshot {
    pub theme: String,
    pub model: String,
}

/// Theme and model selection
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
    theme: String,
    model: String,
}

impl Preferences {
    /// Load both preferences, using `defaults` for anything absent or blank
    pub fn load(store: Arc<dyn KeyValueStore>, defaults: &PreferenceDefaults) -> Self {
        let theme = read_or(store.as_ref(), THEME_KEY, &defaults.theme);
        let model = read_or(store.as_ref(), MODEL_KEY, &defaults.model);
        tracing::debug!(theme = %theme, model = %model, "Loaded preferences");
        Self {
            store,
            theme,
            model,
        }
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn snapshot(&self) -> PreferenceSnapshot {
        PreferenceSnapshot {
            theme: self.theme.clone(),
            model: self.model.clone(),
        }
    }

    /// Persist and activate `theme`
    pub fn set_theme(&mut self, theme: &str) -> Result<()> {
        let theme = non_blank(theme, "theme")?;
        self.store.write(THEME_KEY, theme)?;
        self.theme = theme.to_string();
        Ok(())
    }

    /// Persist and activate `model`
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        let model = non_blank(model, "model")?;
        self.store.write(MODEL_KEY, model)?;
        self.model = model.to_string();
        Ok(())
    }
}

fn read_or(store: &dyn KeyValueStore, key: &str, default: &str) -> String {
    match store.read(key) {
        Ok(Some(value)) if !value.trim().is_empty() => value,
        Ok(_) => default.to_string(),
        Err(e) => {
            tracing::warn!(key = key, error = %e, "Preference read failed, using default");
            default.to_string()
        }
    }
}

fn non_blank<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TruthError::Validation(format!("{} must not be blank", what)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_when_absent() {
        let prefs = Preferences::load(Arc::new(MemoryStore::new()), &PreferenceDefaults::default());
        assert_eq!(prefs.theme(), "silvery");
        assert_eq!(prefs.model(), "WORKERS_AI");
    }

    #[test]
    fn test_blank_persisted_value_falls_back() {
        let backend = MemoryStore::new();
        backend.write(THEME_KEY, "  ").unwrap();
        let prefs = Preferences::load(Arc::new(backend), &PreferenceDefaults::default());
        assert_eq!(prefs.theme(), "silvery");
    }

    #[test]
    fn test_changes_persist_as_raw_strings() {
        let backend = MemoryStore::new();
        let mut prefs = Preferences::load(Arc::new(backend.clone()), &PreferenceDefaults::default());

        prefs.set_theme("dark").unwrap();
        prefs.set_model("OPENAI").unwrap();

        assert_eq!(backend.read(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(backend.read(MODEL_KEY).unwrap().as_deref(), Some("OPENAI"));

        let reloaded = Preferences::load(Arc::new(backend), &PreferenceDefaults::default());
        assert_eq!(
            reloaded.snapshot(),
            PreferenceSnapshot {
                theme: "dark".to_string(),
                model: "OPENAI".to_string()
            }
        );
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let backend = MemoryStore::new();
        let mut prefs = Preferences::load(Arc::new(backend.clone()), &PreferenceDefaults::default());
        backend.set_fail_writes(true);

        assert!(prefs.set_theme("dark").is_err());
        assert_eq!(prefs.theme(), "silvery");
    }

    #[test]
    fn test_blank_rejected() {
        let mut prefs = Preferences::load(Arc::new(MemoryStore::new()), &PreferenceDefaults::default());
        assert!(matches!(prefs.set_model(" "), Err(TruthError::Validation(_))));
    }
}
