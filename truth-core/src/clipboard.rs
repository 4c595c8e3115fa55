//! Clipboard collaborator

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{Result, TruthError};

/// Somewhere copied text can go
#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard that keeps the last copied text in memory
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    contents: Arc<Mutex<Option<String>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last copied text
    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        *self.contents.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.to_string());
        Ok(())
    }
}

/// Clipboard for environments without one
pub struct UnavailableClipboard;

#[async_trait]
impl Clipboard for UnavailableClipboard {
    async fn write_text(&self, _text: &str) -> Result<()> {
        Err(TruthError::Clipboard(
            "no clipboard available in this environment".to_string(),
        ))
    }
}
