//! Persistence seam for lifetime progress
//!
//! The core never touches disk or browser storage. Whoever embeds it supplies a
//! `ProgressStore`; `MemoryStore` keeps the encoded JSON in memory for tests
//! and headless runs.

use thiserror::Error;

use crate::progress::SavedProgress;

/// Errors raised by a progress store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode or decode progress: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Storage collaborator for lifetime progress
pub trait ProgressStore {
    /// Load saved progress; an empty store yields the defaults
    fn load(&self) -> Result<SavedProgress, StoreError>;

    fn save(&mut self, progress: &SavedProgress) -> Result<(), StoreError>;
}

/// In-memory store holding the JSON encoding
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    encoded: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing JSON document
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            encoded: Some(json.into()),
        }
    }

    /// Raw JSON of the last save
    pub fn as_json(&self) -> Option<&str> {
        self.encoded.as_deref()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<SavedProgress, StoreError> {
        match &self.encoded {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(SavedProgress::default()),
        }
    }

    fn save(&mut self, progress: &SavedProgress) -> Result<(), StoreError> {
        self.encoded = Some(serde_json::to_string(progress)?);
        log::debug!("saved progress ({} achievements)", progress.unlocked_ids.len());
        Ok(())
    }
}
