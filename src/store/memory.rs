//! In-memory config repository

use std::sync::Mutex;

use crate::error::{AppError, AppResult};
use super::{ConfigDocument, ConfigRepository, Fetched};

#[derive(Debug)]
enum Slot {
    Empty,
    Stored(ConfigDocument),
    Corrupt(String),
}

/// Repository that keeps the document in process memory
#[derive(Debug)]
pub struct MemoryRepository {
    slot: Mutex<Slot>,
    saves: Mutex<usize>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            saves: Mutex::new(0),
        }
    }

    pub fn with_document(doc: ConfigDocument) -> Self {
        Self {
            slot: Mutex::new(Slot::Stored(doc)),
            saves: Mutex::new(0),
        }
    }

    /// Make the next fetch report a corrupt document
    pub fn corrupt(&self, reason: impl Into<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Slot::Corrupt(reason.into());
        }
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.saves.lock().map(|n| *n).unwrap_or(0)
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigRepository for MemoryRepository {
    fn fetch(&self) -> AppResult<Fetched> {
        let slot = self
            .slot
            .lock()
            .map_err(|e| AppError::internal(format!("Failed to lock memory repository: {}", e)))?;
        Ok(match &*slot {
            Slot::Empty => Fetched::Missing,
            Slot::Stored(doc) => Fetched::Found(doc.clone()),
            Slot::Corrupt(reason) => Fetched::Corrupt(reason.clone()),
        })
    }

    fn save(&self, doc: &ConfigDocument) -> AppResult<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|e| AppError::internal(format!("Failed to lock memory repository: {}", e)))?;
        *slot = Slot::Stored(doc.clone());
        if let Ok(mut saves) = self.saves.lock() {
            *saves += 1;
        }
        Ok(())
    }
}
