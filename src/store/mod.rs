//! Local key-value persistence for the session, timer and PIN records
//!
//! Each record is stored independently as a JSON document. Reads that fail to
//! parse are reported as [`ControlError::MalformedPersistedState`] so the
//! owning state machine can discard the record and fall back to its default.

mod file;
mod memory;

pub use file::{FileStore, get_data_dir};
pub use memory::MemoryStore;

use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;

use crate::error::ControlError;

/// The three independent persisted records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Session,
    Timer,
    Pin,
}

impl RecordKey {
    pub fn name(self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Timer => "timer",
            Self::Pin => "pin",
        }
    }

    /// Whether the record holds credential material
    pub fn is_secret(self) -> bool {
        matches!(self, Self::Pin)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Persistence port
pub trait Store: Send + Sync {
    /// Read the raw contents of a record, if present
    fn read(&self, key: RecordKey) -> Result<Option<String>>;

    /// Replace the contents of a record
    fn write(&self, key: RecordKey, contents: &str) -> Result<()>;

    /// Delete a record. Deleting a missing record is not an error.
    fn remove(&self, key: RecordKey) -> Result<()>;
}

/// Load and parse a record.
///
/// I/O failures are logged and treated as an absent record.
pub fn load_record<T: DeserializeOwned>(
    store: &dyn Store,
    key: RecordKey,
) -> Result<Option<T>, ControlError> {
    let content = match store.read(key) {
        Ok(Some(content)) => content,
        Ok(None) => return Ok(None),
        Err(e) => {
            tracing::warn!("Failed to read {} record: {:#}", key, e);
            return Ok(None);
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ControlError::MalformedPersistedState {
            record: key,
            reason: e.to_string(),
        })
}

/// Serialize and write a record. Failures are logged, never propagated.
pub fn save_record<T: Serialize>(store: &dyn Store, key: RecordKey, value: &T) {
    let content = match serde_json::to_string(value) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to serialize {} record: {}", key, e);
            return;
        }
    };

    if let Err(e) = store.write(key, &content) {
        tracing::warn!("Failed to persist {} record: {:#}", key, e);
    }
}

/// Delete a record. Failures are logged, never propagated.
pub fn clear_record(store: &dyn Store, key: RecordKey) {
    if let Err(e) = store.remove(key) {
        tracing::warn!("Failed to delete {} record: {:#}", key, e);
    }
}

/// Load a record, discarding it from the store when it cannot be parsed
pub fn load_or_discard<T: DeserializeOwned>(store: &dyn Store, key: RecordKey) -> Option<T> {
    match load_record(store, key) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("{}", e);
            clear_record(store, key);
            None
        }
    }
}
