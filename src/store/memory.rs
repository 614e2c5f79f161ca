use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{RecordKey, Store};

/// Volatile store, used by tests and embedders that persist elsewhere
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<RecordKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: RecordKey) -> bool {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&key)
    }
}

impl Store for MemoryStore {
    fn read(&self, key: RecordKey) -> Result<Option<String>> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(&key).cloned())
    }

    fn write(&self, key: RecordKey, contents: &str) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(key, contents.to_string());
        Ok(())
    }

    fn remove(&self, key: RecordKey) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.remove(&key);
        Ok(())
    }
}
