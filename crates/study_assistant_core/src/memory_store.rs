//! crates/study_assistant_core/src/memory_store.rs
//!
//! A `KeyValueStore` that lives in process memory. Used by tests and by
//! embedders that do not need persistence across restarts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::ports::{KeyValueStore, PortError, PortResult};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<HashMap<String, serde_json::Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> PortResult<Option<serde_json::Value>> {
        let values = self
            .values
            .read()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> PortResult<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
