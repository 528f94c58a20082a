//! In-process document store.
//!
//! Keeps every inserted batch in memory. Used for dry runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::storage::BulkWriter;

/// Document store that records batches per collection.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    batches: Mutex<HashMap<String, Vec<Vec<Value>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches inserted into a collection, in insertion order.
    pub fn batches(&self, collection: &str) -> Vec<Vec<Value>> {
        self.lock().get(collection).cloned().unwrap_or_default()
    }

    /// Sizes of the inserted batches.
    pub fn batch_sizes(&self, collection: &str) -> Vec<usize> {
        self.batches(collection).iter().map(Vec::len).collect()
    }

    pub fn batch_count(&self, collection: &str) -> usize {
        self.lock().get(collection).map_or(0, Vec::len)
    }

    /// All documents of a collection, flattened.
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.batches(collection).into_iter().flatten().collect()
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.lock()
            .get(collection)
            .map_or(0, |batches| batches.iter().map(Vec::len).sum())
    }

    /// Names of every collection written to, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Vec<Value>>>> {
        // A poisoned map still holds every completed insert.
        self.batches.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BulkWriter for MemoryStorage {
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize> {
        let count = documents.len();
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .push(documents);
        Ok(count)
    }
}
