//! Storage abstractions for snapshot persistence.
//!
//! Every collection run appends new timestamped documents; nothing is
//! updated or deleted. Two collections are used per prefix:
//!
//! ```text
//! {prefix}_locations    # one document per location per run
//! {prefix}_stations     # one document per station per run
//! ```
//!
//! Downstream readers wanting the latest snapshot should index the entity
//! id and `collectedAt` (descending). The file backend keeps no indexes.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Names of the two snapshot collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collections {
    pub locations: String,
    pub stations: String,
}

impl Collections {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            locations: format!("{prefix}_locations"),
            stations: format!("{prefix}_stations"),
        }
    }
}

/// Bulk insert capability of a document store.
///
/// Implementations must accept concurrent `insert_many` calls.
#[async_trait]
pub trait BulkWriter: Send + Sync {
    /// Insert all documents into `collection`. Returns the inserted count.
    async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize>;

    /// Release the backend. Called once on shutdown.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Serialize records and hand them to the writer in one call.
pub async fn insert_records<T: Serialize>(
    writer: &dyn BulkWriter,
    collection: &str,
    records: &[T],
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let documents = records
        .iter()
        .map(serde_json::to_value)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    writer.insert_many(collection, documents).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        let collections = Collections::with_prefix("raw");
        assert_eq!(collections.locations, "raw_locations");
        assert_eq!(collections.stations, "raw_stations");
    }

    #[tokio::test]
    async fn test_insert_records_skips_empty() {
        let storage = MemoryStorage::new();
        let records: Vec<u32> = Vec::new();

        let inserted = insert_records(&storage, "raw_stations", &records)
            .await
            .unwrap();

        assert_eq!(inserted, 0);
        assert_eq!(storage.batch_count("raw_stations"), 0);
    }

    #[tokio::test]
    async fn test_insert_records_serializes() {
        let storage = MemoryStorage::new();

        insert_records(&storage, "raw_locations", &[1, 2, 3])
            .await
            .unwrap();

        assert_eq!(storage.batch_sizes("raw_locations"), vec![3]);
        assert_eq!(storage.documents("raw_locations")[2], Value::from(3));
    }
}
