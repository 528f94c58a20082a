// src/pipeline/batch.rs

//! Size- and time-bounded batching of station snapshots.
//!
//! Decouples the station workers from the document store. A batch is
//! flushed when it reaches the configured size, when the flush interval
//! elapses with stations pending, and once more when the input closes.
//!
//! A failed flush is logged and its stations are dropped. There is no retry
//! and no dead-letter queue: the next scheduled run produces fresh snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::models::{BatchConfig, Station};
use crate::storage::{BulkWriter, insert_records};

/// Counters of one aggregator lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Flush attempts, successful or not
    pub flushes: usize,
    pub failed_flushes: usize,
    /// Stations written to the store
    pub persisted: usize,
    /// Stations lost with a failed flush
    pub dropped: usize,
}

/// Consumes stations from a channel and writes them in batches.
pub struct BatchAggregator {
    writer: Arc<dyn BulkWriter>,
    collection: String,
    batch_size: usize,
    flush_interval: Duration,
}

impl BatchAggregator {
    pub fn new(
        writer: Arc<dyn BulkWriter>,
        collection: impl Into<String>,
        config: &BatchConfig,
    ) -> Self {
        Self {
            writer,
            collection: collection.into(),
            batch_size: config.size.max(1),
            flush_interval: config.flush_interval().max(Duration::from_millis(1)),
        }
    }

    /// Run the aggregator on its own task.
    ///
    /// The handle resolves after the final flush, once every sender of
    /// `receiver` has been dropped.
    pub fn spawn(self, receiver: mpsc::Receiver<Station>) -> JoinHandle<BatchStats> {
        tokio::spawn(self.run(receiver))
    }

    /// Consume `receiver` until it closes, flushing along the way.
    pub async fn run(self, mut receiver: mpsc::Receiver<Station>) -> BatchStats {
        let mut pending: Vec<Station> = Vec::with_capacity(self.batch_size);
        let mut stats = BatchStats::default();

        let first_tick = Instant::now() + self.flush_interval;
        let mut ticker = time::interval_at(first_tick, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = receiver.recv() => match received {
                    Some(station) => {
                        pending.push(station);
                        if pending.len() >= self.batch_size {
                            self.flush(&mut pending, &mut stats).await;
                            ticker.reset();
                        }
                    }
                    None => {
                        if !pending.is_empty() {
                            self.flush(&mut pending, &mut stats).await;
                        }
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if !pending.is_empty() {
                        self.flush(&mut pending, &mut stats).await;
                        ticker.reset();
                    }
                }
            }
        }

        log::debug!(
            "Aggregator for {} finished: {} flushes, {} persisted, {} dropped",
            self.collection,
            stats.flushes,
            stats.persisted,
            stats.dropped
        );
        stats
    }

    async fn flush(&self, pending: &mut Vec<Station>, stats: &mut BatchStats) {
        let batch = std::mem::replace(pending, Vec::with_capacity(self.batch_size));
        stats.flushes += 1;

        match insert_records(self.writer.as_ref(), &self.collection, &batch).await {
            Ok(count) => {
                stats.persisted += count;
                log::info!("Saved {} stations to {}", count, self.collection);
            }
            Err(e) => {
                stats.failed_flushes += 1;
                stats.dropped += batch.len();
                log::error!(
                    "Failed to insert {} stations into {}, batch dropped: {}",
                    batch.len(),
                    self.collection,
                    e
                );
            }
        }
    }
}
