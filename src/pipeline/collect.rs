// src/pipeline/collect.rs

//! One end-to-end collection run.
//!
//! Locations are fetched and persisted first. Then one worker per location
//! fetches that location's stations and pushes them into the batch
//! aggregator, which owns every station write of the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;

use crate::error::Result;
use crate::models::{BatchConfig, Config, Location, Station};
use crate::pipeline::batch::{BatchAggregator, BatchStats};
use crate::services::{LocationFetcher, ResourceApi, StationFetcher};
use crate::storage::{BulkWriter, Collections, insert_records};

/// Settings of a collection run, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    pub default_language: String,
    pub other_languages: Vec<String>,
    pub collections: Collections,
    pub batch: BatchConfig,
    /// Unbounded when `None`
    pub max_concurrent_locations: Option<usize>,
}

impl CollectorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            default_language: config.languages.default.clone(),
            other_languages: config.languages.others(),
            collections: Collections::with_prefix(&config.store.collection_prefix),
            batch: config.batch.clone(),
            max_concurrent_locations: config.collector.max_concurrent_locations,
        }
    }
}

/// Summary of one finished run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub locations: usize,
    pub locations_persisted: bool,
    pub stations_fetched: usize,
    pub station_failures: usize,
    /// Location workers that panicked or were cancelled
    pub failed_locations: usize,
    pub batches: BatchStats,
    pub duration: Duration,
}

#[derive(Debug, Default)]
struct LocationTally {
    fetched: usize,
    failed: usize,
}

/// Runs collections against one API and one store.
pub struct Collector {
    api: Arc<dyn ResourceApi>,
    writer: Arc<dyn BulkWriter>,
    settings: Arc<CollectorSettings>,
}

impl Collector {
    pub fn new(
        api: Arc<dyn ResourceApi>,
        writer: Arc<dyn BulkWriter>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            api,
            writer,
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    /// Execute one collection run.
    ///
    /// Only a failed default-language location fetch fails the run. Every
    /// other failure is logged and counted in the report.
    pub async fn run(&self) -> Result<RunReport> {
        let started = Instant::now();
        let settings = &self.settings;
        log::info!("Starting data collection run");

        let locations = match LocationFetcher::new(self.api.as_ref())
            .fetch_all_languages(&settings.default_language, &settings.other_languages)
            .await
        {
            Ok(locations) => locations,
            Err(e) => {
                log::error!("Error fetching bike locations: {}", e);
                return Err(e);
            }
        };
        log::info!("Found {} bike locations", locations.len());

        let mut report = RunReport {
            locations: locations.len(),
            ..RunReport::default()
        };

        let saved = insert_records(
            self.writer.as_ref(),
            &settings.collections.locations,
            &locations,
        )
        .await;
        match saved {
            Ok(count) => {
                report.locations_persisted = true;
                log::info!(
                    "Saved {} locations to {}",
                    count,
                    settings.collections.locations
                );
            }
            Err(e) => log::error!("Error saving locations: {}", e),
        }

        let (tx, rx) = mpsc::channel(settings.batch.channel_capacity.max(1));
        let aggregator = BatchAggregator::new(
            Arc::clone(&self.writer),
            settings.collections.stations.clone(),
            &settings.batch,
        )
        .spawn(rx);

        let limiter = settings
            .max_concurrent_locations
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));

        let mut workers = JoinSet::new();
        for location in locations {
            let api = Arc::clone(&self.api);
            let settings = Arc::clone(&self.settings);
            let limiter = limiter.clone();
            let tx = tx.clone();

            workers.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => limiter.acquire_owned().await.ok(),
                    None => None,
                };
                collect_location(api.as_ref(), &settings, &location, tx).await
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(tally) => {
                    report.stations_fetched += tally.fetched;
                    report.station_failures += tally.failed;
                }
                Err(e) => {
                    report.failed_locations += 1;
                    log::error!("Location worker failed: {}", e);
                }
            }
        }

        // Closing the last sender lets the aggregator drain and finish.
        drop(tx);
        report.batches = aggregator.await?;
        report.duration = started.elapsed();

        log::info!(
            "Data collection run completed in {:.2?}: {} locations, {} stations fetched, \
             {} failed, {} persisted",
            report.duration,
            report.locations,
            report.stations_fetched,
            report.station_failures,
            report.batches.persisted
        );

        Ok(report)
    }
}

/// Fetch every station of one location and queue it for persistence.
async fn collect_location(
    api: &dyn ResourceApi,
    settings: &CollectorSettings,
    location: &Location,
    tx: mpsc::Sender<Station>,
) -> LocationTally {
    let fetcher = StationFetcher::new(api);
    let mut tally = LocationTally::default();

    for station_ref in &location.station_refs {
        let station_id = station_ref.station_id;
        let fetched = fetcher
            .fetch_one_all_languages(
                station_id,
                &settings.default_language,
                &settings.other_languages,
            )
            .await;

        match fetched {
            Ok(mut station) => {
                station.assign_location(location.location_id, &location.name);
                if tx.send(station).await.is_err() {
                    log::error!(
                        "Station channel closed, stopping location {}",
                        location.location_id
                    );
                    break;
                }
                tally.fetched += 1;
            }
            Err(e) => {
                tally.failed += 1;
                log::warn!(
                    "Error fetching station {} of location {}: {}",
                    station_id,
                    location.location_id,
                    e
                );
            }
        }
    }

    log::debug!(
        "Location {} done: {} stations queued, {} failed",
        location.location_id,
        tally.fetched,
        tally.failed
    );
    tally
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use super::*;
    use crate::error::AppError;
    use crate::services::fake::{FakeResourceApi, location, station};
    use crate::storage::MemoryStorage;

    fn settings(others: &[&str]) -> CollectorSettings {
        CollectorSettings {
            default_language: "it".to_string(),
            other_languages: others.iter().map(|l| l.to_string()).collect(),
            collections: Collections::with_prefix("raw"),
            batch: BatchConfig::default(),
            max_concurrent_locations: None,
        }
    }

    /// Two locations: 1 holds stations 11 and 12, 2 holds station 21.
    fn two_location_api() -> FakeResourceApi {
        let mut api = FakeResourceApi::new()
            .with_locations(
                "it",
                vec![
                    location(1, "Stazione", &[11, 12]),
                    location(2, "Centro", &[21]),
                ],
            )
            .with_locations(
                "de",
                vec![
                    location(1, "Bahnhof", &[11, 12]),
                    location(2, "Zentrum", &[21]),
                ],
            );
        for id in [11, 12, 21] {
            api = api
                .with_station("it", station(id, "Posto", "Via Roma"))
                .with_station("de", station(id, "Platz", "Romstraße"));
        }
        api
    }

    fn field(document: &Value, name: &str) -> i64 {
        document[name].as_i64().unwrap()
    }

    /// Rejects every insert into one collection.
    struct RejectingWriter {
        rejected: String,
        inner: MemoryStorage,
    }

    #[async_trait]
    impl BulkWriter for RejectingWriter {
        async fn insert_many(&self, collection: &str, documents: Vec<Value>) -> Result<usize> {
            if collection == self.rejected {
                return Err(AppError::store(collection, "write refused"));
            }
            self.inner.insert_many(collection, documents).await
        }
    }

    /// Blocks its worker thread on every station call and records how many
    /// calls were in flight at once. Panics on `panic_on`.
    struct InstrumentedApi {
        inner: FakeResourceApi,
        work: Duration,
        panic_on: Option<i64>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl InstrumentedApi {
        fn new(locations: i64, work_ms: u64) -> Self {
            let mut api = FakeResourceApi::new();
            let mut all = Vec::new();
            for id in 1..=locations {
                api = api.with_station("it", station(id * 10, "Posto", "Via"));
                all.push(location(id, "Luogo", &[id * 10]));
            }
            Self {
                inner: api.with_locations("it", all),
                work: Duration::from_millis(work_ms),
                panic_on: None,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResourceApi for InstrumentedApi {
        async fn locations(&self, language: &str) -> Result<Vec<Location>> {
            self.inner.locations(language).await
        }

        async fn station(&self, station_id: i64, language: &str) -> Result<Station> {
            if self.panic_on == Some(station_id) {
                panic!("malformed station {station_id}");
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.work);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner.station(station_id, language).await
        }
    }

    #[tokio::test]
    async fn test_full_run_persists_locations_and_stations() {
        let storage = Arc::new(MemoryStorage::new());
        let collector = Collector::new(
            Arc::new(two_location_api()),
            storage.clone(),
            settings(&["de"]),
        );

        let report = collector.run().await.unwrap();

        assert_eq!(report.locations, 2);
        assert!(report.locations_persisted);
        assert_eq!(report.stations_fetched, 3);
        assert_eq!(report.station_failures, 0);
        assert_eq!(report.batches.persisted, 3);

        let locations = storage.documents("raw_locations");
        assert_eq!(locations.len(), 2);
        assert!(
            locations
                .iter()
                .all(|l| l["translatedLocationNames"]["de"].is_string())
        );

        let stations = storage.documents("raw_stations");
        let owners: HashMap<i64, i64> = stations
            .iter()
            .map(|s| (field(s, "stationID"), field(s, "locationID")))
            .collect();
        assert_eq!(owners, HashMap::from([(11, 1), (12, 1), (21, 2)]));
        assert!(stations.iter().all(|s| s["addresses"]["de"] == "Romstraße"));
        assert!(stations.iter().all(|s| s["collectedAt"].is_string()));
    }

    #[tokio::test]
    async fn test_station_failure_does_not_fail_run() {
        let api = FakeResourceApi::new()
            .with_locations(
                "it",
                vec![
                    location(1, "Stazione", &[11, 12]),
                    location(2, "Centro", &[21]),
                ],
            )
            .with_station("it", station(11, "Uno", "Via Uno"))
            .with_station("it", station(21, "Tre", "Via Tre"));
        let storage = Arc::new(MemoryStorage::new());
        let collector = Collector::new(Arc::new(api), storage.clone(), settings(&[]));

        let report = collector.run().await.unwrap();

        assert_eq!(report.stations_fetched, 2);
        assert_eq!(report.station_failures, 1);
        let ids: HashSet<i64> = storage
            .documents("raw_stations")
            .iter()
            .map(|s| field(s, "stationID"))
            .collect();
        assert_eq!(ids, HashSet::from([11, 21]));
    }

    #[tokio::test]
    async fn test_location_fetch_failure_is_fatal() {
        let api = FakeResourceApi::new()
            .with_locations("de", vec![location(1, "Bahnhof", &[11])]);
        let storage = Arc::new(MemoryStorage::new());
        let collector = Collector::new(Arc::new(api), storage.clone(), settings(&["de"]));

        let err = collector.run().await.unwrap_err();

        assert!(err.is_fetch());
        assert_eq!(storage.document_count("raw_locations"), 0);
        assert_eq!(storage.document_count("raw_stations"), 0);
    }

    #[tokio::test]
    async fn test_location_persistence_failure_still_collects_stations() {
        let writer = Arc::new(RejectingWriter {
            rejected: "raw_locations".to_string(),
            inner: MemoryStorage::new(),
        });
        let collector = Collector::new(
            Arc::new(two_location_api()),
            writer.clone(),
            settings(&["de"]),
        );

        let report = collector.run().await.unwrap();

        assert!(!report.locations_persisted);
        assert_eq!(writer.inner.document_count("raw_stations"), 3);
    }

    #[tokio::test]
    async fn test_bounded_fan_out_collects_everything() {
        let mut api = FakeResourceApi::new();
        let mut all = Vec::new();
        for loc in 1..=3i64 {
            let ids: Vec<i64> = (0..40).map(|i| loc * 100 + i).collect();
            for id in &ids {
                api = api.with_station("it", station(*id, "Posto", "Via"));
            }
            all.push(location(loc, "Luogo", &ids));
        }
        let api = api.with_locations("it", all);

        let storage = Arc::new(MemoryStorage::new());
        let mut bounded = settings(&[]);
        bounded.max_concurrent_locations = Some(1);
        let collector = Collector::new(Arc::new(api), storage.clone(), bounded);

        let report = collector.run().await.unwrap();

        assert_eq!(report.stations_fetched, 120);
        assert_eq!(storage.document_count("raw_stations"), 120);
        let sizes = storage.batch_sizes("raw_stations");
        assert!(sizes.iter().all(|size| *size <= 50));
        assert_eq!(sizes.iter().sum::<usize>(), 120);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_location_workers_run_in_parallel() {
        let api = Arc::new(InstrumentedApi::new(4, 200));
        let storage = Arc::new(MemoryStorage::new());
        let collector = Collector::new(api.clone(), storage.clone(), settings(&[]));

        let started = Instant::now();
        let report = collector.run().await.unwrap();

        assert_eq!(report.stations_fetched, 4);
        assert_eq!(storage.document_count("raw_stations"), 4);
        assert!(api.max_in_flight() >= 2);
        assert!(started.elapsed() < Duration::from_millis(750));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_limit_bounds_workers_in_flight() {
        let api = Arc::new(InstrumentedApi::new(4, 50));
        let storage = Arc::new(MemoryStorage::new());
        let mut bounded = settings(&[]);
        bounded.max_concurrent_locations = Some(1);
        let collector = Collector::new(api.clone(), storage.clone(), bounded);

        let report = collector.run().await.unwrap();

        assert_eq!(report.stations_fetched, 4);
        assert_eq!(api.max_in_flight(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_worker_stays_in_its_location() {
        let mut api = InstrumentedApi::new(3, 0);
        api.panic_on = Some(20);
        let storage = Arc::new(MemoryStorage::new());
        let collector = Collector::new(Arc::new(api), storage.clone(), settings(&[]));

        let report = collector.run().await.unwrap();

        assert_eq!(report.failed_locations, 1);
        assert_eq!(report.stations_fetched, 2);
        let ids: HashSet<i64> = storage
            .documents("raw_stations")
            .iter()
            .map(|s| field(s, "stationID"))
            .collect();
        assert_eq!(ids, HashSet::from([10, 30]));
    }

    #[tokio::test]
    async fn test_location_without_stations() {
        let api = FakeResourceApi::new()
            .with_locations("it", vec![location(5, "Vuoto", &[])]);
        let storage = Arc::new(MemoryStorage::new());
        let collector = Collector::new(Arc::new(api), storage.clone(), settings(&["de"]));

        let report = collector.run().await.unwrap();

        assert_eq!(report.locations, 1);
        assert_eq!(storage.document_count("raw_locations"), 1);
        assert_eq!(storage.batch_count("raw_stations"), 0);
        assert_eq!(report.batches.flushes, 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.languages.additional = vec!["it".into(), "en".into(), "en".into()];
        config.store.collection_prefix = "bikes".into();
        config.collector.max_concurrent_locations = Some(4);

        let settings = CollectorSettings::from_config(&config);

        assert_eq!(settings.default_language, "it");
        assert_eq!(settings.other_languages, vec!["en".to_string()]);
        assert_eq!(settings.collections.stations, "bikes_stations");
        assert_eq!(settings.max_concurrent_locations, Some(4));
    }
}
