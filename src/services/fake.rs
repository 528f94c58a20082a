//! In-memory `ResourceApi` for tests.
//!
//! A language or station that was not registered answers like a failing
//! upstream (non-2xx status).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{Location, Station};
use crate::services::ResourceApi;

#[derive(Default)]
pub(crate) struct FakeResourceApi {
    locations: HashMap<String, Vec<Location>>,
    stations: HashMap<(i64, String), Station>,
    station_calls: AtomicUsize,
}

impl FakeResourceApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_locations(mut self, language: &str, locations: Vec<Location>) -> Self {
        self.locations.insert(language.to_string(), locations);
        self
    }

    pub(crate) fn with_station(mut self, language: &str, station: Station) -> Self {
        self.stations
            .insert((station.station_id, language.to_string()), station);
        self
    }

    pub(crate) fn station_calls(&self) -> usize {
        self.station_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceApi for FakeResourceApi {
    async fn locations(&self, language: &str) -> Result<Vec<Location>> {
        self.locations
            .get(language)
            .cloned()
            .ok_or_else(|| AppError::Status {
                url: format!("fake://resources/locations?languageID={language}"),
                status: 500,
            })
    }

    async fn station(&self, station_id: i64, language: &str) -> Result<Station> {
        self.station_calls.fetch_add(1, Ordering::SeqCst);
        self.stations
            .get(&(station_id, language.to_string()))
            .cloned()
            .ok_or_else(|| AppError::Status {
                url: format!(
                    "fake://resources/station?languageID={language}&stationID={station_id}"
                ),
                status: 404,
            })
    }
}

/// Location as the API returns it.
pub(crate) fn location(id: i64, name: &str, station_ids: &[i64]) -> Location {
    let stations: Vec<_> = station_ids
        .iter()
        .map(|id| json!({"stationID": id, "type": 1}))
        .collect();
    serde_json::from_value(json!({"locationID": id, "name": name, "stations": stations}))
        .expect("valid location fixture")
}

/// Station as the API returns it.
pub(crate) fn station(id: i64, name: &str, address: &str) -> Station {
    serde_json::from_value(json!({
        "stationID": id,
        "name": name,
        "address": address,
        "latitude": 46.5,
        "longitude": 11.35,
        "type": 1,
        "state": 1,
        "countFreePlacesAvailable": 4,
        "totalPlaces": 10,
        "places": [{"position": 1, "state": 0, "level": 0, "type": 1}]
    }))
    .expect("valid station fixture")
}
