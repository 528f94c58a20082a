//! Bike box location snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reference from a location to one of its stations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StationRef {
    #[serde(rename = "stationID")]
    pub station_id: i64,

    /// Station type as reported by the API
    #[serde(rename = "type", default)]
    pub kind: i32,
}

/// A physical site containing one or more bike stations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "locationID")]
    pub location_id: i64,

    /// Name in the default language
    pub name: String,

    /// Language code to name, always holding the default language
    #[serde(rename = "translatedLocationNames", default)]
    pub translated_names: BTreeMap<String, String>,

    /// Stations belonging to this location, in API order
    #[serde(rename = "stations", default)]
    pub station_refs: Vec<StationRef>,

    #[serde(default = "Utc::now")]
    pub collected_at: DateTime<Utc>,
}

impl Location {
    /// Number of stations declared by this location.
    pub fn station_count(&self) -> usize {
        self.station_refs.len()
    }
}
