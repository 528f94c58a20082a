//! Bike station snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One docking position within a station.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Place {
    pub position: i32,
    pub state: i32,
    pub level: i32,
    #[serde(rename = "type")]
    pub kind: i32,
}

/// A bike parking unit with slots and live capacity counts.
///
/// `location_id` and `location_name` are not part of the per-station
/// payload; the worker of the owning location fills them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    #[serde(rename = "stationID")]
    pub station_id: i64,

    #[serde(rename = "locationID", default)]
    pub location_id: i64,

    #[serde(default)]
    pub location_name: String,

    /// Name in the default language
    pub name: String,

    #[serde(default)]
    pub translated_names: BTreeMap<String, String>,

    /// Address in the default language
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub addresses: BTreeMap<String, String>,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    #[serde(rename = "type", default)]
    pub kind: i32,

    #[serde(default)]
    pub state: i32,

    #[serde(rename = "countFreePlacesAvailable_MuscularBikes", default)]
    pub free_places_muscular: i32,

    #[serde(rename = "countFreePlacesAvailable_AssistedBikes", default)]
    pub free_places_assisted: i32,

    #[serde(rename = "countFreePlacesAvailable", default)]
    pub free_places: i32,

    #[serde(default)]
    pub total_places: i32,

    #[serde(default)]
    pub places: Vec<Place>,

    #[serde(default = "Utc::now")]
    pub collected_at: DateTime<Utc>,
}

impl Station {
    /// Attach the owning location and stamp the collection time.
    pub fn assign_location(&mut self, location_id: i64, location_name: &str) {
        self.location_id = location_id;
        self.location_name = location_name.to_string();
        self.collected_at = Utc::now();
    }
}
