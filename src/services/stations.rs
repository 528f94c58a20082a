// src/services/stations.rs

//! Station detail fetching and translation merging.

use crate::error::Result;
use crate::models::Station;
use crate::services::ResourceApi;
use crate::services::translations::Translatable;

/// Service for fetching one canonical station.
pub struct StationFetcher<'a> {
    api: &'a dyn ResourceApi,
}

impl<'a> StationFetcher<'a> {
    pub fn new(api: &'a dyn ResourceApi) -> Self {
        Self { api }
    }

    /// Fetch one station's detail in one language.
    pub async fn fetch_one(&self, station_id: i64, language: &str) -> Result<Station> {
        self.api.station(station_id, language).await
    }

    /// Fetch a station in the default language and merge in the name and
    /// address of every other language, one language at a time.
    ///
    /// The default-language fetch failing fails the station. Translation
    /// failures are logged and skipped.
    pub async fn fetch_one_all_languages(
        &self,
        station_id: i64,
        default_language: &str,
        other_languages: &[String],
    ) -> Result<Station> {
        let mut station = self.fetch_one(station_id, default_language).await?;
        station.seed_translations(default_language);

        for language in other_languages {
            if language == default_language {
                continue;
            }

            match self.fetch_one(station_id, language).await {
                Ok(translated) => station.merge_translation(language, &translated),
                Err(e) => {
                    log::warn!(
                        "Failed to get station {} in {}: {}",
                        station_id,
                        language,
                        e
                    );
                }
            }
        }

        Ok(station)
    }
}
