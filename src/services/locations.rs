// src/services/locations.rs

//! Location fetching and translation merging.

use std::collections::HashMap;

use chrono::Utc;

use crate::error::Result;
use crate::models::Location;
use crate::services::ResourceApi;
use crate::services::translations::{Translatable, merge_by_id};

/// Service for building the canonical location set of a run.
pub struct LocationFetcher<'a> {
    api: &'a dyn ResourceApi,
}

impl<'a> LocationFetcher<'a> {
    pub fn new(api: &'a dyn ResourceApi) -> Self {
        Self { api }
    }

    /// Fetch the full location list in one language.
    pub async fn fetch_all(&self, language: &str) -> Result<Vec<Location>> {
        self.api.locations(language).await
    }

    /// Fetch locations in the default language and merge in the names of
    /// every other language.
    ///
    /// Only the default-language fetch can fail the call. A failing
    /// translation is logged and leaves its language out of the maps.
    /// The result has no particular order.
    pub async fn fetch_all_languages(
        &self,
        default_language: &str,
        other_languages: &[String],
    ) -> Result<Vec<Location>> {
        let collected_at = Utc::now();
        let mut by_id: HashMap<i64, Location> = HashMap::new();

        for mut location in self.fetch_all(default_language).await? {
            location.collected_at = collected_at;
            location.seed_translations(default_language);
            by_id.insert(location.location_id, location);
        }

        for language in other_languages {
            if language == default_language {
                continue;
            }

            match self.fetch_all(language).await {
                Ok(translated) => {
                    let merged = merge_by_id(&mut by_id, language, &translated, |l| {
                        l.location_id
                    });
                    log::debug!("Merged {} location names in {}", merged, language);
                }
                Err(e) => {
                    log::warn!("Failed to get locations in {}: {}", language, e);
                }
            }
        }

        Ok(by_id.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::services::fake::{FakeResourceApi, location};

    fn languages(langs: &[&str]) -> Vec<String> {
        langs.iter().map(|l| l.to_string()).collect()
    }

    #[tokio::test]
    async fn test_merges_all_languages() {
        let api = FakeResourceApi::new()
            .with_locations(
                "it",
                vec![
                    location(1, "Stazione", &[10]),
                    location(2, "Centro", &[]),
                ],
            )
            .with_locations(
                "de",
                vec![
                    location(1, "Bahnhof", &[10]),
                    location(2, "Zentrum", &[]),
                ],
            )
            .with_locations("en", vec![location(1, "Station", &[10])]);

        let locations = LocationFetcher::new(&api)
            .fetch_all_languages("it", &languages(&["de", "en"]))
            .await
            .unwrap();

        let by_id: HashMap<i64, &Location> =
            locations.iter().map(|l| (l.location_id, l)).collect();
        assert_eq!(by_id.len(), 2);

        let first = by_id[&1];
        assert_eq!(first.name, "Stazione");
        assert_eq!(first.translated_names["it"], "Stazione");
        assert_eq!(first.translated_names["de"], "Bahnhof");
        assert_eq!(first.translated_names["en"], "Station");

        let second = by_id[&2];
        assert_eq!(second.translated_names.len(), 2);
        assert!(!second.translated_names.contains_key("en"));
    }

    #[tokio::test]
    async fn test_failed_translation_keeps_entities() {
        // "de" is not registered and fails like an upstream error.
        let api = FakeResourceApi::new()
            .with_locations(
                "it",
                vec![
                    location(1, "Stazione", &[]),
                    location(2, "Centro", &[]),
                ],
            )
            .with_locations("en", vec![location(2, "Center", &[])]);

        let locations = LocationFetcher::new(&api)
            .fetch_all_languages("it", &languages(&["de", "en"]))
            .await
            .unwrap();

        assert_eq!(locations.len(), 2);
        for location in &locations {
            assert_eq!(location.translated_names["it"], location.name);
            assert!(!location.translated_names.contains_key("de"));
        }
        let ids: HashSet<i64> = locations.iter().map(|l| l.location_id).collect();
        assert_eq!(ids, HashSet::from([1, 2]));
    }

    #[tokio::test]
    async fn test_default_language_failure_is_fatal() {
        let api = FakeResourceApi::new()
            .with_locations("en", vec![location(1, "Station", &[])]);

        let result = LocationFetcher::new(&api)
            .fetch_all_languages("it", &languages(&["en"]))
            .await;

        assert!(result.unwrap_err().is_fetch());
    }

    #[tokio::test]
    async fn test_shared_timestamp_and_default_skipped() {
        let api = FakeResourceApi::new()
            .with_locations("it", vec![location(1, "Uno", &[]), location(2, "Due", &[])]);

        let locations = LocationFetcher::new(&api)
            .fetch_all_languages("it", &languages(&["it"]))
            .await
            .unwrap();

        assert_eq!(locations[0].collected_at, locations[1].collected_at);
        assert!(locations.iter().all(|l| l.translated_names.len() == 1));
    }
}
