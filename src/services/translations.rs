// src/services/translations.rs

//! Merging of per-language fetches into multilingual records.
//!
//! The record fetched in the default language is canonical. Records fetched
//! in other languages only contribute their translated strings. Entity ids
//! are trusted: a translation is attached to whatever canonical record has
//! the same id.

use std::collections::HashMap;
use std::hash::Hash;

use crate::models::{Location, Station};

/// A record carrying per-language translation maps.
pub trait Translatable {
    /// Reset the translation maps to the record's own default-language strings.
    fn seed_translations(&mut self, language: &str);

    /// Record the strings of `translated` under `language`.
    ///
    /// Overwrites an existing entry for the same language.
    fn merge_translation(&mut self, language: &str, translated: &Self);
}

impl Translatable for Location {
    fn seed_translations(&mut self, language: &str) {
        self.translated_names.clear();
        self.translated_names
            .insert(language.to_string(), self.name.clone());
    }

    fn merge_translation(&mut self, language: &str, translated: &Self) {
        self.translated_names
            .insert(language.to_string(), translated.name.clone());
    }
}

impl Translatable for Station {
    fn seed_translations(&mut self, language: &str) {
        self.translated_names.clear();
        self.addresses.clear();
        self.translated_names
            .insert(language.to_string(), self.name.clone());
        self.addresses
            .insert(language.to_string(), self.address.clone());
    }

    fn merge_translation(&mut self, language: &str, translated: &Self) {
        self.translated_names
            .insert(language.to_string(), translated.name.clone());
        self.addresses
            .insert(language.to_string(), translated.address.clone());
    }
}

/// Merge a translated result set into canonical records keyed by id.
///
/// Translated records without a canonical counterpart are ignored.
/// Returns how many translated records were merged.
pub fn merge_by_id<K, T, F>(
    canonical: &mut HashMap<K, T>,
    language: &str,
    translated: &[T],
    key: F,
) -> usize
where
    K: Eq + Hash,
    T: Translatable,
    F: Fn(&T) -> K,
{
    let mut merged = 0;
    for record in translated {
        if let Some(target) = canonical.get_mut(&key(record)) {
            target.merge_translation(language, record);
            merged += 1;
        }
    }
    merged
}
