//! Service layer for the collector.
//!
//! This module contains the fetch logic for:
//! - Resource API access (`ResourceApi`, `HttpResourceApi`)
//! - Bearer token acquisition (`TokenProvider`)
//! - Translation merging (`Translatable`)
//! - Location lists (`LocationFetcher`)
//! - Station details (`StationFetcher`)

mod api;
mod auth;
#[cfg(test)]
pub(crate) mod fake;
mod locations;
mod stations;
pub mod translations;

pub use api::{HttpResourceApi, ResourceApi};
pub use auth::TokenProvider;
pub use locations::LocationFetcher;
pub use stations::StationFetcher;
pub use translations::Translatable;
