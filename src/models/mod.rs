// src/models/mod.rs

//! Domain models for the collector.
//!
//! Snapshots of locations and stations as they are fetched and persisted,
//! plus the configuration surface.

mod config;
mod location;
mod station;

// Re-export all public types
pub use config::{
    ApiConfig, BatchConfig, CollectorConfig, Config, LanguageConfig, LoggingConfig,
    ScheduleConfig, StoreConfig,
};
pub use location::{Location, StationRef};
pub use station::{Place, Station};
