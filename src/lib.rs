// src/lib.rs

//! Bike box collector library
//!
//! Periodically snapshots bike box locations and their stations from the
//! resource API into an append-only document store.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
