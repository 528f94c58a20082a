//! Pipeline entry points for collection runs.
//!
//! - `Collector`: one end-to-end run (locations, then stations)
//! - `BatchAggregator`: size- and time-bounded station writes
//! - `Scheduler`: cron-driven repetition of runs

pub mod batch;
pub mod collect;
pub mod scheduler;

pub use batch::{BatchAggregator, BatchStats};
pub use collect::{Collector, CollectorSettings, RunReport};
pub use scheduler::Scheduler;
