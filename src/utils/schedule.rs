// src/utils/schedule.rs

//! Cron expression helpers.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{AppError, Result};

/// Parse a cron expression.
///
/// Five-field expressions (`min hour dom month dow`) get a leading seconds
/// field of `0`; six- and seven-field expressions are used as given.
pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    let trimmed = expression.trim();
    let normalized = match trimmed.split_whitespace().count() {
        5 => format!("0 {trimmed}"),
        _ => trimmed.to_string(),
    };

    Schedule::from_str(&normalized).map_err(|e| AppError::schedule(expression, e))
}

/// Time from `now` until the next fire time, `None` when the schedule
/// never fires again.
pub fn next_delay(schedule: &Schedule, now: DateTime<Utc>) -> Option<Duration> {
    schedule
        .after(&now)
        .next()
        .map(|next| (next - now).to_std().unwrap_or_default())
}
