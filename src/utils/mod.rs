// src/utils/mod.rs
//! Utility functions and helpers.
//!
//! This module contains general-purpose utilities used across
//! the application.

pub mod logging;

use rand::{thread_rng, Rng};
use std::time::Duration;

/// Generate a random delay in `[0, max)` for jitter; zero disables it
pub fn random_jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    let millis = thread_rng().gen_range(0..max_ms);
    Duration::from_millis(millis)
}

/// Quote a value for a SOLIDserver `WHERE` clause
pub fn where_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
