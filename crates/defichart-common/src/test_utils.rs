//! Test utilities and shared test helpers for the chart pipeline.
//!
//! This module provides common testing utilities, fixtures, and helper functions
//! that can be used across all crates in the workspace for unit and integration testing.

use chrono::{TimeZone, Utc};
use std::sync::Once;
use tracing_subscriber::{fmt, EnvFilter};

use crate::types::SECONDS_PER_DAY;

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let _ = fmt().with_test_writer().with_env_filter(filter).try_init();
    });
}

/// Unix seconds for 00:00 UTC on the given calendar date.
pub fn ymd(year: i32, month: u32, day: u32) -> i64 {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .unwrap()
        .timestamp()
}

/// Unix seconds `n` whole days after the epoch.
pub const fn day(n: i64) -> i64 {
    n * SECONDS_PER_DAY
}

/// Assert that two floating point numbers are approximately equal within a tolerance.
pub fn assert_approx_eq(left: f64, right: f64, tolerance: f64) {
    let diff = (left - right).abs();
    assert!(
        diff <= tolerance,
        "assertion failed: `{left}` is not approximately equal to `{right}` (tolerance: {tolerance}, diff: {diff})"
    );
}

/// Series fixtures shaped like the data API responses.
pub mod series_fixtures {
    use super::*;

    /// Daily `(timestamp, value)` pairs starting at `start`, one per value.
    pub fn daily(start: i64, values: &[f64]) -> Vec<(i64, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + i as i64 * SECONDS_PER_DAY, *v))
            .collect()
    }

    /// A steadily growing TVL-like series of `count` days.
    pub fn growing_tvl(start: i64, count: usize) -> Vec<(i64, f64)> {
        (0..count)
            .map(|i| {
                let v = 1_000_000.0 + i as f64 * 25_000.0 + (i as f64).sin() * 10_000.0;
                (start + i as i64 * SECONDS_PER_DAY, v)
            })
            .collect()
    }

    /// Chain names in the order the API lists them (not by size).
    pub fn chain_names() -> Vec<&'static str> {
        vec![
            "Ethereum", "Solana", "Tron", "BSC", "Arbitrum", "Base", "Polygon", "Avalanche",
            "Optimism", "Sui", "Aptos", "Blast",
        ]
    }
}

/// Property-based testing utilities using proptest.
#[cfg(feature = "proptest")]
pub mod property_testing {
    use proptest::prelude::*;

    /// Strategy for a plausible non-negative metric value.
    pub fn metric_value_strategy() -> impl Strategy<Value = f64> {
        (0u32..10_000_000u32).prop_map(|v| f64::from(v) / 100.0)
    }

    /// Strategy for entity names such as chains or categories.
    pub fn entity_name_strategy() -> impl Strategy<Value = String> {
        r"[A-Z][a-z]{2,9}".prop_map(|s| s.to_string())
    }

    /// Strategy for a run of daily values, some of them missing.
    pub fn sparse_daily_values(max_len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
        prop::collection::vec(prop::option::weighted(0.85, metric_value_strategy()), 1..max_len)
    }
}
