//! Date bucketing: maps timestamps to period keys and classifies series by
//! how they reduce inside a bucket.

use chrono::{DateTime, Datelike, NaiveDate};
use defichart_common::{start_of_utc_day, Granularity, OTHERS, SECONDS_PER_DAY};
use defichart_config::ClassificationConfig;
use std::collections::HashSet;

use crate::types::ChartRow;

/// Number of trailing weekly or cumulative rows inspected for a still-open period.
pub const OPEN_PERIOD_WINDOW: usize = 7;

/// Maps a timestamp (unix seconds, UTC) to its bucket key for `granularity`.
///
/// Daily and cumulative keep the raw timestamp; accumulation happens in the
/// group-by reducer.
pub fn bucket_key(timestamp: i64, granularity: Granularity) -> i64 {
    match granularity {
        Granularity::Daily | Granularity::Cumulative => timestamp,
        Granularity::Weekly => last_day_of_week(timestamp),
        Granularity::Monthly => first_day_of_month(timestamp),
        Granularity::Quarterly => first_day_of_quarter(timestamp),
    }
}

/// 00:00 UTC of the Sunday closing the Monday-start week containing `timestamp`.
pub fn last_day_of_week(timestamp: i64) -> i64 {
    let day = start_of_utc_day(timestamp);
    // 1970-01-01 was a Thursday, so Monday-based weekday = (days + 3) mod 7.
    let weekday_from_monday = (day.div_euclid(SECONDS_PER_DAY) + 3).rem_euclid(7);
    day + (6 - weekday_from_monday) * SECONDS_PER_DAY
}

/// 00:00 UTC on the first day of the month containing `timestamp`.
pub fn first_day_of_month(timestamp: i64) -> i64 {
    month_start(timestamp, |month| month)
}

/// 00:00 UTC on the first day of the calendar quarter containing `timestamp`.
pub fn first_day_of_quarter(timestamp: i64) -> i64 {
    month_start(timestamp, |month| (month - 1) / 3 * 3 + 1)
}

fn month_start(timestamp: i64, pick_month: impl Fn(u32) -> u32) -> i64 {
    let Some(dt) = DateTime::from_timestamp(timestamp, 0) else {
        return start_of_utc_day(timestamp);
    };

    NaiveDate::from_ymd_opt(dt.year(), pick_month(dt.month()), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or_else(|| start_of_utc_day(timestamp), |d| d.and_utc().timestamp())
}

/// Rounds to the nearest UTC midnight (12:00 and later round up). A result
/// past `now` clamps to the start of `now`'s day.
pub fn nearest_utc_day(timestamp: i64, now: i64) -> i64 {
    let day = start_of_utc_day(timestamp);
    let rounded = if timestamp - day >= SECONDS_PER_DAY / 2 {
        day + SECONDS_PER_DAY
    } else {
        day
    };

    if rounded > now {
        start_of_utc_day(now)
    } else {
        rounded
    }
}

/// Drops trailing rows that lie in a period not yet closed.
///
/// Only the last [`OPEN_PERIOD_WINDOW`] rows are inspected; rows dated after
/// `now` are removed so a partial bucket never shows as an artificial dip.
pub fn trim_open_period(rows: &mut Vec<ChartRow>, now: i64) {
    let window_start = rows.len().saturating_sub(OPEN_PERIOD_WINDOW);
    let keep = rows[window_start..]
        .iter()
        .position(|row| row.timestamp > now)
        .map_or(rows.len(), |offset| window_start + offset);
    rows.truncate(keep);
}

/// Membership test deciding whether a series sums or snapshots inside a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesClassification {
    sum_series: HashSet<String>,
    cumulative_excluded: HashSet<String>,
}

impl SeriesClassification {
    /// Builds a classification from explicit name lists.
    pub fn new<I, J, S, T>(sum_series: I, cumulative_excluded: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            sum_series: sum_series.into_iter().map(Into::into).collect(),
            cumulative_excluded: cumulative_excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a classification from configuration.
    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self::new(
            config.sum_series.iter().cloned(),
            config.cumulative_excluded.iter().cloned(),
        )
    }

    /// Every series sums within a bucket; used for per-entity breakdowns
    /// (chains, categories) where all dimensions share one additive metric.
    pub fn all_sum_style(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(names, std::iter::empty::<String>())
    }

    /// Sum-style (bar-like) series add up inside a bucket.
    pub fn is_sum_style(&self, name: &str) -> bool {
        self.sum_series.contains(name)
    }

    /// Whether the series carries a running total under cumulative grouping.
    pub fn accumulates(&self, name: &str) -> bool {
        self.is_sum_style(name) && !self.cumulative_excluded.contains(name)
    }

    /// Classifies "Others" after the entities folded into it: it sums when
    /// any of them sums, and accumulates when any of them accumulates.
    pub fn with_others<'a>(mut self, folded: impl IntoIterator<Item = &'a str>) -> Self {
        let (mut sums, mut accumulates) = (false, false);
        for name in folded {
            sums |= self.is_sum_style(name);
            accumulates |= self.accumulates(name);
        }

        if sums {
            self.sum_series.insert(OTHERS.to_string());
            if accumulates {
                self.cumulative_excluded.remove(OTHERS);
            } else {
                self.cumulative_excluded.insert(OTHERS.to_string());
            }
        }
        self
    }
}
