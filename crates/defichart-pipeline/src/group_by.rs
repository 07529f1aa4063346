//! Re-bucketing of dense daily rows into weekly, monthly, quarterly or
//! cumulative rows.

use defichart_common::Granularity;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

use crate::bucketing::{bucket_key, trim_open_period, SeriesClassification};
use crate::types::ChartRow;

/// Reduces rows by bucket according to each series' classification.
#[derive(Debug, Clone, Default)]
pub struct GroupByReducer {
    classification: SeriesClassification,
}

impl GroupByReducer {
    /// Creates a reducer using `classification` to pick sum or snapshot reduction.
    pub fn new(classification: SeriesClassification) -> Self {
        Self { classification }
    }

    /// Classification in use.
    pub fn classification(&self) -> &SeriesClassification {
        &self.classification
    }

    /// Re-buckets ascending `rows` by `granularity`.
    ///
    /// Sum-style series add up inside a bucket, snapshot series keep the last
    /// known value. Under cumulative grouping accumulating series carry a
    /// running total. Weekly and cumulative output drop trailing rows dated
    /// after `now`, so the current week never shows as a partial bar. Daily
    /// grouping returns the rows unchanged.
    #[instrument(skip(self, rows, dimensions), fields(rows = rows.len(), granularity = %granularity))]
    pub fn reduce_by_group(
        &self,
        rows: &[ChartRow],
        granularity: Granularity,
        dimensions: &[String],
        now: i64,
    ) -> Vec<ChartRow> {
        let mut reduced = match granularity {
            Granularity::Daily => rows.to_vec(),
            Granularity::Cumulative => self.accumulate(rows, dimensions),
            Granularity::Weekly | Granularity::Monthly | Granularity::Quarterly => {
                self.bucket(rows, granularity, dimensions)
            }
        };

        if matches!(granularity, Granularity::Weekly | Granularity::Cumulative) {
            let before = reduced.len();
            trim_open_period(&mut reduced, now);
            if reduced.len() < before {
                debug!(dropped = before - reduced.len(), "Dropped open period");
            }
        }

        debug!(input = rows.len(), output = reduced.len(), "Grouped rows");
        reduced
    }

    fn bucket(&self, rows: &[ChartRow], granularity: Granularity, dimensions: &[String]) -> Vec<ChartRow> {
        let mut buckets: BTreeMap<i64, ChartRow> = BTreeMap::new();

        for row in rows {
            let key = bucket_key(row.timestamp, granularity);
            let bucket = buckets.entry(key).or_insert_with(|| {
                let mut bucket = ChartRow::new(key);
                for dim in dimensions {
                    bucket.set(dim.as_str(), None);
                }
                bucket
            });

            for dim in dimensions {
                let Some(value) = row.get(dim) else {
                    continue;
                };
                if self.classification.is_sum_style(dim) {
                    bucket.add(dim, value);
                } else {
                    bucket.set(dim.as_str(), Some(value));
                }
            }
        }

        buckets.into_values().collect()
    }

    fn accumulate(&self, rows: &[ChartRow], dimensions: &[String]) -> Vec<ChartRow> {
        let mut totals: HashMap<&str, f64> = HashMap::new();
        let mut out: Vec<ChartRow> = Vec::with_capacity(rows.len());

        for row in rows {
            let mut next = ChartRow::new(row.timestamp);
            for dim in dimensions {
                let value = row.get(dim);
                if self.classification.accumulates(dim) {
                    if let Some(value) = value {
                        *totals.entry(dim.as_str()).or_insert(0.0) += value;
                    }
                    next.set(dim.as_str(), totals.get(dim.as_str()).copied());
                } else {
                    next.set(dim.as_str(), value);
                }
            }
            out.push(next);
        }
        out
    }
}
