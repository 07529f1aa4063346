//! Merging of per-entity series into dense rows with an "Others" bucket.

use defichart_common::{RankBy, OTHERS, TIMESTAMP};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, instrument};

use crate::dataset::DatasetBuilder;
use crate::types::{ChartDataset, ChartRow, NamedSeries};

/// Options controlling the display cap and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Named entities kept before the rest fold into "Others"; `None` keeps all.
    pub cap_count: Option<usize>,
    /// Order dimensions by their value in the most recent row.
    pub sort_descending_by_latest_value: bool,
    /// Ranking used to decide which entities survive the cap.
    pub rank_by: RankBy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            cap_count: None,
            sort_descending_by_latest_value: true,
            rank_by: RankBy::Latest,
        }
    }
}

/// Merges named series into a dense, timestamp-ordered dataset.
#[derive(Debug, Clone, Default)]
pub struct SeriesAggregator {
    options: AggregateOptions,
}

impl SeriesAggregator {
    /// Creates an aggregator with the given options.
    pub fn new(options: AggregateOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Merges `series` into rows keyed by timestamp.
    ///
    /// Series sharing a name are summed. Entities with no non-zero value are
    /// dropped. When more entities remain than the cap allows, the lowest
    /// ranked ones are summed into `"Others"` at every timestamp; an input
    /// series already called `"Others"` joins that bucket. Every row carries
    /// every dimension, `None` where an entity has no data.
    #[instrument(skip(self, series), fields(series = series.len(), cap = ?self.options.cap_count))]
    pub fn aggregate(&self, series: &[NamedSeries]) -> ChartDataset {
        let merged = merge_by_name(series);
        let latest_ts = merged
            .values()
            .filter_map(|points| points.keys().next_back().copied())
            .max();

        let mut others_inputs: Vec<&str> = Vec::new();
        let mut candidates: Vec<(&str, f64)> = Vec::new();
        for (name, points) in &merged {
            if name.as_str() == OTHERS {
                others_inputs.push(name.as_str());
                continue;
            }
            if !points.values().any(|v| v.is_some_and(|v| v != 0.0)) {
                continue;
            }
            let rank = match self.options.rank_by {
                RankBy::Latest => latest_ts
                    .and_then(|ts| points.get(&ts).copied().flatten())
                    .unwrap_or(f64::NEG_INFINITY),
                RankBy::Total => points.values().flatten().sum(),
            };
            candidates.push((name.as_str(), rank));
        }

        candidates.sort_by(|(a_name, a), (b_name, b)| {
            b.partial_cmp(a)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_name.cmp(b_name))
        });

        let cap = self.options.cap_count.unwrap_or(usize::MAX);
        let split = candidates.len().min(cap);
        let kept: Vec<&str> = candidates[..split].iter().map(|(name, _)| *name).collect();
        let mut excluded: Vec<&str> = candidates[split..].iter().map(|(name, _)| *name).collect();
        excluded.extend(others_inputs);

        debug!(
            entities = candidates.len(),
            kept = kept.len(),
            folded = excluded.len(),
            "Applied display cap"
        );

        let rows = dense_rows(&merged, &kept, &excluded);

        let mut dimensions: Vec<String> = kept.iter().map(|name| name.to_string()).collect();
        if !excluded.is_empty() {
            dimensions.push(OTHERS.to_string());
        }

        if self.options.sort_descending_by_latest_value {
            DatasetBuilder::build(rows, dimensions)
        } else {
            let mut all = vec![TIMESTAMP.to_string()];
            all.extend(first_appearance_order(series, dimensions));
            ChartDataset {
                source: rows,
                dimensions: all,
            }
        }
    }
}

type MergedSeries = BTreeMap<String, BTreeMap<i64, Option<f64>>>;

fn merge_by_name(series: &[NamedSeries]) -> MergedSeries {
    let mut merged: MergedSeries = BTreeMap::new();
    for s in series {
        let points = merged.entry(s.name.clone()).or_default();
        for point in &s.points {
            let slot = points.entry(point.timestamp).or_insert(None);
            if let Some(value) = point.value {
                *slot = Some(slot.unwrap_or(0.0) + value);
            }
        }
    }
    merged
}

fn dense_rows(merged: &MergedSeries, kept: &[&str], excluded: &[&str]) -> Vec<ChartRow> {
    let mut rows: BTreeMap<i64, ChartRow> = BTreeMap::new();
    let timestamps = kept
        .iter()
        .chain(excluded)
        .filter_map(|name| merged.get(*name))
        .flat_map(|points| points.keys().copied());
    for ts in timestamps {
        rows.entry(ts).or_insert_with(|| ChartRow::new(ts));
    }

    for row in rows.values_mut() {
        for name in kept {
            let value = merged
                .get(*name)
                .and_then(|points| points.get(&row.timestamp).copied().flatten());
            row.set(*name, value);
        }

        if !excluded.is_empty() {
            let values: Vec<f64> = excluded
                .iter()
                .filter_map(|name| merged.get(*name))
                .filter_map(|points| points.get(&row.timestamp).copied().flatten())
                .collect();
            let others = (!values.is_empty()).then(|| values.iter().sum());
            row.set(OTHERS, others);
        }
    }

    rows.into_values().collect()
}

fn first_appearance_order(series: &[NamedSeries], dimensions: Vec<String>) -> Vec<String> {
    let wanted: HashSet<&str> = dimensions.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut ordered: Vec<String> = series
        .iter()
        .map(|s| s.name.as_str())
        .filter(|name| *name != OTHERS && wanted.contains(name) && seen.insert(*name))
        .map(str::to_string)
        .collect();
    if wanted.contains(OTHERS) {
        ordered.push(OTHERS.to_string());
    }
    ordered
}
