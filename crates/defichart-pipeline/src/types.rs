//! Chart data model shared by every pipeline stage.

use defichart_common::{Granularity, TIMESTAMP};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One observation of a series; `None` means "no data", which is distinct from 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    /// Unix seconds.
    pub timestamp: i64,
    /// Observed value.
    pub value: Option<f64>,
}

impl TimeSeriesPoint {
    /// A point with a known value.
    pub const fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value: Some(value),
        }
    }

    /// A point with no data.
    pub const fn missing(timestamp: i64) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }
}

/// A legend entry: a chain, category, ticker or metric label with its points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    /// Series key.
    pub name: String,
    /// Observations, ascending by timestamp once sorted.
    pub points: Vec<TimeSeriesPoint>,
}

impl NamedSeries {
    /// Builds a series and sorts its points by timestamp.
    pub fn new(name: impl Into<String>, mut points: Vec<TimeSeriesPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self {
            name: name.into(),
            points,
        }
    }

    /// Builds a series from `(timestamp, value)` pairs.
    pub fn from_pairs(name: impl Into<String>, pairs: &[(i64, f64)]) -> Self {
        Self::new(
            name,
            pairs
                .iter()
                .map(|(ts, v)| TimeSeriesPoint::new(*ts, *v))
                .collect(),
        )
    }

    /// Value of the last point, if any.
    pub fn latest_value(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.value)
    }
}

/// One row of a dataset: a timestamp bucket and the value of each series in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    /// Bucket key in unix seconds.
    pub timestamp: i64,
    /// Series values keyed by dimension name.
    #[serde(flatten)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl ChartRow {
    /// An empty row at `timestamp`.
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Value of `name`, flattening "absent" and "no data".
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied().flatten()
    }

    /// Sets the value of `name`.
    pub fn set(&mut self, name: impl Into<String>, value: Option<f64>) {
        self.values.insert(name.into(), value);
    }

    /// Adds `value` to `name`; a missing entry starts from zero.
    pub fn add(&mut self, name: &str, value: f64) {
        let slot = self.values.entry(name.to_string()).or_insert(None);
        *slot = Some(slot.unwrap_or(0.0) + value);
    }

    /// Builder-style setter for tests and fixtures.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.set(name, Some(value));
        self
    }
}

/// Axis-ready dataset: rows ascending by timestamp and the ordered dimension list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartDataset {
    /// Rows, ascending by timestamp, no duplicates.
    pub source: Vec<ChartRow>,
    /// `"timestamp"` followed by the series names in legend order.
    pub dimensions: Vec<String>,
}

impl ChartDataset {
    /// A dataset with no rows and only the timestamp dimension.
    pub fn empty() -> Self {
        Self {
            source: Vec::new(),
            dimensions: vec![TIMESTAMP.to_string()],
        }
    }

    /// Dimension names excluding `"timestamp"`.
    pub fn series_names(&self) -> &[String] {
        self.dimensions.get(1..).unwrap_or(&[])
    }

    /// Most recent row.
    pub fn latest_row(&self) -> Option<&ChartRow> {
        self.source.last()
    }

    /// Checks the dataset invariants: leading timestamp dimension, strictly
    /// ascending rows, and every row key declared as a dimension.
    pub fn is_well_formed(&self) -> bool {
        if self.dimensions.first().map(String::as_str) != Some(TIMESTAMP) {
            return false;
        }

        let ascending = self
            .source
            .windows(2)
            .all(|pair| pair[0].timestamp < pair[1].timestamp);

        let complete = self.source.iter().all(|row| {
            row.values
                .keys()
                .all(|key| self.series_names().iter().any(|d| d == key))
        });

        ascending && complete
    }
}

/// Final output handed to the rendering side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOutput {
    /// Dataset consumed by the chart component.
    pub dataset: ChartDataset,
    /// Color per series dimension.
    pub stack_colors: BTreeMap<String, String>,
    /// Display unit of the values.
    pub value_symbol: String,
    /// Granularity the rows are bucketed by.
    pub group_by: Granularity,
    /// Whether values were re-priced into the requested denomination.
    pub denomination_applied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_series_sorts_points() {
        let series = NamedSeries::from_pairs("TVL", &[(300, 3.0), (100, 1.0), (200, 2.0)]);
        let timestamps: Vec<i64> = series.points.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
        assert_eq!(series.latest_value(), Some(3.0));
    }

    #[test]
    fn test_row_add_and_get() {
        let mut row = ChartRow::new(0);
        assert_eq!(row.get("Fees"), None);
        row.add("Fees", 2.5);
        row.add("Fees", 1.5);
        assert_eq!(row.get("Fees"), Some(4.0));

        row.set("TVL", None);
        row.add("TVL", 3.0);
        assert_eq!(row.get("TVL"), Some(3.0));
    }

    #[test]
    fn test_row_serializes_flat() {
        let mut row = ChartRow::new(1_704_067_200).with("A", 7.0);
        row.set("B", None);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "timestamp": 1_704_067_200, "A": 7.0, "B": null })
        );

        let back: ChartRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_well_formed_checks() {
        let mut dataset = ChartDataset {
            source: vec![ChartRow::new(1).with("A", 1.0), ChartRow::new(2).with("A", 2.0)],
            dimensions: vec!["timestamp".to_string(), "A".to_string()],
        };
        assert!(dataset.is_well_formed());

        dataset.source.push(ChartRow::new(2).with("A", 3.0));
        assert!(!dataset.is_well_formed());

        dataset.source.pop();
        dataset.source[0].set("B", Some(1.0));
        assert!(!dataset.is_well_formed());

        assert!(ChartDataset::empty().is_well_formed());
    }
}
