//! Input shapes accepted from the data-fetching side and their normalisation
//! into [`NamedSeries`].

use defichart_common::{checked_epoch, parse_date, AttributionStrategy, ChartError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

use crate::types::{NamedSeries, TimeSeriesPoint};

/// A date as delivered by an API: epoch seconds/milliseconds or a date string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    /// Epoch seconds or milliseconds.
    Epoch(i64),
    /// Fractional epoch seconds.
    Float(f64),
    /// `YYYY-MM-DD`, RFC 3339 or a numeric string.
    Text(String),
}

impl DateValue {
    /// Unix seconds, or `None` when the date cannot be read.
    pub fn to_timestamp(&self) -> Option<i64> {
        match self {
            Self::Epoch(value) => checked_epoch(*value),
            Self::Float(value) if value.is_finite() => checked_epoch(*value as i64),
            Self::Float(_) => None,
            Self::Text(text) => parse_date(text).ok(),
        }
    }
}

/// One `{date, value}` observation of the long form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    /// Observation date.
    pub date: DateValue,
    /// Observed value; null means no data.
    #[serde(default)]
    pub value: Option<f64>,
}

/// One `(entity, metric)` series of the long form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    /// Entity the series belongs to (chain, category, platform).
    pub entity: String,
    /// Metric label, e.g. `"TVL"`.
    #[serde(default)]
    pub metric: String,
    /// Observations.
    #[serde(default)]
    pub data: Vec<DatedValue>,
}

/// Sparse multi-entity long form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LongForm {
    /// Entities to chart; empty keeps every entity present in `series`.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Per entity and metric observations.
    #[serde(default)]
    pub series: Vec<EntitySeries>,
}

/// An item (asset, protocol) counted toward each of its groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberItem {
    /// Item name, used for logging only.
    pub name: String,
    /// Groups the item belongs to, e.g. its categories.
    pub groups: Vec<String>,
    /// Observations of the item's value.
    #[serde(default)]
    pub data: Vec<DatedValue>,
}

/// Every shape of chart data the pipeline accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "kebab-case")]
pub enum ChartInput {
    /// `{date, [metric]: number}` rows, one series per metric key.
    Tabular(Vec<BTreeMap<String, Value>>),
    /// `{entities, series: [{entity, metric, data}]}`.
    LongForm(LongForm),
    /// Series already grouped per entity.
    Grouped(BTreeMap<String, Vec<TimeSeriesPoint>>),
    /// Items attributed to one or more groups.
    Memberships(Vec<MemberItem>),
}

impl ChartInput {
    /// Decodes an input document.
    ///
    /// Accepts the tagged `{"kind": .., "data": ..}` envelope, or a bare
    /// payload whose shape identifies it: an array of rows is tabular, an
    /// object with `series` is the long form, any other object is grouped.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decodes an already parsed input document. See [`ChartInput::from_json`].
    pub fn from_value(value: Value) -> Result<Self> {
        if value.get("kind").is_some() {
            return Ok(serde_json::from_value(value)?);
        }

        match value {
            Value::Array(_) => Ok(Self::Tabular(serde_json::from_value(value)?)),
            Value::Object(ref map) if map.contains_key("series") => {
                Ok(Self::LongForm(serde_json::from_value(value)?))
            }
            Value::Object(_) => Ok(Self::Grouped(serde_json::from_value(value)?)),
            other => Err(ChartError::parse(
                "chart input must be an array or an object",
                other.to_string(),
            )),
        }
    }

    /// Converts the input into one [`NamedSeries`] per legend entry.
    ///
    /// Unreadable dates and non-numeric values are skipped rather than
    /// failing the whole chart.
    #[instrument(skip(self), fields(kind = self.kind()))]
    pub fn normalize(&self, attribution: AttributionStrategy) -> Vec<NamedSeries> {
        let series = match self {
            Self::Tabular(rows) => normalize_tabular(rows),
            Self::LongForm(long) => normalize_long_form(long),
            Self::Grouped(groups) => groups
                .iter()
                .map(|(name, points)| {
                    let points = points
                        .iter()
                        .filter_map(|p| {
                            checked_epoch(p.timestamp).map(|timestamp| TimeSeriesPoint {
                                timestamp,
                                value: p.value,
                            })
                        })
                        .collect();
                    NamedSeries::new(name.clone(), points)
                })
                .collect(),
            Self::Memberships(items) => normalize_memberships(items, attribution),
        };

        debug!(series = series.len(), "Normalized chart input");
        series
    }

    /// Short name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tabular(_) => "tabular",
            Self::LongForm(_) => "long-form",
            Self::Grouped(_) => "grouped",
            Self::Memberships(_) => "memberships",
        }
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn normalize_tabular(rows: &[BTreeMap<String, Value>]) -> Vec<NamedSeries> {
    let mut by_metric: BTreeMap<&str, Vec<TimeSeriesPoint>> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows {
        let Some(timestamp) = row
            .get("date")
            .cloned()
            .and_then(|d| serde_json::from_value::<DateValue>(d).ok())
            .and_then(|d| d.to_timestamp())
        else {
            skipped += 1;
            continue;
        };

        for (key, value) in row.iter().filter(|(key, _)| key.as_str() != "date") {
            let value = match value {
                Value::Null => None,
                other => match numeric(other) {
                    Some(v) => Some(v),
                    None => continue,
                },
            };
            by_metric
                .entry(key.as_str())
                .or_default()
                .push(TimeSeriesPoint { timestamp, value });
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped rows with unreadable dates");
    }

    by_metric
        .into_iter()
        .map(|(name, points)| NamedSeries::new(name, points))
        .collect()
}

fn dated_points(data: &[DatedValue]) -> Vec<TimeSeriesPoint> {
    data.iter()
        .filter_map(|d| {
            d.date.to_timestamp().map(|timestamp| TimeSeriesPoint {
                timestamp,
                value: d.value,
            })
        })
        .collect()
}

fn normalize_long_form(long: &LongForm) -> Vec<NamedSeries> {
    let wanted: BTreeSet<&str> = long.entities.iter().map(String::as_str).collect();
    let kept: Vec<&EntitySeries> = long
        .series
        .iter()
        .filter(|s| wanted.is_empty() || wanted.contains(s.entity.as_str()))
        .collect();

    let mut metrics_per_entity: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for s in &kept {
        metrics_per_entity
            .entry(s.entity.as_str())
            .or_default()
            .insert(s.metric.as_str());
    }

    let dropped = long.series.len() - kept.len();
    if dropped > 0 {
        debug!(dropped, "Dropped series for entities not requested");
    }

    kept.into_iter()
        .map(|s| {
            let multi_metric = metrics_per_entity
                .get(s.entity.as_str())
                .is_some_and(|m| m.len() > 1);
            let name = if multi_metric && !s.metric.is_empty() {
                format!("{} {}", s.entity, s.metric)
            } else {
                s.entity.clone()
            };
            NamedSeries::new(name, dated_points(&s.data))
        })
        .collect()
}

fn normalize_memberships(items: &[MemberItem], attribution: AttributionStrategy) -> Vec<NamedSeries> {
    let mut by_group: BTreeMap<&str, BTreeMap<i64, Option<f64>>> = BTreeMap::new();

    for item in items {
        let groups: BTreeSet<&str> = item.groups.iter().map(String::as_str).collect();
        if groups.is_empty() {
            debug!(item = %item.name, "Item has no groups, skipping");
            continue;
        }

        for point in dated_points(&item.data) {
            let share = point.value.map(|v| attribution.share(v, groups.len()));
            for group in &groups {
                let slot = by_group
                    .entry(*group)
                    .or_default()
                    .entry(point.timestamp)
                    .or_insert(None);
                if let Some(share) = share {
                    *slot = Some(slot.unwrap_or(0.0) + share);
                }
            }
        }
    }

    by_group
        .into_iter()
        .map(|(group, points)| {
            let points = points
                .into_iter()
                .map(|(timestamp, value)| TimeSeriesPoint { timestamp, value })
                .collect();
            NamedSeries::new(group, points)
        })
        .collect()
}
