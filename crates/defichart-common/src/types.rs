//! Shared enums and constants describing how chart data is shaped.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChartError;

/// Seconds in one UTC day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Milliseconds in one UTC day.
pub const MILLIS_PER_DAY: i64 = SECONDS_PER_DAY * 1_000;

/// Label of the synthetic dimension that absorbs entities beyond the display cap.
pub const OTHERS: &str = "Others";

/// Name of the first dimension of every dataset.
pub const TIMESTAMP: &str = "timestamp";

/// Time bucket granularity requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// No bucketing.
    #[default]
    Daily,
    /// Buckets end on the Sunday of each Monday-start week.
    Weekly,
    /// Buckets start on the first day of each month.
    Monthly,
    /// Buckets start on the first day of each calendar quarter.
    Quarterly,
    /// Raw timestamps with a running total for sum-style series.
    Cumulative,
}

impl Granularity {
    /// Parses an optional, possibly unknown granularity; anything unrecognised is daily.
    pub fn from_optional(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// Deserializes a granularity, reading null or unknown values as daily.
    ///
    /// For use with `#[serde(deserialize_with = "Granularity::deserialize_lenient")]`.
    pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Other(IgnoredAny),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Name(name)) => Self::from_optional(Some(&name)),
            Some(Raw::Other(_)) | None => Self::default(),
        })
    }

    /// Canonical lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Cumulative => "cumulative",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "cumulative" => Ok(Self::Cumulative),
            _ => Err(ChartError::parse("unknown granularity", s)),
        }
    }
}

/// How an item that belongs to several groups is attributed to each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttributionStrategy {
    /// The full value is added to every group the item belongs to.
    #[default]
    FullCount,
    /// The value is divided evenly between the item's groups.
    SplitEven,
}

impl AttributionStrategy {
    /// Share of `value` attributed to each of `group_count` groups.
    pub fn share(self, value: f64, group_count: usize) -> f64 {
        match self {
            Self::FullCount => value,
            Self::SplitEven if group_count > 0 => value / group_count as f64,
            Self::SplitEven => value,
        }
    }
}

impl FromStr for AttributionStrategy {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "full-count" => Ok(Self::FullCount),
            "split-even" => Ok(Self::SplitEven),
            _ => Err(ChartError::parse("unknown attribution strategy", s)),
        }
    }
}

/// How missing days inside a continuous series are synthesised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapFillStrategy {
    /// Every missing day gets the midpoint of the surrounding real values.
    #[default]
    Midpoint,
    /// Missing days ramp linearly between the surrounding real values.
    Linear,
}

/// Which value ranks entities when applying the display cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// Value in the most recent row.
    #[default]
    Latest,
    /// Sum over all rows.
    Total,
}
