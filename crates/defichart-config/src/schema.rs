//! Configuration schema definitions using serde.

use defichart_common::{
    AttributionStrategy, GapFillStrategy, Granularity, LogFormat, LoggingConfig, RankBy,
};
use serde::{Deserialize, Serialize};

/// Main configuration structure for the chart pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-request pipeline defaults.
    pub pipeline: PipelineSettings,
    /// Sum-style vs snapshot-style series classification.
    pub classification: ClassificationConfig,
    /// Color palette used for stack colors.
    pub palette: PaletteConfig,
    /// Memoisation cache settings.
    pub cache: CacheSettings,
    /// Logging settings.
    pub logging: LogSettings,
}

/// Pipeline parameters a caller may override per chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Display unit for values.
    pub value_symbol: String,
    /// Bucket granularity; null or unknown values mean daily.
    #[serde(deserialize_with = "Granularity::deserialize_lenient")]
    pub group_by: Granularity,
    /// Ticker to re-price values into; `None` keeps USD.
    pub denomination: Option<String>,
    /// Maximum number of named entities before the rest fold into "Others".
    pub cap_count: usize,
    /// Rescale each row so its series sum to 100.
    pub expand_to_100_percent: bool,
    /// Attribution of multi-group items.
    pub attribution: AttributionStrategy,
    /// Ranking used when applying the cap.
    pub rank_by: RankBy,
    /// How missing days are synthesised.
    pub gap_fill: GapFillStrategy,
    /// Continuous series that get gap filling.
    pub gap_fill_series: Vec<String>,
    /// Round timestamps to the nearest UTC day before gap filling.
    pub align_daily: bool,
    /// Null out values before each series' first non-zero value.
    pub null_leading_zeros: bool,
    /// Keep every other row plus the last one.
    pub sample_alternate: bool,
    /// Sum every series inside a bucket, for per-entity breakdowns of one
    /// additive metric (fees by chain, volume by category).
    pub force_group: bool,
}

/// Classification of series names by how they aggregate inside a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Series summed within a bucket (bar-like).
    pub sum_series: Vec<String>,
    /// Sum-style series that stay per-bucket sums under cumulative grouping.
    pub cumulative_excluded: Vec<String>,
}

/// Palette configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Colors cycled through by entity index.
    pub colors: Vec<String>,
    /// Color reserved for the "Others" dimension.
    pub others_color: String,
}

/// Memoisation cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum number of cached chart outputs.
    pub max_capacity: u64,
    /// Time-to-live of cached outputs in seconds.
    pub ttl_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Filter directive, e.g. `info` or `defichart_pipeline=debug`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file.
    pub file: Option<String>,
}

impl LogSettings {
    /// Converts the settings into a subscriber configuration.
    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.level.clone(),
            format: self.format,
            file_path: self.file.clone(),
            ..LoggingConfig::default()
        }
    }
}

impl Config {
    /// Validates the configuration.
    pub fn validate(&self) -> defichart_common::Result<()> {
        crate::validator::ConfigValidator::validate(self)
    }
}
