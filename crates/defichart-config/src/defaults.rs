//! Default values matching the dashboard's chart behavior.

use crate::schema::*;
use defichart_common::{
    AttributionStrategy, GapFillStrategy, Granularity, LogFormat, RankBy,
};

/// Default display cap before entities fold into "Others".
pub const DEFAULT_CAP_COUNT: usize = 10;

/// Default color of the "Others" dimension.
pub const DEFAULT_OTHERS_COLOR: &str = "#AAAAAA";

/// ECharts' default series palette.
pub const DEFAULT_PALETTE: [&str; 9] = [
    "#5470c6", "#91cc75", "#fac858", "#ee6666", "#73c0de", "#3ba272", "#fc8452", "#9a60b4",
    "#ea7ccc",
];

/// Series drawn as bars, summed within a bucket.
pub const DEFAULT_SUM_SERIES: [&str; 20] = [
    "Fees",
    "Revenue",
    "Holders Revenue",
    "Incentives",
    "Volume",
    "Perps Volume",
    "Aggregators Volume",
    "Perps Aggregators Volume",
    "Bridge Aggregators Volume",
    "Options Premium Volume",
    "Options Notional Volume",
    "Unlocks",
    "Bridge Deposits",
    "Bridge Withdrawals",
    "NFT Volume",
    "Treasury Inflows",
    "Developers",
    "Contributers",
    "Devs Commits",
    "Contributers Commits",
];

/// Headcount-style series that never accumulate.
pub const DEFAULT_CUMULATIVE_EXCLUDED: [&str; 4] =
    ["Developers", "Contributers", "Devs Commits", "Contributers Commits"];

/// Continuous series that get gap filling.
pub const DEFAULT_GAP_FILL_SERIES: [&str; 3] = ["TVL", "Staking", "Borrowed"];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipeline: PipelineSettings::default(),
            classification: ClassificationConfig::default(),
            palette: PaletteConfig::default(),
            cache: CacheSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            value_symbol: "$".to_string(),
            group_by: Granularity::Daily,
            denomination: None,
            cap_count: DEFAULT_CAP_COUNT,
            expand_to_100_percent: false,
            attribution: AttributionStrategy::FullCount,
            rank_by: RankBy::Latest,
            gap_fill: GapFillStrategy::Midpoint,
            gap_fill_series: owned(&DEFAULT_GAP_FILL_SERIES),
            align_daily: false,
            null_leading_zeros: false,
            sample_alternate: false,
            force_group: false,
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            sum_series: owned(&DEFAULT_SUM_SERIES),
            cumulative_excluded: owned(&DEFAULT_CUMULATIVE_EXCLUDED),
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            colors: owned(&DEFAULT_PALETTE),
            others_color: DEFAULT_OTHERS_COLOR.to_string(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_capacity: 256,
            ttl_secs: 300,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_series_are_sum_style() {
        let classification = ClassificationConfig::default();
        for name in &classification.cumulative_excluded {
            assert!(classification.sum_series.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_default_pipeline_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.value_symbol, "$");
        assert_eq!(settings.group_by, Granularity::Daily);
        assert_eq!(settings.cap_count, 10);
        assert!(settings.denomination.is_none());
        assert!(settings.gap_fill_series.iter().any(|s| s == "TVL"));
    }
}
