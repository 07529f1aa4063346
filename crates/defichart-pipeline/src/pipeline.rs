//! End-to-end chart pipeline: input normalisation through to the final
//! dataset and stack colors.

use defichart_common::{now_seconds, Result, TIMESTAMP};
use defichart_config::{Config, PaletteConfig, PipelineSettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::aggregator::{AggregateOptions, SeriesAggregator};
use crate::bucketing::{nearest_utc_day, SeriesClassification};
use crate::cache::{CacheKey, ChartCache};
use crate::colors::assign_colors;
use crate::dataset::DatasetBuilder;
use crate::denomination::{convert, PriceHistory};
use crate::gap_fill::fill_gaps;
use crate::group_by::GroupByReducer;
use crate::input::ChartInput;
use crate::percent::expand_to_100_percent;
use crate::transform::{derive_inflows, null_leading_zeros, sample_alternate};
use crate::types::{ChartDataset, ChartOutput, ChartRow, NamedSeries, TimeSeriesPoint};

/// Everything needed to compute one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Raw chart data.
    pub input: ChartInput,
    /// Pipeline parameters.
    #[serde(default)]
    pub settings: PipelineSettings,
    /// Prices of the requested denomination, if one is requested.
    #[serde(default)]
    pub price_history: Option<PriceHistory>,
    /// Reference "now" in unix seconds; the current time when unset.
    #[serde(default, skip_serializing)]
    pub now: Option<i64>,
}

impl ChartRequest {
    /// A request with default settings.
    pub fn new(input: ChartInput) -> Self {
        Self {
            input,
            settings: PipelineSettings::default(),
            price_history: None,
            now: None,
        }
    }

    /// Replaces the settings.
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the price history used for denomination.
    pub fn with_price_history(mut self, history: PriceHistory) -> Self {
        self.price_history = Some(history);
        self
    }

    /// Pins the reference time.
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    fn cache_key(&self) -> Result<CacheKey> {
        CacheKey::new(self.settings.group_by, self.settings.denomination.clone())
            .with_params_hash(self)
    }
}

/// Runs chart requests through every stage, optionally memoising outputs.
#[derive(Debug, Clone)]
pub struct ChartPipeline {
    classification: SeriesClassification,
    palette: PaletteConfig,
    cache: Option<ChartCache>,
}

impl ChartPipeline {
    /// Creates a pipeline from `config` without a cache.
    pub fn new(config: &Config) -> Self {
        Self {
            classification: SeriesClassification::from_config(&config.classification),
            palette: config.palette.clone(),
            cache: None,
        }
    }

    /// Creates a pipeline from `config` with a cache sized by `config.cache`.
    pub fn cached(config: &Config) -> Self {
        Self::new(config).with_cache(ChartCache::new(&config.cache))
    }

    /// Attaches a cache.
    pub fn with_cache(mut self, cache: ChartCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Cache in use, if any.
    pub fn cache(&self) -> Option<&ChartCache> {
        self.cache.as_ref()
    }

    /// Computes `request`, answering from the cache when one is attached.
    ///
    /// Fails only if the request cannot be serialized for its cache key.
    pub fn run(&self, request: &ChartRequest) -> Result<Arc<ChartOutput>> {
        match &self.cache {
            Some(cache) => {
                let key = request.cache_key()?;
                Ok(cache.get_or_compute(key, || self.build(request)))
            }
            None => Ok(Arc::new(self.build(request))),
        }
    }

    /// Computes `request` without touching the cache.
    #[instrument(skip_all, fields(kind = request.input.kind(), group_by = %request.settings.group_by))]
    pub fn build(&self, request: &ChartRequest) -> ChartOutput {
        let settings = &request.settings;
        let now = request.now.unwrap_or_else(now_seconds);

        let mut series = request.input.normalize(settings.attribution);

        if settings.align_daily {
            for s in &mut series {
                align_to_utc_days(&mut s.points, now);
            }
        }

        let mut denomination_applied = false;
        if settings.denomination.is_some() {
            for s in &mut series {
                let conversion = convert(&s.points, request.price_history.as_ref());
                denomination_applied |= conversion.denominated;
                s.points = conversion.points;
            }
        }

        for s in series
            .iter_mut()
            .filter(|s| settings.gap_fill_series.iter().any(|name| *name == s.name))
        {
            s.points = fill_gaps(&s.points, settings.gap_fill);
        }

        let dataset = SeriesAggregator::new(AggregateOptions {
            cap_count: Some(settings.cap_count),
            sort_descending_by_latest_value: true,
            rank_by: settings.rank_by,
        })
        .aggregate(&series);

        let dimensions = dataset.series_names().to_vec();
        let classification = if settings.force_group {
            SeriesClassification::all_sum_style(dimensions.iter().cloned())
        } else {
            self.classification.clone().with_others(
                series
                    .iter()
                    .map(|s| s.name.as_str())
                    .filter(|name| !dimensions.iter().any(|d| d == name)),
            )
        };
        let mut rows = GroupByReducer::new(classification).reduce_by_group(
            &dataset.source,
            settings.group_by,
            &dimensions,
            now,
        );

        if settings.null_leading_zeros {
            null_leading_zeros(&mut rows, &dimensions);
        }
        if settings.expand_to_100_percent {
            expand_to_100_percent(&mut rows);
        }
        if settings.sample_alternate {
            rows = sample_alternate(rows);
        }

        let dataset = DatasetBuilder::build(rows, dimensions);
        let output = self.finish(dataset, settings, denomination_applied);

        info!(
            rows = output.dataset.source.len(),
            dimensions = output.dataset.dimensions.len(),
            denominated = output.denomination_applied,
            "Built chart"
        );
        output
    }

    /// Day-over-day changes of the series called `series_name`.
    ///
    /// The result has a single `"{series_name} Inflows"` dimension and is
    /// empty when the series is missing or has fewer than two points.
    #[instrument(skip(self, request))]
    pub fn build_inflows(&self, request: &ChartRequest, series_name: &str) -> ChartOutput {
        let settings = &request.settings;
        let points: Vec<TimeSeriesPoint> = request
            .input
            .normalize(settings.attribution)
            .into_iter()
            .filter(|s| s.name == series_name)
            .flat_map(|s| s.points)
            .collect();
        let series = NamedSeries::new(series_name, points);

        let (points, denomination_applied) = match settings.denomination {
            Some(_) => {
                let conversion = convert(&series.points, request.price_history.as_ref());
                (conversion.points, conversion.denominated)
            }
            None => (series.points, false),
        };

        let dimension = format!("{series_name} Inflows");
        let rows: Vec<ChartRow> = derive_inflows(&points)
            .into_iter()
            .map(|p| {
                let mut row = ChartRow::new(p.timestamp);
                row.set(dimension.as_str(), p.value);
                row
            })
            .collect();
        debug!(rows = rows.len(), "Built inflows");

        let dataset = if rows.is_empty() {
            ChartDataset::empty()
        } else {
            DatasetBuilder::build(rows, [dimension])
        };
        self.finish(dataset, settings, denomination_applied)
    }

    fn finish(&self, dataset: ChartDataset, settings: &PipelineSettings, denomination_applied: bool) -> ChartOutput {
        let stack_colors = assign_colors(
            dataset.dimensions.iter().map(String::as_str).filter(|d| *d != TIMESTAMP),
            &self.palette,
        );

        ChartOutput {
            dataset,
            stack_colors,
            value_symbol: output_symbol(settings, denomination_applied),
            group_by: settings.group_by,
            denomination_applied,
        }
    }
}

impl Default for ChartPipeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

/// Unit shown next to values: `%` for share-of-total charts, the ticker once
/// re-priced, the configured symbol otherwise.
fn output_symbol(settings: &PipelineSettings, denomination_applied: bool) -> String {
    if settings.expand_to_100_percent {
        return "%".to_string();
    }
    match &settings.denomination {
        Some(ticker) if denomination_applied => ticker.clone(),
        _ => settings.value_symbol.clone(),
    }
}

/// Rounds timestamps to the nearest UTC day, keeping the last point per day.
fn align_to_utc_days(points: &mut Vec<TimeSeriesPoint>, now: i64) {
    for point in points.iter_mut() {
        point.timestamp = nearest_utc_day(point.timestamp, now);
    }
    points.sort_by_key(|p| p.timestamp);

    let mut aligned: Vec<TimeSeriesPoint> = Vec::with_capacity(points.len());
    for point in points.drain(..) {
        match aligned.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => aligned.push(point),
        }
    }
    *points = aligned;
}

#[cfg(test)]
mod tests {
    use super::*;
    use defichart_common::test_utils::{day, ymd};
    use defichart_common::{Granularity, OTHERS};
    use serde_json::json;

    fn tabular() -> ChartInput {
        ChartInput::from_value(json!([
            { "date": "2024-01-01", "A": 5, "B": 15 },
            { "date": "2024-01-02", "A": 7, "B": 3 },
        ]))
        .unwrap()
    }

    #[test]
    fn test_cap_scenario() {
        let mut settings = PipelineSettings::default();
        settings.cap_count = 1;
        let request = ChartRequest::new(tabular()).with_settings(settings);

        let output = ChartPipeline::default().build(&request);
        assert_eq!(output.dataset.dimensions, vec!["timestamp", "A", "Others"]);
        let last = output.dataset.latest_row().unwrap();
        assert_eq!(last.get("A"), Some(7.0));
        assert_eq!(last.get(OTHERS), Some(3.0));
        assert_eq!(output.stack_colors[OTHERS], "#AAAAAA");
        assert_eq!(output.value_symbol, "$");
    }

    #[test]
    fn test_denomination_and_symbol() {
        let mut settings = PipelineSettings::default();
        settings.denomination = Some("ETH".to_string());
        let history = PriceHistory::from_pairs([
            (ymd(2024, 1, 1) * 1_000, 5.0),
            (ymd(2024, 1, 2) * 1_000, 7.0),
        ]);
        let request = ChartRequest::new(tabular())
            .with_settings(settings.clone())
            .with_price_history(history);

        let output = ChartPipeline::default().build(&request);
        assert!(output.denomination_applied);
        assert_eq!(output.value_symbol, "ETH");
        assert_eq!(output.dataset.source[1].get("A"), Some(1.0));

        // No prices: values pass through, unit stays USD
        let output = ChartPipeline::default().build(&ChartRequest::new(tabular()).with_settings(settings));
        assert!(!output.denomination_applied);
        assert_eq!(output.value_symbol, "$");
        assert_eq!(output.dataset.source[1].get("A"), Some(7.0));
    }

    #[test]
    fn test_gap_fill_only_for_configured_series() {
        let input = ChartInput::Grouped(
            [
                ("TVL".to_string(), vec![TimeSeriesPoint::new(0, 10.0), TimeSeriesPoint::new(day(3), 20.0)]),
                ("Fees".to_string(), vec![TimeSeriesPoint::new(0, 1.0), TimeSeriesPoint::new(day(3), 2.0)]),
            ]
            .into_iter()
            .collect(),
        );
        let output = ChartPipeline::default().build(&ChartRequest::new(input));
        let source = &output.dataset.source;
        assert_eq!(source.len(), 4);
        assert_eq!(source[1].get("TVL"), Some(15.0));
        assert_eq!(source[1].get("Fees"), None);
    }

    #[test]
    fn test_percent_symbol() {
        let mut settings = PipelineSettings::default();
        settings.expand_to_100_percent = true;
        let output = ChartPipeline::default().build(&ChartRequest::new(tabular()).with_settings(settings));
        assert_eq!(output.value_symbol, "%");
        assert_eq!(output.dataset.source[0].get("A"), Some(25.0));
    }

    #[test]
    fn test_cumulative_trims_future_rows() {
        let input = ChartInput::Grouped(
            [("Fees".to_string(), (1..=4).map(|d| TimeSeriesPoint::new(day(d), 1.0)).collect())]
                .into_iter()
                .collect(),
        );
        let mut settings = PipelineSettings::default();
        settings.group_by = Granularity::Cumulative;
        let request = ChartRequest::new(input).with_settings(settings).with_now(day(2));

        let output = ChartPipeline::default().build(&request);
        let fees: Vec<Option<f64>> = output.dataset.source.iter().map(|r| r.get("Fees")).collect();
        assert_eq!(fees, vec![Some(1.0), Some(2.0)]);
    }

    fn grouped(series: &[(&str, f64)], days: std::ops::RangeInclusive<u32>) -> ChartInput {
        ChartInput::Grouped(
            series
                .iter()
                .map(|(name, value)| {
                    let points = days.clone().map(|d| TimeSeriesPoint::new(ymd(2024, 1, d), *value)).collect();
                    (name.to_string(), points)
                })
                .collect(),
        )
    }

    #[test]
    fn test_weekly_others_sums_folded_entities() {
        let mut settings = PipelineSettings::default();
        settings.cap_count = 1;
        settings.group_by = Granularity::Weekly;
        let input = grouped(&[("Fees", 100.0), ("Revenue", 10.0), ("Volume", 1.0)], 1..=3);

        let output = ChartPipeline::default().build(&ChartRequest::new(input).with_settings(settings));
        assert_eq!(output.dataset.dimensions, vec!["timestamp", "Fees", "Others"]);
        let row = &output.dataset.source[0];
        assert_eq!(row.get("Fees"), Some(300.0));
        assert_eq!(row.get(OTHERS), Some(33.0));
    }

    #[test]
    fn test_force_group_sums_entity_breakdown() {
        let input = ChartInput::from_value(json!({
            "entities": [],
            "series": [
                { "entity": "Ethereum", "metric": "Fees", "data": [
                    { "date": "2024-01-01", "value": 4.0 },
                    { "date": "2024-01-02", "value": 6.0 },
                ]},
                { "entity": "Solana", "metric": "Fees", "data": [
                    { "date": "2024-01-01", "value": 1.0 },
                    { "date": "2024-01-02", "value": 2.0 },
                ]},
            ]
        }))
        .unwrap();
        let mut settings = PipelineSettings::default();
        settings.group_by = Granularity::Weekly;

        // Chain names are not sum-style, so without the flag the last day wins
        let output = ChartPipeline::default().build(&ChartRequest::new(input.clone()).with_settings(settings.clone()));
        assert_eq!(output.dataset.source[0].get("Ethereum"), Some(6.0));

        settings.force_group = true;
        let output = ChartPipeline::default().build(&ChartRequest::new(input.clone()).with_settings(settings.clone()));
        assert_eq!(output.dataset.source[0].get("Ethereum"), Some(10.0));
        assert_eq!(output.dataset.source[0].get("Solana"), Some(3.0));

        settings.group_by = Granularity::Cumulative;
        let output = ChartPipeline::default().build(&ChartRequest::new(input).with_settings(settings));
        let ethereum: Vec<Option<f64>> = output.dataset.source.iter().map(|r| r.get("Ethereum")).collect();
        assert_eq!(ethereum, vec![Some(4.0), Some(10.0)]);
    }

    #[test]
    fn test_weekly_drops_current_partial_week() {
        let mut settings = PipelineSettings::default();
        settings.group_by = Granularity::Weekly;
        let input = grouped(&[("Fees", 1.0)], 1..=9);
        let request = ChartRequest::new(input).with_settings(settings).with_now(ymd(2024, 1, 9));

        let output = ChartPipeline::default().build(&request);
        assert_eq!(output.dataset.source.len(), 1);
        assert_eq!(output.dataset.source[0].timestamp, ymd(2024, 1, 7));
        assert_eq!(output.dataset.source[0].get("Fees"), Some(7.0));
    }

    #[test]
    fn test_null_or_unknown_group_by_is_daily() {
        for group_by in ["null", "\"fortnightly\"", "7"] {
            let body = format!(
                r#"{{"input": {{"kind": "tabular", "data": []}}, "settings": {{"group_by": {group_by}}}}}"#
            );
            let request: ChartRequest = serde_json::from_str(&body).unwrap();
            assert_eq!(request.settings.group_by, Granularity::Daily);
        }
        let request: ChartRequest =
            serde_json::from_str(r#"{"input": {"kind": "tabular", "data": []}, "settings": {"group_by": "Weekly"}}"#)
                .unwrap();
        assert_eq!(request.settings.group_by, Granularity::Weekly);
    }

    #[test]
    fn test_extreme_dates_do_not_abort() {
        let input = ChartInput::from_json(
            r#"[{"date": -9223372036854775808, "TVL": 1}, {"date": "2024-01-01", "TVL": 2}]"#,
        )
        .unwrap();
        let output = ChartPipeline::default().build(&ChartRequest::new(input));
        assert_eq!(output.dataset.source.len(), 1);
        assert_eq!(output.dataset.source[0].get("TVL"), Some(2.0));
    }

    #[test]
    fn test_inflows() {
        let input = ChartInput::Grouped(
            [(
                "TVL".to_string(),
                vec![TimeSeriesPoint::new(day(1), 10.0), TimeSeriesPoint::new(day(2), 14.0)],
            )]
            .into_iter()
            .collect(),
        );
        let output = ChartPipeline::default().build_inflows(&ChartRequest::new(input.clone()), "TVL");
        assert_eq!(output.dataset.dimensions, vec!["timestamp", "TVL Inflows"]);
        assert_eq!(output.dataset.source[0].get("TVL Inflows"), Some(4.0));

        let missing = ChartPipeline::default().build_inflows(&ChartRequest::new(input), "Fees");
        assert_eq!(missing.dataset, ChartDataset::empty());
    }

    #[test]
    fn test_align_keeps_last_point_per_day() {
        let mut points = vec![
            TimeSeriesPoint::new(day(1) + 3_600, 1.0),
            TimeSeriesPoint::new(day(1) + 20 * 3_600, 2.0),
            TimeSeriesPoint::new(day(2) + 2 * 3_600, 3.0),
        ];
        align_to_utc_days(&mut points, day(10));
        assert_eq!(
            points,
            vec![TimeSeriesPoint::new(day(1), 1.0), TimeSeriesPoint::new(day(2), 3.0)]
        );
    }

    #[test]
    fn test_run_uses_cache() {
        let pipeline = ChartPipeline::cached(&Config::default());
        let request = ChartRequest::new(tabular());

        let first = pipeline.run(&request).unwrap();
        let second = pipeline.run(&request).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let metrics = pipeline.cache().unwrap().metrics();
        assert_eq!(metrics.hit_rate(), 0.5);
    }
}
