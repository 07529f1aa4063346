//! Integration tests for defichart-pipeline crate.

use defichart_common::test_utils::property_testing::{
    entity_name_strategy, metric_value_strategy, sparse_daily_values,
};
use defichart_common::test_utils::{day, init_test_logging, series_fixtures, ymd};
use defichart_common::{Granularity, OTHERS};
use defichart_config::{Config, PipelineSettings};
use defichart_pipeline::{
    convert, fill_gaps, top_slices, AggregateOptions, ChartInput, ChartPipeline, ChartRequest,
    DatasetBuilder, GroupByReducer, LatestResult, NamedSeries, PriceHistory, SeriesAggregator,
    SeriesClassification, Slice, TimeSeriesPoint,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

fn series_from(name: &str, values: &[Option<f64>]) -> NamedSeries {
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| TimeSeriesPoint {
            timestamp: day(i as i64),
            value: *v,
        })
        .collect();
    NamedSeries::new(name, points)
}

#[test]
fn test_two_day_cap_scenario() {
    init_test_logging();
    let input = ChartInput::from_json(
        r#"[{"date":"2024-01-01","A":5,"B":15},{"date":"2024-01-02","A":7,"B":3}]"#,
    )
    .unwrap();
    let mut settings = PipelineSettings::default();
    settings.cap_count = 1;

    let output = ChartPipeline::default().build(&ChartRequest::new(input).with_settings(settings));

    assert_eq!(output.dataset.dimensions, vec!["timestamp", "A", "Others"]);
    let row = &output.dataset.source[1];
    assert_eq!(row.timestamp, ymd(2024, 1, 2));
    assert_eq!(row.get("A"), Some(7.0));
    assert_eq!(row.get(OTHERS), Some(3.0));
}

#[test]
fn test_weekly_grouping_scenario() {
    let start = ymd(2024, 1, 1);
    let pairs = [
        (start, 10.0),
        (start + day(1), 10.0),
        (start + day(2), 10.0),
        (start + day(7), 10.0),
    ];
    let input = ChartInput::Grouped(BTreeMap::from([(
        "Fees".to_string(),
        pairs.iter().map(|(ts, v)| TimeSeriesPoint::new(*ts, *v)).collect(),
    )]));
    let mut settings = PipelineSettings::default();
    settings.group_by = Granularity::Weekly;

    let output = ChartPipeline::default().build(&ChartRequest::new(input).with_settings(settings));
    let fees: Vec<Option<f64>> = output.dataset.source.iter().map(|r| r.get("Fees")).collect();
    assert_eq!(fees, vec![Some(30.0), Some(10.0)]);
}

#[test]
fn test_gap_fill_scenario() {
    let points = [TimeSeriesPoint::new(0, 10.0), TimeSeriesPoint::new(3 * 86_400, 20.0)];
    let filled = fill_gaps(&points, Default::default());
    let synthetic: Vec<&TimeSeriesPoint> = filled
        .iter()
        .filter(|p| !points.contains(p))
        .collect();
    assert_eq!(synthetic.len(), 2);
    assert_eq!(*synthetic[0], TimeSeriesPoint::new(86_400, 15.0));
    assert_eq!(*synthetic[1], TimeSeriesPoint::new(172_800, 15.0));
}

#[test]
fn test_long_form_chain_breakdown() {
    let start = ymd(2024, 1, 1);
    let chains = series_fixtures::chain_names();
    let series: Vec<serde_json::Value> = chains
        .iter()
        .enumerate()
        .map(|(i, chain)| {
            let data: Vec<serde_json::Value> = series_fixtures::growing_tvl(start, 10)
                .into_iter()
                .map(|(ts, v)| serde_json::json!({ "date": ts, "value": v * (i + 1) as f64 }))
                .collect();
            serde_json::json!({ "entity": chain, "metric": "TVL", "data": data })
        })
        .collect();
    let input = ChartInput::from_value(serde_json::json!({
        "entities": chains,
        "series": series,
    }))
    .unwrap();

    let config = Config::default();
    let output = ChartPipeline::new(&config).build(&ChartRequest::new(input));

    // Ten named chains survive the default cap, the two smallest fold into Others
    assert_eq!(output.dataset.dimensions.len(), 1 + config.pipeline.cap_count + 1);
    assert_eq!(output.dataset.dimensions[1], "Blast");
    assert_eq!(output.dataset.dimensions.last().map(String::as_str), Some(OTHERS));
    assert_eq!(output.stack_colors.len(), output.dataset.dimensions.len() - 1);
    assert!(output.dataset.is_well_formed());
}

#[test]
fn test_pie_slices() {
    let slices = top_slices(
        vec![Slice::new("Lending", 40.0), Slice::new("DEX", 50.0), Slice::new("CDP", 10.0)],
        Some(1),
    );
    assert_eq!(slices, vec![Slice::new("DEX", 50.0), Slice::new(OTHERS, 50.0)]);
}

#[tokio::test]
async fn test_latest_result_with_pipeline_outputs() {
    let pipeline = ChartPipeline::cached(&Config::default());
    let gate: LatestResult<Arc<defichart_pipeline::ChartOutput>> = LatestResult::new();

    let usd = ChartRequest::new(ChartInput::from_json(r#"[{"date":"2024-01-01","TVL":10}]"#).unwrap());
    let mut eth = usd.clone();
    eth.settings.denomination = Some("ETH".to_string());
    eth.price_history = Some(PriceHistory::from_pairs([(ymd(2024, 1, 1) * 1_000, 2.0)]));

    let stale = gate.issue();
    let committed = gate.run(async { pipeline.run(&eth).unwrap() }).await;
    assert!(committed);
    assert!(!gate.commit(stale, pipeline.run(&usd).unwrap()));

    let latest = gate.latest().unwrap();
    assert_eq!(latest.value_symbol, "ETH");
    assert_eq!(latest.dataset.source[0].get("TVL"), Some(5.0));
}

proptest! {
    #[test]
    fn prop_build_is_idempotent(values in sparse_daily_values(40), cap in 1usize..4) {
        let series: Vec<NamedSeries> = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let shifted: Vec<Option<f64>> =
                    values.iter().map(|v| v.map(|v| v * (i + 1) as f64)).collect();
                series_from(name, &shifted)
            })
            .collect();
        let aggregator = SeriesAggregator::new(AggregateOptions {
            cap_count: Some(cap),
            ..AggregateOptions::default()
        });

        let first = aggregator.aggregate(&series);
        let second = DatasetBuilder::build(first.source.clone(), first.series_names().to_vec());
        prop_assert_eq!(&first, &second);
        prop_assert!(first.is_well_formed());
    }

    #[test]
    fn prop_others_conserves_excluded_values(
        columns in prop::collection::vec(sparse_daily_values(20), 2..8),
        cap in 1usize..3,
    ) {
        let series: Vec<NamedSeries> = columns
            .iter()
            .enumerate()
            .map(|(i, values)| series_from(&format!("E{i}"), values))
            .collect();
        let dataset = SeriesAggregator::new(AggregateOptions {
            cap_count: Some(cap),
            ..AggregateOptions::default()
        })
        .aggregate(&series);

        let kept: Vec<&String> = dataset.series_names().iter().filter(|n| n.as_str() != OTHERS).collect();
        for row in &dataset.source {
            let excluded: f64 = series
                .iter()
                .filter(|s| !kept.contains(&&s.name))
                .filter_map(|s| s.points.iter().find(|p| p.timestamp == row.timestamp))
                .filter_map(|p| p.value)
                .sum();
            let others = row.get(OTHERS).unwrap_or(0.0);
            prop_assert!((others - excluded).abs() < 1e-6 * excluded.abs().max(1.0));
        }
    }

    #[test]
    fn prop_cumulative_sum_style_is_monotonic(values in sparse_daily_values(60)) {
        let series = vec![series_from("Fees", &values)];
        let dataset = SeriesAggregator::default().aggregate(&series);
        let reducer = GroupByReducer::new(SeriesClassification::new(["Fees"], Vec::<String>::new()));
        let rows = reducer.reduce_by_group(
            &dataset.source,
            Granularity::Cumulative,
            dataset.series_names(),
            i64::MAX,
        );

        let totals: Vec<f64> = rows.iter().filter_map(|r| r.get("Fees")).collect();
        prop_assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_denomination_round_trip(
        values in prop::collection::vec(metric_value_strategy(), 1..30),
        prices in prop::collection::vec(1u32..100_000u32, 30),
    ) {
        let points: Vec<TimeSeriesPoint> = values
            .iter()
            .enumerate()
            .map(|(i, v)| TimeSeriesPoint::new(day(i as i64), *v))
            .collect();
        let history = PriceHistory::from_pairs(
            prices.iter().enumerate().map(|(i, p)| (day(i as i64) * 1_000, f64::from(*p) / 10.0)),
        );

        let converted = convert(&points, Some(&history));
        prop_assert!(converted.denominated);
        for (original, converted) in points.iter().zip(&converted.points) {
            let price = history.price_at(original.timestamp).unwrap();
            let restored = converted.value.unwrap() * price;
            let expected = original.value.unwrap();
            prop_assert!((restored - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn prop_every_row_key_is_a_dimension(
        names in prop::collection::btree_set(entity_name_strategy(), 1..6),
        values in sparse_daily_values(15),
    ) {
        let series: Vec<NamedSeries> = names.iter().map(|n| series_from(n, &values)).collect();
        let dataset = SeriesAggregator::new(AggregateOptions {
            cap_count: Some(2),
            ..AggregateOptions::default()
        })
        .aggregate(&series);

        for row in &dataset.source {
            for key in row.values.keys() {
                prop_assert!(dataset.series_names().contains(key));
            }
        }
    }
}
