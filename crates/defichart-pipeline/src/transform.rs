//! Row and series post-processing: leading-zero nulling, inflows and
//! alternate-row sampling.

use tracing::{debug, instrument};

use crate::types::{ChartRow, TimeSeriesPoint};

/// Nulls each dimension's values before its first non-zero value, so a
/// stacked chart does not draw a zero baseline before the entity existed.
#[instrument(skip_all, fields(rows = rows.len(), dimensions = dimensions.len()))]
pub fn null_leading_zeros(rows: &mut [ChartRow], dimensions: &[String]) {
    for dim in dimensions {
        for row in rows.iter_mut() {
            match row.get(dim) {
                Some(value) if value != 0.0 => break,
                Some(_) => row.set(dim.as_str(), None),
                None => {}
            }
        }
    }
}

/// Day-over-day change of an ordered continuous series.
///
/// Emits `value[i] - value[i - 1]` at each timestamp after the first,
/// skipping pairs where either side is null or non-finite.
#[instrument(skip_all, fields(points = points.len()))]
pub fn derive_inflows(points: &[TimeSeriesPoint]) -> Vec<TimeSeriesPoint> {
    let inflows: Vec<TimeSeriesPoint> = points
        .windows(2)
        .filter_map(|pair| {
            let previous = pair[0].value.filter(|v| v.is_finite())?;
            let current = pair[1].value.filter(|v| v.is_finite())?;
            Some(TimeSeriesPoint::new(pair[1].timestamp, current - previous))
        })
        .collect();

    debug!(inflows = inflows.len(), "Derived inflows");
    inflows
}

/// Keeps rows at even indices plus the final row.
pub fn sample_alternate(rows: Vec<ChartRow>) -> Vec<ChartRow> {
    let last = rows.len().saturating_sub(1);
    rows.into_iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 0 || *i == last)
        .map(|(_, row)| row)
        .collect()
}
