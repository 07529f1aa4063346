//! Gap filling for continuous daily series (TVL-like).

use defichart_common::{GapFillStrategy, SECONDS_PER_DAY};
use tracing::{debug, instrument};

use crate::types::TimeSeriesPoint;

/// Fills missing days between consecutive points of an ascending series.
///
/// A point is synthesised for every whole day strictly between two points
/// more than a day apart, as long as both surrounding values are known.
/// With [`GapFillStrategy::Midpoint`] every synthetic day gets the same
/// average of the two anchors; [`GapFillStrategy::Linear`] ramps between them.
#[instrument(skip(points), fields(points = points.len(), strategy = ?strategy))]
pub fn fill_gaps(points: &[TimeSeriesPoint], strategy: GapFillStrategy) -> Vec<TimeSeriesPoint> {
    let mut filled = Vec::with_capacity(points.len());
    let mut synthesized = 0usize;

    for (i, point) in points.iter().enumerate() {
        filled.push(*point);

        let Some(next) = points.get(i + 1) else {
            continue;
        };
        if next.timestamp - point.timestamp <= SECONDS_PER_DAY {
            continue;
        }
        let (Some(start), Some(end)) = (point.value, next.value) else {
            continue;
        };

        let span = (next.timestamp - point.timestamp) as f64;
        let mut timestamp = point.timestamp + SECONDS_PER_DAY;
        while timestamp < next.timestamp {
            let value = match strategy {
                GapFillStrategy::Midpoint => (start + end) / 2.0,
                GapFillStrategy::Linear => {
                    start + (end - start) * (timestamp - point.timestamp) as f64 / span
                }
            };
            filled.push(TimeSeriesPoint::new(timestamp, value));
            synthesized += 1;
            timestamp += SECONDS_PER_DAY;
        }
    }

    if synthesized > 0 {
        debug!(synthesized, "Filled missing days");
    }

    filled
}
