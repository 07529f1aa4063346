//! Re-pricing of value series into another denomination using a price history.

use defichart_common::{ChartError, MILLIS_PER_DAY};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

use crate::types::TimeSeriesPoint;

/// Half-width of the fallback search window around a timestamp (5 days, in ms).
pub const PRICE_WINDOW_MS: i64 = 5 * MILLIS_PER_DAY;

/// Price of the target denomination keyed by millisecond timestamp.
///
/// Deserialises from either an object (`{"1704067200000": 2300.5}`) or the
/// `[[ms, price], ...]` pairs the price APIs return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceHistory", into = "BTreeMap<i64, f64>")]
pub struct PriceHistory {
    prices: BTreeMap<i64, f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPriceHistory {
    Map(BTreeMap<String, f64>),
    Pairs(Vec<(f64, f64)>),
}

impl TryFrom<RawPriceHistory> for PriceHistory {
    type Error = ChartError;

    fn try_from(raw: RawPriceHistory) -> Result<Self, Self::Error> {
        let prices = match raw {
            RawPriceHistory::Map(map) => map
                .into_iter()
                .map(|(key, price)| {
                    key.trim()
                        .parse::<f64>()
                        .map(|ms| (ms as i64, price))
                        .map_err(|_| ChartError::parse("invalid price timestamp", key))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()?,
            RawPriceHistory::Pairs(pairs) => {
                pairs.into_iter().map(|(ms, price)| (ms as i64, price)).collect()
            }
        };
        Ok(Self { prices })
    }
}

impl From<PriceHistory> for BTreeMap<i64, f64> {
    fn from(history: PriceHistory) -> Self {
        history.prices
    }
}

impl PriceHistory {
    /// Builds a history from `(ms, price)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (i64, f64)>) -> Self {
        Self {
            prices: pairs.into_iter().collect(),
        }
    }

    /// Whether the history has no prices.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Number of price entries.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Price at `timestamp` (unix seconds).
    ///
    /// Exact millisecond match first; past the latest entry the latest price
    /// is used; otherwise the earliest entry within ±5 days. `None` when
    /// nothing matches.
    pub fn price_at(&self, timestamp: i64) -> Option<f64> {
        let ms = timestamp.saturating_mul(1_000);

        if let Some(price) = self.prices.get(&ms) {
            return Some(*price);
        }

        let (&last_ms, &last_price) = self.prices.last_key_value()?;
        if ms > last_ms {
            return Some(last_price);
        }

        self.prices
            .range(ms.saturating_sub(PRICE_WINDOW_MS - 1)..ms.saturating_add(PRICE_WINDOW_MS))
            .next()
            .map(|(_, price)| *price)
    }
}

/// Result of converting one series.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Converted (or passed-through) points.
    pub points: Vec<TimeSeriesPoint>,
    /// False when no price history was available and values are unchanged.
    pub denominated: bool,
}

/// Divides every known value by the denomination price at its timestamp.
///
/// A missing price yields 0 rather than null; null values stay null. An
/// absent or empty history leaves the series unchanged and reports
/// `denominated: false`.
#[instrument(skip(points, history), fields(points = points.len()))]
pub fn convert(points: &[TimeSeriesPoint], history: Option<&PriceHistory>) -> Conversion {
    let Some(history) = history.filter(|h| !h.is_empty()) else {
        debug!("No price history, passing values through");
        return Conversion {
            points: points.to_vec(),
            denominated: false,
        };
    };

    let mut misses = 0usize;
    let converted = points
        .iter()
        .map(|point| {
            let value = point.value.map(|raw| {
                match history.price_at(point.timestamp).filter(|p| *p != 0.0) {
                    Some(price) => raw / price,
                    None => {
                        misses += 1;
                        0.0
                    }
                }
            });
            TimeSeriesPoint {
                timestamp: point.timestamp,
                value,
            }
        })
        .collect();

    if misses > 0 {
        warn!(misses, "No denomination price near some timestamps, values zeroed");
    }

    Conversion {
        points: converted,
        denominated: true,
    }
}
