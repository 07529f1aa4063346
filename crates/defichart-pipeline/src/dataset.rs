//! Final dataset assembly with value-ranked dimensions.

use defichart_common::{OTHERS, TIMESTAMP};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

use crate::types::{ChartDataset, ChartRow};

/// Assembles `{source, dimensions}` from reduced rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetBuilder;

impl DatasetBuilder {
    /// Builds a dataset whose dimensions are `"timestamp"` followed by the
    /// series ranked by their value in the most recent row, descending.
    ///
    /// Series without a value in that row rank last, `"Others"` is always
    /// the final dimension, and ties break by name. Any key found in a row
    /// is added to the dimension set so the dataset stays complete. Rows are
    /// returned unchanged.
    #[instrument(skip_all, fields(rows = rows.len()))]
    pub fn build<I, S>(rows: Vec<ChartRow>, dimensions: I) -> ChartDataset
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: BTreeSet<String> = dimensions.into_iter().map(Into::into).collect();
        names.extend(rows.iter().flat_map(|row| row.values.keys().cloned()));
        names.remove(TIMESTAMP);

        let ordered = rank_dimensions(names, rows.last());
        debug!(dimensions = ?ordered, "Built dataset");

        let mut all = Vec::with_capacity(ordered.len() + 1);
        all.push(TIMESTAMP.to_string());
        all.extend(ordered);

        ChartDataset {
            source: rows,
            dimensions: all,
        }
    }
}

/// Orders series by their value in `latest`, descending, with `"Others"` last.
pub fn rank_dimensions(names: impl IntoIterator<Item = String>, latest: Option<&ChartRow>) -> Vec<String> {
    let value_of = |name: &str| {
        latest
            .and_then(|row| row.get(name))
            .filter(|v| !v.is_nan())
            .unwrap_or(f64::NEG_INFINITY)
    };

    let mut ranked: Vec<(String, f64)> = names
        .into_iter()
        .map(|name| {
            let value = value_of(&name);
            (name, value)
        })
        .collect();

    ranked.sort_by(|(a_name, a_value), (b_name, b_value)| {
        let a_others = a_name == OTHERS;
        let b_others = b_name == OTHERS;
        a_others
            .cmp(&b_others)
            .then_with(|| b_value.partial_cmp(a_value).unwrap_or(Ordering::Equal))
            .then_with(|| a_name.cmp(b_name))
    });

    ranked.into_iter().map(|(name, _)| name).collect()
}
