//! Pie and treemap slices with the tail folded into "Others".

use defichart_common::OTHERS;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// A named share of a categorical chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    /// Slice label.
    pub name: String,
    /// Slice value.
    pub value: f64,
}

impl Slice {
    /// Creates a slice.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Sorts slices by value, descending, and keeps the top `limit`.
///
/// The remaining slices, and any slice already called `"Others"`, are
/// summed into one trailing `"Others"` slice that is omitted unless its
/// value is positive. Without a limit every slice is kept, sorted.
#[instrument(skip(slices), fields(slices = slices.len()))]
pub fn top_slices(mut slices: Vec<Slice>, limit: Option<usize>) -> Vec<Slice> {
    slices.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let Some(limit) = limit else {
        return slices;
    };

    let tail = slices.split_off(limit.min(slices.len()));
    let mut others: f64 = tail.iter().map(|s| s.value).sum();
    slices.retain(|slice| {
        if slice.name == OTHERS {
            others += slice.value;
            false
        } else {
            true
        }
    });

    debug!(kept = slices.len(), others, "Folded tail slices");
    if others > 0.0 {
        slices.push(Slice::new(OTHERS, others));
    }
    slices
}
