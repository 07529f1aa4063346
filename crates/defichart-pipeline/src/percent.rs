//! Share-of-total rescaling for 100%-stacked charts.

use tracing::instrument;

use crate::types::ChartRow;

/// Rescales each row so its known values sum to 100.
///
/// Nulls stay null. A row whose values sum to zero maps every known value
/// to zero.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn expand_to_100_percent(rows: &mut [ChartRow]) {
    for row in rows.iter_mut() {
        let total: f64 = row.values.values().flatten().sum();
        for value in row.values.values_mut().flatten() {
            *value = if total == 0.0 { 0.0 } else { *value / total * 100.0 };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use defichart_common::test_utils::assert_approx_eq;

    #[test]
    fn test_rows_sum_to_100() {
        let mut rows = vec![
            ChartRow::new(1).with("A", 1.0).with("B", 3.0),
            ChartRow::new(2).with("A", 2.0).with("B", 2.0).with("C", 4.0),
        ];
        expand_to_100_percent(&mut rows);
        assert_eq!(rows[0].get("A"), Some(25.0));
        assert_eq!(rows[0].get("B"), Some(75.0));
        let total: f64 = rows[1].values.values().flatten().sum();
        assert_approx_eq(total, 100.0, 1e-9);
    }

    #[test]
    fn test_zero_and_null_rows() {
        let mut row = ChartRow::new(1).with("A", 0.0);
        row.set("B", None);
        let mut rows = vec![row];
        expand_to_100_percent(&mut rows);
        assert_eq!(rows[0].get("A"), Some(0.0));
        assert_eq!(rows[0].values.get("B"), Some(&None));
    }
}
