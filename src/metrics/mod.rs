//! Derived metrics over date-aligned tables.
//!
//! Every function here is a pure transform that returns a new table. Undefined
//! arithmetic (division by zero, not enough history, non-finite results) is
//! represented by leaving the cell out, never by NaN or infinity.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::data::SeriesRegistry;
use crate::domain::{GrowthRow, GrowthTable, LatestDelta, MILLIONS_TO_BILLIONS, Row, Table};

pub mod stress;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricsError {
    #[error("growth lag must be a positive number of periods")]
    InvalidLag,

    #[error("scale factor must be finite, got {0}")]
    InvalidFactor(f64),
}

/// Multiply every present cell by `factor`.
///
/// Apply once per table: the result is not marked as scaled, so chaining
/// `scale` compounds the factor.
pub fn scale(table: &Table, factor: f64) -> Result<Table, MetricsError> {
    if !factor.is_finite() {
        return Err(MetricsError::InvalidFactor(factor));
    }
    let rows = table
        .rows
        .iter()
        .map(|row| Row {
            date: row.date,
            values: row
                .values
                .iter()
                .map(|(k, v)| (k.clone(), v * factor))
                .filter(|(_, v)| v.is_finite())
                .collect(),
        })
        .collect();
    Ok(Table {
        columns: table.columns.clone(),
        rows,
    })
}

/// Replace series ids with registry labels and order columns by registry
/// position. Ids the registry does not know keep their id and go last.
pub fn relabel(table: &Table, registry: &SeriesRegistry) -> Table {
    let label_of = |id: &str| -> String {
        registry
            .by_series_id(id)
            .map(|e| e.label.clone())
            .unwrap_or_else(|| id.to_string())
    };

    let mut columns: Vec<String> = table.columns.iter().map(|c| label_of(c)).collect();
    columns.sort_by_key(|label| registry.position(label).unwrap_or(usize::MAX));

    let rows = table
        .rows
        .iter()
        .map(|row| Row {
            date: row.date,
            values: row.values.iter().map(|(k, v)| (label_of(k), *v)).collect(),
        })
        .collect();

    Table { columns, rows }
}

/// Merged table (millions, series ids) to display table (billions, labels).
pub fn to_display(merged: &Table, registry: &SeriesRegistry) -> Result<Table, MetricsError> {
    let scaled = scale(merged, MILLIONS_TO_BILLIONS)?;
    Ok(relabel(&scaled, registry))
}

/// Each non-total column as a percentage of `total_column` on the same row.
///
/// Rows where the total is absent or zero contribute no cells. The total
/// column itself never appears in the output.
pub fn composition(table: &Table, total_column: &str) -> Table {
    let columns: Vec<String> = table
        .columns
        .iter()
        .filter(|c| c.as_str() != total_column)
        .cloned()
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            let mut out = Row::new(row.date);
            let total = row.get(total_column).filter(|t| *t != 0.0);
            if let Some(total) = total {
                for col in &columns {
                    if let Some(pct) = row.get(col).map(|v| v / total * 100.0).filter(|p| p.is_finite()) {
                        out.values.insert(col.clone(), pct);
                    }
                }
            }
            out
        })
        .collect();

    Table { columns, rows }
}

/// Percent change against the value `lag` rows earlier, for each column and lag.
pub fn growth(table: &Table, lags: &[usize]) -> Result<GrowthTable, MetricsError> {
    if lags.iter().any(|&l| l == 0) {
        return Err(MetricsError::InvalidLag);
    }
    let lags: Vec<usize> = lags.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();

    let mut rows = Vec::with_capacity(table.rows.len());
    for (i, row) in table.rows.iter().enumerate() {
        let mut values: BTreeMap<String, BTreeMap<usize, f64>> = BTreeMap::new();
        for col in &table.columns {
            let Some(current) = row.get(col) else {
                continue;
            };
            for &lag in &lags {
                if i < lag {
                    continue;
                }
                if let Some(pct) = table.rows[i - lag].get(col).and_then(|prev| pct_change(prev, current)) {
                    values.entry(col.clone()).or_default().insert(lag, pct);
                }
            }
        }
        rows.push(GrowthRow { date: row.date, values });
    }

    Ok(GrowthTable {
        lags,
        columns: table.columns.clone(),
        rows,
    })
}

/// Change between the last two rows for each column present in both.
///
/// Fewer than two rows gives an empty summary.
pub fn latest_delta(table: &Table) -> BTreeMap<String, LatestDelta> {
    let mut out = BTreeMap::new();
    let n = table.rows.len();
    if n < 2 {
        return out;
    }
    let (prev_row, last_row) = (&table.rows[n - 2], &table.rows[n - 1]);

    for col in &table.columns {
        let (Some(current), Some(previous)) = (last_row.get(col), prev_row.get(col)) else {
            continue;
        };
        let absolute = current - previous;
        if !absolute.is_finite() {
            continue;
        }
        out.insert(
            col.clone(),
            LatestDelta {
                current,
                previous,
                absolute,
                percent: pct_change(previous, current),
            },
        );
    }
    out
}

fn pct_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    let pct = (current - previous) / previous * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SeriesEntry, SeriesRole};
    use chrono::{Duration, NaiveDate};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn table(columns: &[&str], rows: &[(&str, &[(&str, f64)])]) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(date, cells)| Row {
                    date: d(date),
                    values: cells.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                })
                .collect(),
        }
    }

    fn weekly(column: &str, values: &[f64]) -> Table {
        let base = d("2023-01-04");
        Table {
            columns: vec![column.to_string()],
            rows: values
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let mut row = Row::new(base + Duration::weeks(i as i64));
                    row.values.insert(column.to_string(), *v);
                    row
                })
                .collect(),
        }
    }

    #[test]
    fn scale_converts_and_passes_absences_through() {
        let t = table(&["A", "B"], &[("2024-01-03", &[("A", 7_000_000.0)]), ("2024-01-10", &[("A", 7_100_000.0), ("B", 500.0)])]);
        let scaled = scale(&t, MILLIONS_TO_BILLIONS).unwrap();
        assert!((scaled.value(0, "A").unwrap() - 7000.0).abs() < 1e-9);
        assert_eq!(scaled.value(0, "B"), None);
        assert!((scaled.value(1, "B").unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(scaled.columns, t.columns);
    }

    #[test]
    fn scale_is_not_idempotent() {
        // Re-scaling already-converted data is a bug; make sure it is visible.
        let t = table(&["A"], &[("2024-01-03", &[("A", 8_000_000.0)])]);
        let once = scale(&t, MILLIONS_TO_BILLIONS).unwrap();
        let twice = scale(&once, MILLIONS_TO_BILLIONS).unwrap();
        assert_ne!(once, twice);
        assert!((twice.value(0, "A").unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn scale_rejects_non_finite_factor() {
        let t = table(&["A"], &[("2024-01-03", &[("A", 1.0)])]);
        assert!(matches!(scale(&t, f64::NAN), Err(MetricsError::InvalidFactor(_))));
        assert!(matches!(scale(&t, f64::INFINITY), Err(MetricsError::InvalidFactor(_))));
    }

    #[test]
    fn display_uses_labels_in_registry_order() {
        let registry = SeriesRegistry::new(
            1,
            vec![
                SeriesEntry { label: "Total".into(), series_id: "T".into(), role: SeriesRole::Total, description: String::new() },
                SeriesEntry { label: "Loans".into(), series_id: "L".into(), role: SeriesRole::Stress, description: String::new() },
            ],
        )
        .unwrap();
        let merged = table(&["L", "T"], &[("2024-01-03", &[("L", 2000.0), ("T", 8000.0)])]);
        let display = to_display(&merged, &registry).unwrap();
        assert_eq!(display.columns, vec!["Total", "Loans"]);
        assert!((display.value(0, "Loans").unwrap() - 2.0).abs() < 1e-9);
        assert!((display.value(0, "Total").unwrap() - 8.0).abs() < 1e-9);
    }

    #[test]
    fn composition_excludes_total_and_skips_zero_total_rows() {
        let t = table(
            &["Total", "A", "B"],
            &[
                ("2024-01-03", &[("Total", 100.0), ("A", 60.0), ("B", 30.0)]),
                ("2024-01-10", &[("Total", 0.0), ("A", 60.0), ("B", 30.0)]),
                ("2024-01-17", &[("A", 60.0)]),
                ("2024-01-24", &[("Total", 200.0), ("B", 50.0)]),
            ],
        );
        let comp = composition(&t, "Total");
        assert_eq!(comp.columns, vec!["A", "B"]);
        assert!(comp.rows.iter().all(|r| r.get("Total").is_none()));

        assert_eq!(comp.value(0, "A"), Some(60.0));
        assert_eq!(comp.value(0, "B"), Some(30.0));
        let sum: f64 = comp.rows[0].values.values().sum();
        assert!(sum <= 100.0);

        assert!(comp.rows[1].values.is_empty());
        assert!(comp.rows[2].values.is_empty());
        assert_eq!(comp.value(3, "A"), None);
        assert_eq!(comp.value(3, "B"), Some(25.0));
        assert_eq!(comp.len(), t.len());
    }

    #[test]
    fn growth_needs_lag_rows_of_history() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let t = weekly("A", &values);
        let g = growth(&t, &[52]).unwrap();
        for i in 0..52 {
            assert_eq!(g.value(i, "A", 52), None, "row {i}");
        }
        let expected = (152.0 - 100.0) / 100.0 * 100.0;
        assert!((g.value(52, "A", 52).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn weekly_growth_and_zero_prior_values() {
        let t = weekly("A", &[100.0, 110.0, 0.0, 5.0]);
        let g = growth(&t, &[1]).unwrap();
        assert_eq!(g.value(0, "A", 1), None);
        assert!((g.value(1, "A", 1).unwrap() - 10.0).abs() < 1e-9);
        assert!((g.value(2, "A", 1).unwrap() + 100.0).abs() < 1e-9);
        assert_eq!(g.value(3, "A", 1), None);
        assert_eq!(g.rows.len(), 4);
    }

    #[test]
    fn growth_skips_absent_history_and_rejects_zero_lag() {
        let t = table(&["A"], &[("2024-01-03", &[]), ("2024-01-10", &[("A", 5.0)]), ("2024-01-17", &[("A", 10.0)])]);
        let g = growth(&t, &[1, 1]).unwrap();
        assert_eq!(g.lags, vec![1]);
        assert_eq!(g.value(1, "A", 1), None);
        assert_eq!(g.value(2, "A", 1), Some(100.0));
        assert_eq!(growth(&t, &[0, 1]), Err(MetricsError::InvalidLag));
    }

    #[test]
    fn latest_delta_uses_last_two_rows() {
        let t = table(
            &["A", "B", "C"],
            &[
                ("2024-01-03", &[("A", 100.0), ("B", 0.0)]),
                ("2024-01-10", &[("A", 90.0), ("B", 4.0), ("C", 1.0)]),
            ],
        );
        let deltas = latest_delta(&t);
        let a = deltas["A"];
        assert_eq!(a.current, 90.0);
        assert_eq!(a.absolute, -10.0);
        assert!((a.percent.unwrap() + 10.0).abs() < 1e-9);

        let b = deltas["B"];
        assert_eq!(b.absolute, 4.0);
        assert_eq!(b.percent, None);

        assert!(!deltas.contains_key("C"));
    }

    #[test]
    fn latest_delta_needs_two_rows() {
        let t = table(&["A"], &[("2024-01-03", &[("A", 100.0)])]);
        assert!(latest_delta(&t).is_empty());
    }
}
