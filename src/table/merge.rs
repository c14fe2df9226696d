//! Outer-join of per-series tables on date, with forward-fill.
//!
//! Every date seen in any input becomes a row. Each series then carries its
//! latest value at or before that date; before a series' first observation
//! the cell stays absent.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Row, SeriesTable, Table};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("no data: every series came back empty")]
    Empty,

    #[error("series '{0}' was supplied more than once")]
    DuplicateSeries(String),
}

/// Merge per-series tables into one date-aligned table.
///
/// Columns are the series ids in sorted order, so the result does not depend
/// on the order of `tables`.
pub fn merge(tables: &[SeriesTable]) -> Result<Table, AlignError> {
    let mut seen = HashSet::new();
    for table in tables {
        if !seen.insert(table.series_id.as_str()) {
            return Err(AlignError::DuplicateSeries(table.series_id.clone()));
        }
    }

    let mut inputs: Vec<&SeriesTable> = tables.iter().filter(|t| !t.is_empty()).collect();
    if inputs.is_empty() {
        return Err(AlignError::Empty);
    }
    inputs.sort_by(|a, b| a.series_id.cmp(&b.series_id));

    let dates: Vec<NaiveDate> = inputs
        .iter()
        .flat_map(|t| t.observations.iter().map(|o| o.date))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut rows: Vec<Row> = dates.iter().map(|&date| Row::new(date)).collect();

    for table in &inputs {
        // Observations are sorted, so one cursor per series walks the dates once.
        let obs = &table.observations;
        let mut cursor = 0usize;
        let mut last: Option<f64> = None;
        for row in rows.iter_mut() {
            while cursor < obs.len() && obs[cursor].date <= row.date {
                last = Some(obs[cursor].value);
                cursor += 1;
            }
            if let Some(value) = last {
                row.values.insert(table.series_id.clone(), value);
            }
        }
    }

    let columns = inputs.iter().map(|t| t.series_id.clone()).collect();
    tracing::debug!(n_series = inputs.len(), n_rows = rows.len(), "merged series");

    Ok(Table { columns, rows })
}
