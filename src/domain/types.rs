//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages without conversion
//! - exported to JSON/CSV
//! - handed to the TUI for charting

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default growth horizons in weekly samples: week-over-week and year-over-year.
pub const DEFAULT_GROWTH_LAGS: [usize; 2] = [1, 52];

/// H.4.1 levels are reported in millions of USD; the dashboard shows billions.
pub const MILLIONS_TO_BILLIONS: f64 = 0.001;

/// A single dated sample of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// All observations fetched for one series, sorted ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesTable {
    pub series_id: String,
    pub observations: Vec<Observation>,
}

impl SeriesTable {
    /// Build a table, sorting by date and keeping the last observation for a
    /// repeated date.
    pub fn new(series_id: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.date);
        let mut deduped: Vec<Observation> = Vec::with_capacity(observations.len());
        for obs in observations {
            match deduped.last_mut() {
                Some(last) if last.date == obs.date => *last = obs,
                _ => deduped.push(obs),
            }
        }
        Self {
            series_id: series_id.into(),
            observations: deduped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }
}

/// One dated row of a wide table. A column missing from `values` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub date: NaiveDate,
    pub values: BTreeMap<String, f64>,
}

impl Row {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// A wide, date-sorted table: the merged table, the display table, and the
/// composition table all share this shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.last().map(|r| r.date)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Present `(date, value)` pairs for one column, in row order.
    pub fn column_series(&self, column: &str) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column).map(|v| (r.date, v)))
            .collect()
    }

    /// Most recent present value for a column.
    pub fn latest(&self, column: &str) -> Option<(NaiveDate, f64)> {
        self.rows
            .iter()
            .rev()
            .find_map(|r| r.get(column).map(|v| (r.date, v)))
    }
}

/// Percent changes per column and lag for a single date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRow {
    pub date: NaiveDate,
    /// `column -> lag -> percent change`. Missing entries are undefined.
    pub values: BTreeMap<String, BTreeMap<usize, f64>>,
}

impl GrowthRow {
    pub fn get(&self, column: &str, lag: usize) -> Option<f64> {
        self.values.get(column).and_then(|m| m.get(&lag)).copied()
    }
}

/// Period-over-period growth derived from a display table. Row `i` lines up
/// with row `i` of the source table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GrowthTable {
    pub lags: Vec<usize>,
    pub columns: Vec<String>,
    pub rows: Vec<GrowthRow>,
}

impl GrowthTable {
    pub fn value(&self, row: usize, column: &str, lag: usize) -> Option<f64> {
        self.rows.get(row).and_then(|r| r.get(column, lag))
    }

    pub fn column_series(&self, column: &str, lag: usize) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|r| r.get(column, lag).map(|v| (r.date, v)))
            .collect()
    }

    pub fn latest(&self, column: &str, lag: usize) -> Option<(NaiveDate, f64)> {
        self.rows
            .iter()
            .rev()
            .find_map(|r| r.get(column, lag).map(|v| (r.date, v)))
    }
}

/// Change between the last two rows of a table for one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatestDelta {
    pub current: f64,
    pub previous: f64,
    pub absolute: f64,
    /// `None` when the previous value is zero.
    pub percent: Option<f64>,
}

/// Threshold classification for a stress indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Normal,
    Elevated,
    Severe,
}

impl StressLevel {
    pub fn display_name(self) -> &'static str {
        match self {
            StressLevel::Normal => "normal",
            StressLevel::Elevated => "elevated",
            StressLevel::Severe => "severe",
        }
    }
}

/// `(elevated, severe)` levels for one stress series, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressThreshold {
    pub elevated: f64,
    pub severe: f64,
}

/// Latest reading of a stress series with its classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressReading {
    pub label: String,
    pub date: NaiveDate,
    pub value: f64,
    pub threshold: StressThreshold,
    pub level: StressLevel,
}

/// Parameters for a single pipeline run.
///
/// Built once from CLI flags or TUI settings and never mutated afterwards; a
/// settings change produces a new `RunParams` and a new run.
#[derive(Clone, PartialEq)]
pub struct RunParams {
    pub credential: String,
    pub start_date: NaiveDate,
    /// Registry labels, in display order.
    pub selection: Vec<String>,
    pub lags: Vec<usize>,
}

impl RunParams {
    pub fn new(credential: impl Into<String>, start_date: NaiveDate, selection: Vec<String>) -> Self {
        Self {
            credential: credential.into(),
            start_date,
            selection,
            lags: DEFAULT_GROWTH_LAGS.to_vec(),
        }
    }
}

impl std::fmt::Debug for RunParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunParams")
            .field("credential", &"<redacted>")
            .field("start_date", &self.start_date)
            .field("selection", &self.selection)
            .field("lags", &self.lags)
            .finish()
    }
}
