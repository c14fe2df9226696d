//! Shared dashboard pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! FRED fetch -> merge -> display units -> composition/growth/deltas/stress
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Local, NaiveDate};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::data::{FetchError, SeriesEntry, SeriesRegistry, SeriesSource};
use crate::domain::{GrowthTable, LatestDelta, RunParams, SeriesTable, StressReading, Table};
use crate::metrics::stress::{self, StressThresholds};
use crate::metrics::{self, MetricsError};
use crate::table::{self, AlignError};

use super::tracker::RunTicket;

/// A series that could not be loaded, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesFailure {
    pub label: String,
    pub series_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: FetchError,
}

/// Ways a whole run can fail. Per-series fetch failures are not here: they
/// travel in `RunOutput::failures` as long as one series loaded.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("FRED rejected the API key; check FRED_API_KEY or --api-key")]
    Unauthorized,

    #[error("could not fetch any data ({} of the selected series failed)", .failures.len())]
    NoData { failures: Vec<SeriesFailure> },

    #[error(transparent)]
    Align(#[from] AlignError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("run superseded by a newer request")]
    Superseded,
}

/// All computed outputs of a single dashboard run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub start_date: NaiveDate,
    pub requested: Vec<String>,
    /// Millions of USD, keyed by series id.
    pub merged: Table,
    /// Billions of USD, keyed by label.
    pub display: Table,
    /// `None` when the total series was not selected or failed to load.
    pub composition: Option<Table>,
    pub total_label: Option<String>,
    pub growth: GrowthTable,
    pub deltas: BTreeMap<String, LatestDelta>,
    pub stress: Vec<StressReading>,
    pub failures: Vec<SeriesFailure>,
}

impl RunOutput {
    pub fn loaded(&self) -> usize {
        self.display.columns.len()
    }
}

/// Read-only collaborators shared by every run.
pub struct PipelineContext<'a> {
    pub registry: &'a SeriesRegistry,
    pub source: &'a dyn SeriesSource,
    pub thresholds: &'a StressThresholds,
}

/// Execute the full pipeline once.
pub fn run(ctx: &PipelineContext<'_>, params: &RunParams) -> Result<RunOutput, RunError> {
    execute(ctx, params, None)
}

/// Execute the pipeline, giving up as soon as `ticket` is no longer the
/// latest run.
pub fn run_latest(
    ctx: &PipelineContext<'_>,
    params: &RunParams,
    ticket: &RunTicket<'_>,
) -> Result<RunOutput, RunError> {
    execute(ctx, params, Some(ticket))
}

fn execute(
    ctx: &PipelineContext<'_>,
    params: &RunParams,
    ticket: Option<&RunTicket<'_>>,
) -> Result<RunOutput, RunError> {
    let check = || ticket.map_or(Ok(()), |t| t.check());

    let entries = resolve_selection(ctx.registry, params, Local::now().date_naive())?;
    tracing::info!(n_series = entries.len(), start = %params.start_date, "starting dashboard run");

    // 1) Fetch every series concurrently.
    let (tables, failures) = fetch_all(ctx.source, &entries, params)?;
    check()?;

    if tables.is_empty() {
        tracing::warn!(n_failed = failures.len(), "no series could be loaded");
        return Err(RunError::NoData { failures });
    }

    // 2) Align on date.
    let merged = table::merge(&tables)?;
    check()?;

    // 3) Derive display values and metrics.
    let display = metrics::to_display(&merged, ctx.registry)?;
    let total_label = ctx
        .registry
        .total()
        .map(|e| e.label.clone())
        .filter(|label| display.has_column(label));
    let composition = total_label.as_deref().map(|total| metrics::composition(&display, total));
    let growth = metrics::growth(&display, &params.lags)?;
    let deltas = metrics::latest_delta(&display);
    let stress = stress::assess(&display, ctx.registry, ctx.thresholds);
    check()?;

    // Hoisted: inside the macro `display` names `tracing::field::display`.
    let (loaded, rows) = (display.columns.len(), display.len());
    tracing::info!(loaded, failed = failures.len(), rows, "dashboard run complete");

    Ok(RunOutput {
        start_date: params.start_date,
        requested: entries.iter().map(|e| e.label.clone()).collect(),
        merged,
        display,
        composition,
        total_label,
        growth,
        deltas,
        stress,
        failures,
    })
}

/// Map selected labels onto registry entries, rejecting bad parameters.
fn resolve_selection<'r>(
    registry: &'r SeriesRegistry,
    params: &RunParams,
    today: NaiveDate,
) -> Result<Vec<&'r SeriesEntry>, RunError> {
    if params.credential.trim().is_empty() {
        return Err(RunError::InvalidParams("an API key is required".into()));
    }
    if params.start_date > today {
        return Err(RunError::InvalidParams(format!(
            "start date {} is in the future",
            params.start_date
        )));
    }
    if params.lags.is_empty() || params.lags.contains(&0) {
        return Err(RunError::InvalidParams("growth lags must be positive".into()));
    }
    if params.selection.is_empty() {
        return Err(RunError::InvalidParams("no series selected".into()));
    }

    let mut entries: Vec<&SeriesEntry> = Vec::with_capacity(params.selection.len());
    for label in &params.selection {
        let entry = registry
            .by_label(label)
            .ok_or_else(|| RunError::InvalidParams(format!("unknown series '{label}'")))?;
        if !entries.iter().any(|e| e.label == entry.label) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn fetch_all(
    source: &dyn SeriesSource,
    entries: &[&SeriesEntry],
    params: &RunParams,
) -> Result<(Vec<SeriesTable>, Vec<SeriesFailure>), RunError> {
    let halt = AtomicBool::new(false);

    let results: Vec<Option<Result<SeriesTable, FetchError>>> = entries
        .par_iter()
        .map(|entry| {
            if halt.load(Ordering::SeqCst) {
                return None;
            }
            let result = source.fetch(&entry.series_id, &params.credential, params.start_date);
            if matches!(result, Err(FetchError::Unauthorized)) {
                halt.store(true, Ordering::SeqCst);
            }
            Some(result)
        })
        .collect();

    if halt.load(Ordering::SeqCst) {
        tracing::error!("FRED rejected the API key; stopping all fetches");
        return Err(RunError::Unauthorized);
    }

    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for (entry, result) in entries.iter().zip(results) {
        match result {
            Some(Ok(table)) => {
                tracing::debug!(label = %entry.label, n_obs = table.len(), "series loaded");
                tables.push(table);
            }
            Some(Err(error)) => {
                tracing::warn!(label = %entry.label, series_id = %entry.series_id, %error, "series fetch failed");
                failures.push(SeriesFailure {
                    label: entry.label.clone(),
                    series_id: entry.series_id.clone(),
                    error,
                });
            }
            None => {}
        }
    }
    Ok((tables, failures))
}

fn serialize_display<S: Serializer>(value: &FetchError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tracker::RunTracker;
    use crate::domain::Observation;

    struct MapSource {
        tables: BTreeMap<&'static str, Result<SeriesTable, FetchError>>,
    }

    impl SeriesSource for MapSource {
        fn fetch(&self, series_id: &str, _credential: &str, _start: NaiveDate) -> Result<SeriesTable, FetchError> {
            self.tables
                .get(series_id)
                .cloned()
                .unwrap_or(Err(FetchError::NoData))
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn series(id: &str, points: &[(&str, f64)]) -> SeriesTable {
        SeriesTable::new(id, points.iter().map(|&(date, v)| Observation::new(d(date), v)).collect())
    }

    fn params(labels: &[&str]) -> RunParams {
        RunParams::new("key", d("2024-01-01"), labels.iter().map(|l| l.to_string()).collect())
    }

    fn run_with(source: &MapSource, labels: &[&str]) -> Result<RunOutput, RunError> {
        let registry = SeriesRegistry::builtin();
        let thresholds = StressThresholds::default();
        let ctx = PipelineContext {
            registry: &registry,
            source,
            thresholds: &thresholds,
        };
        run(&ctx, &params(labels))
    }

    #[test]
    fn partial_failures_are_reported_alongside_results() {
        let mut tables = BTreeMap::new();
        tables.insert("WALCL", Ok(series("WALCL", &[("2024-01-03", 8_000_000.0), ("2024-01-10", 7_900_000.0)])));
        tables.insert("WLCFLL", Ok(series("WLCFLL", &[("2024-01-03", 400_000.0), ("2024-01-10", 200_000.0)])));
        tables.insert("TREAST", Err(FetchError::Transport("timed out".into())));
        let source = MapSource { tables };

        let out = run_with(&source, &["Total Assets", "Treasury Securities", "Loans"]).unwrap();
        assert_eq!(out.display.columns, vec!["Total Assets", "Loans"]);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].label, "Treasury Securities");
        assert_eq!(out.total_label.as_deref(), Some("Total Assets"));

        let comp = out.composition.as_ref().unwrap();
        assert!((comp.value(0, "Loans").unwrap() - 5.0).abs() < 1e-9);
        assert!(!comp.has_column("Total Assets"));

        let loans = out.deltas["Loans"];
        assert!((loans.absolute + 200.0).abs() < 1e-9);
        assert_eq!(out.stress.len(), 1);
        assert_eq!(out.stress[0].label, "Loans");
    }

    #[test]
    fn zero_successes_is_fatal() {
        let source = MapSource { tables: BTreeMap::new() };
        let labels = [
            "Total Assets",
            "Treasury Securities",
            "Mortgage-Backed Securities",
            "Bank Reserves",
            "Loans",
        ];
        match run_with(&source, &labels) {
            Err(RunError::NoData { failures }) => assert_eq!(failures.len(), 5),
            other => panic!("expected NoData, got {other:?}"),
        }
    }

    #[test]
    fn unauthorized_halts_the_run() {
        let mut tables = BTreeMap::new();
        tables.insert("WALCL", Err(FetchError::Unauthorized));
        tables.insert("TREAST", Ok(series("TREAST", &[("2024-01-03", 1.0)])));
        let source = MapSource { tables };
        assert!(matches!(
            run_with(&source, &["Total Assets", "Treasury Securities"]),
            Err(RunError::Unauthorized)
        ));
    }

    #[test]
    fn bad_parameters_are_rejected_before_fetching() {
        let source = MapSource { tables: BTreeMap::new() };
        assert!(matches!(run_with(&source, &[]), Err(RunError::InvalidParams(_))));
        assert!(matches!(run_with(&source, &["Gold Reserves"]), Err(RunError::InvalidParams(_))));
    }

    #[test]
    fn composition_is_absent_without_total() {
        let mut tables = BTreeMap::new();
        tables.insert("WLCFLL", Ok(series("WLCFLL", &[("2024-01-03", 1000.0)])));
        let source = MapSource { tables };
        let out = run_with(&source, &["Loans"]).unwrap();
        assert!(out.composition.is_none());
        assert!(out.deltas.is_empty());
    }

    #[test]
    fn superseded_run_is_discarded() {
        let mut tables = BTreeMap::new();
        tables.insert("WALCL", Ok(series("WALCL", &[("2024-01-03", 1.0)])));
        let source = MapSource { tables };
        let registry = SeriesRegistry::builtin();
        let thresholds = StressThresholds::default();
        let ctx = PipelineContext {
            registry: &registry,
            source: &source,
            thresholds: &thresholds,
        };

        let tracker = RunTracker::new();
        let stale = tracker.begin();
        let _newer = tracker.begin();
        let result = run_latest(&ctx, &params(&["Total Assets"]), &tracker.ticket(stale));
        assert!(matches!(result, Err(RunError::Superseded)));
    }
}
