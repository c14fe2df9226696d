use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use fed_balance::app::pipeline::{self, PipelineContext, RunError};
use fed_balance::data::{FetchError, SeriesRegistry, SeriesSource};
use fed_balance::domain::{Observation, RunParams, SeriesTable, StressLevel};
use fed_balance::metrics::stress::StressThresholds;

/// Serves canned series by FRED id.
struct StaticSource {
    series: BTreeMap<String, Result<SeriesTable, FetchError>>,
}

impl StaticSource {
    fn new() -> Self {
        Self { series: BTreeMap::new() }
    }

    fn weekly(mut self, series_id: &str, first: NaiveDate, values: &[f64]) -> Self {
        let obs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation::new(first + Duration::weeks(i as i64), v))
            .collect();
        self.series.insert(series_id.to_string(), Ok(SeriesTable::new(series_id, obs)));
        self
    }

    fn failing(mut self, series_id: &str, error: FetchError) -> Self {
        self.series.insert(series_id.to_string(), Err(error));
        self
    }
}

impl SeriesSource for StaticSource {
    fn fetch(&self, series_id: &str, _credential: &str, _start: NaiveDate) -> Result<SeriesTable, FetchError> {
        self.series.get(series_id).cloned().unwrap_or(Err(FetchError::NoData))
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn staggered_series_are_aligned_scaled_and_derived() {
    // Loans start a week late and skip nothing; swaps only report once.
    let source = StaticSource::new()
        .weekly("WALCL", d(2024, 1, 3), &[8_000_000.0, 8_100_000.0, 8_000_000.0])
        .weekly("TREAST", d(2024, 1, 3), &[4_000_000.0, 4_050_000.0, 4_000_000.0])
        .weekly("WLCFLL", d(2024, 1, 10), &[60_000.0, 250_000.0])
        .weekly("SWPT", d(2024, 1, 3), &[5_000.0]);

    let registry = SeriesRegistry::builtin();
    let thresholds = StressThresholds::default();
    let ctx = PipelineContext {
        registry: &registry,
        source: &source,
        thresholds: &thresholds,
    };
    let params = RunParams::new(
        "key",
        d(2024, 1, 1),
        labels(&["Loans", "Total Assets", "Treasury Securities", "Central Bank Liquidity Swaps"]),
    );

    let out = pipeline::run(&ctx, &params).unwrap();
    assert!(out.failures.is_empty());

    // Registry order, billions.
    assert_eq!(
        out.display.columns,
        vec!["Total Assets", "Treasury Securities", "Central Bank Liquidity Swaps", "Loans"]
    );
    assert_eq!(out.display.len(), 3);
    assert!((out.display.value(0, "Total Assets").unwrap() - 8000.0).abs() < 1e-9);
    assert_eq!(out.display.value(0, "Loans"), None);
    // Swaps carried forward from the first week.
    assert!((out.display.value(2, "Central Bank Liquidity Swaps").unwrap() - 5.0).abs() < 1e-9);

    let comp = out.composition.as_ref().unwrap();
    assert!((comp.value(0, "Treasury Securities").unwrap() - 50.0).abs() < 1e-9);

    let weekly = out.growth.value(1, "Total Assets", 1).unwrap();
    assert!((weekly - 1.25).abs() < 1e-9);
    assert_eq!(out.growth.value(2, "Total Assets", 52), None);

    let delta = out.deltas["Loans"];
    assert!((delta.absolute - 190.0).abs() < 1e-9);

    let loans = out.stress.iter().find(|r| r.label == "Loans").unwrap();
    assert_eq!(loans.level, StressLevel::Severe);
    let swaps = out.stress.iter().find(|r| r.label == "Central Bank Liquidity Swaps").unwrap();
    assert_eq!(swaps.level, StressLevel::Normal);
}

#[test]
fn one_failed_series_does_not_sink_the_run() {
    let source = StaticSource::new()
        .weekly("WALCL", d(2024, 1, 3), &[8_000_000.0, 8_100_000.0])
        .failing("WRESBAL", FetchError::Transport("request timed out".into()));

    let registry = SeriesRegistry::builtin();
    let thresholds = StressThresholds::default();
    let ctx = PipelineContext {
        registry: &registry,
        source: &source,
        thresholds: &thresholds,
    };
    let params = RunParams::new("key", d(2024, 1, 1), labels(&["Total Assets", "Bank Reserves"]));

    let out = pipeline::run(&ctx, &params).unwrap();
    assert_eq!(out.loaded(), 1);
    assert_eq!(out.requested.len(), 2);
    assert_eq!(out.failures.len(), 1);
    assert_eq!(out.failures[0].series_id, "WRESBAL");

    let summary = fed_balance::report::format_run_summary(&out);
    assert!(summary.contains("Bank Reserves"), "{summary}");
}

#[test]
fn all_failures_surface_as_no_data() {
    let source = StaticSource::new();
    let registry = SeriesRegistry::builtin();
    let thresholds = StressThresholds::default();
    let ctx = PipelineContext {
        registry: &registry,
        source: &source,
        thresholds: &thresholds,
    };
    let params = RunParams::new("key", d(2024, 1, 1), labels(&["Total Assets", "Loans"]));

    let err = pipeline::run(&ctx, &params).unwrap_err();
    assert!(matches!(err, RunError::NoData { ref failures } if failures.len() == 2));

    let app_err: fed_balance::error::AppError = err.into();
    assert_eq!(app_err.exit_code(), 3);
}

#[test]
fn csv_export_matches_display_table() {
    let source = StaticSource::new()
        .weekly("WALCL", d(2024, 1, 3), &[7_712_500.0])
        .weekly("WLCFLL", d(2024, 1, 3), &[1_250.0]);
    let registry = SeriesRegistry::builtin();
    let thresholds = StressThresholds::default();
    let ctx = PipelineContext {
        registry: &registry,
        source: &source,
        thresholds: &thresholds,
    };
    let params = RunParams::new("key", d(2024, 1, 1), labels(&["Loans", "Total Assets"]));
    let out = pipeline::run(&ctx, &params).unwrap();

    let mut buf = Vec::new();
    fed_balance::io::write_table_csv(&mut buf, &out.display).unwrap();
    assert_eq!(
        String::from_utf8(buf).unwrap(),
        "date,Total Assets,Loans\n2024-01-03,7712.500,1.250\n"
    );
}
