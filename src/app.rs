//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - resolves the registry, credential and date range into a config
//! - runs the fetch/merge/metrics pipeline
//! - prints reports/plots or writes exports

use std::time::Duration;

use chrono::{Local, Months, NaiveDate};
use clap::Parser;

use crate::cli::{Command, DataArgs, ExportArgs, SeriesArgs, ShowArgs};
use crate::data::registry::DEFAULT_SELECTION;
use crate::data::{FredClient, SeriesRegistry};
use crate::domain::RunParams;
use crate::error::AppError;
use crate::metrics::stress::StressThresholds;

pub mod pipeline;
pub mod tracker;

use pipeline::{PipelineContext, RunOutput};

/// Default look-back window for the start date.
const DEFAULT_LOOKBACK_MONTHS: u32 = 36;

/// Entry point for the `fedbs` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` must be loaded before clap reads `env = "FRED_API_KEY"`.
    dotenvy::dotenv().ok();

    // We want `fedbs` and `fedbs --series Loans` to behave like `fedbs tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Show(args) => {
            crate::logging::init_stderr();
            handle_show(args)
        }
        Command::Export(args) => {
            crate::logging::init_stderr();
            handle_export(args)
        }
        Command::Series(args) => handle_series(args),
        Command::Tui(args) => {
            if let Some(path) = &args.log_file {
                crate::logging::init_file(path)?;
            }
            let config = config_from_args(&args.data)?;
            crate::tui::run(config)
        }
    }
}

/// Everything a front-end needs to start runs, resolved from CLI flags,
/// environment and defaults.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub registry: SeriesRegistry,
    pub thresholds: StressThresholds,
    pub base_url: String,
    pub timeout: Duration,
    /// May be missing for the TUI, which lets the user type one in.
    pub credential: Option<String>,
    pub start_date: NaiveDate,
    pub selection: Vec<String>,
}

impl DashboardConfig {
    pub fn client(&self) -> Result<FredClient, AppError> {
        FredClient::new(self.base_url.clone(), self.timeout)
            .map_err(|e| AppError::new(4, format!("Failed to initialize FRED client: {e}")))
    }

    /// Parameters for a run; fails when no API key is configured.
    pub fn params(&self) -> Result<RunParams, AppError> {
        let credential = self.credential.clone().ok_or_else(|| {
            AppError::new(
                2,
                "Missing FRED API key: set FRED_API_KEY (environment or .env) or pass --api-key.",
            )
        })?;
        Ok(RunParams::new(credential, self.start_date, self.selection.clone()))
    }
}

pub fn config_from_args(args: &DataArgs) -> Result<DashboardConfig, AppError> {
    let registry = match &args.source.registry {
        Some(path) => SeriesRegistry::from_json_file(path)?,
        None => SeriesRegistry::builtin(),
    };

    let selection: Vec<String> = if args.series.is_empty() {
        DEFAULT_SELECTION
            .iter()
            .filter(|label| registry.by_label(label).is_some())
            .map(|label| label.to_string())
            .collect()
    } else {
        args.series.clone()
    };
    for label in &selection {
        if registry.by_label(label).is_none() {
            return Err(AppError::new(
                2,
                format!(
                    "Unknown series '{label}'. Known series: {}.",
                    registry.labels().join(", ")
                ),
            ));
        }
    }

    let today = Local::now().date_naive();
    let start_date = args.start.unwrap_or_else(|| default_start(today));
    if start_date > today {
        return Err(AppError::new(2, format!("Start date {start_date} is in the future.")));
    }

    Ok(DashboardConfig {
        registry,
        thresholds: StressThresholds::default(),
        base_url: args.source.base_url.clone(),
        timeout: Duration::from_secs(args.source.timeout_secs.max(1)),
        credential: args.api_key.clone().filter(|k| !k.trim().is_empty()),
        start_date,
        selection,
    })
}

pub fn default_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_months(Months::new(DEFAULT_LOOKBACK_MONTHS))
        .unwrap_or(today)
}

/// Fetch and derive everything once, for the non-interactive commands.
fn run_once(config: &DashboardConfig) -> Result<RunOutput, AppError> {
    let params = config.params()?;
    let client = config.client()?;
    let ctx = PipelineContext {
        registry: &config.registry,
        source: &client,
        thresholds: &config.thresholds,
    };
    Ok(pipeline::run(&ctx, &params)?)
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let config = config_from_args(&args.data)?;
    let run = run_once(&config)?;

    println!("{}", crate::report::format_run_summary(&run));
    println!("{}", crate::report::format_key_metrics(&run));
    println!("{}", crate::report::format_composition(&run));
    println!("{}", crate::report::format_growth(&run));
    println!("{}", crate::report::format_stress(&run));

    if args.plot {
        let plot = crate::plot::render_ascii_plot(&run.display, args.width, args.height);
        println!("{plot}");
    }

    Ok(())
}

fn handle_export(args: ExportArgs) -> Result<(), AppError> {
    if args.csv.is_none() && args.json.is_none() {
        return Err(AppError::new(2, "Nothing to export: pass --csv and/or --json."));
    }
    let config = config_from_args(&args.data)?;
    let run = run_once(&config)?;

    if let Some(path) = &args.csv {
        crate::io::export::write_display_csv(path, &run.display)?;
        println!("Wrote {}", path.display());
    }
    if let Some(path) = &args.json {
        crate::io::export::write_run_json(path, &run)?;
        println!("Wrote {}", path.display());
    }
    if !run.failures.is_empty() {
        eprintln!("{}", crate::report::format_failures(&run.failures));
    }
    Ok(())
}

fn handle_series(args: SeriesArgs) -> Result<(), AppError> {
    let registry = match &args.registry {
        Some(path) => SeriesRegistry::from_json_file(path)?,
        None => SeriesRegistry::builtin(),
    };
    println!("{}", crate::report::format_registry(&registry));
    Ok(())
}

/// Rewrite argv so `fedbs` defaults to `fedbs tui`.
///
/// Rules:
/// - `fedbs`                      -> `fedbs tui`
/// - `fedbs --series Loans ...`   -> `fedbs tui --series Loans ...`
/// - `fedbs --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "show" | "export" | "series" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::SourceArgs;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn data_args() -> DataArgs {
        DataArgs {
            api_key: Some("key".into()),
            start: None,
            series: Vec::new(),
            source: SourceArgs {
                registry: None,
                base_url: "http://localhost".into(),
                timeout_secs: 5,
            },
        }
    }

    #[test]
    fn bare_invocation_launches_tui() {
        assert_eq!(rewrite_args(argv(&["fedbs"])), argv(&["fedbs", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["fedbs", "--series", "Loans"])),
            argv(&["fedbs", "tui", "--series", "Loans"])
        );
        assert_eq!(rewrite_args(argv(&["fedbs", "show"])), argv(&["fedbs", "show"]));
        assert_eq!(rewrite_args(argv(&["fedbs", "--help"])), argv(&["fedbs", "--help"]));
    }

    #[test]
    fn defaults_fill_selection_and_start() {
        let config = config_from_args(&data_args()).unwrap();
        assert_eq!(config.selection.len(), DEFAULT_SELECTION.len());
        assert_eq!(config.start_date, default_start(Local::now().date_naive()));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.params().is_ok());
    }

    #[test]
    fn unknown_series_and_missing_key_are_config_errors() {
        let mut args = data_args();
        args.series = vec!["Gold".into()];
        assert_eq!(config_from_args(&args).unwrap_err().exit_code(), 2);

        let mut args = data_args();
        args.api_key = Some("  ".into());
        let config = config_from_args(&args).unwrap();
        assert_eq!(config.params().unwrap_err().exit_code(), 2);
    }

    #[test]
    fn default_start_is_three_years_back() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(default_start(today), NaiveDate::from_ymd_opt(2022, 6, 15).unwrap());
    }
}
