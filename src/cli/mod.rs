//! Command-line parsing for the FRED-based balance sheet dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fetch/merge/metrics code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::fred::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fedbs", version, about = "Federal Reserve Balance Sheet Dashboard (FRED-based)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the selected series and print key metrics, composition, growth and stress.
    Show(ShowArgs),
    /// Write the dashboard tables to CSV and/or JSON.
    Export(ExportArgs),
    /// List the label -> FRED series registry.
    Series(SeriesArgs),
    /// Launch the interactive TUI.
    ///
    /// This uses the same underlying pipeline as `fedbs show`, but renders results
    /// in a terminal UI using Ratatui.
    Tui(TuiArgs),
}

/// Where the data comes from and which series to load.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// FRED API key (https://research.stlouisfed.org/docs/api/api_key.html).
    #[arg(long, env = "FRED_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// First observation date (YYYY-MM-DD). Defaults to three years ago.
    #[arg(short = 's', long, value_name = "DATE")]
    pub start: Option<NaiveDate>,

    /// Series label to load (repeatable). Defaults to the core balance sheet set.
    #[arg(long = "series", value_name = "LABEL")]
    pub series: Vec<String>,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Registry and HTTP settings.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// JSON registry file overriding the built-in label -> series mapping.
    #[arg(long, value_name = "JSON")]
    pub registry: Option<PathBuf>,

    /// FRED API base URL.
    #[arg(long, env = "FRED_API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

#[derive(Debug, Parser, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Render an ASCII chart of the selected series.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Write the display table (billions of USD) to CSV.
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Write every derived table to JSON.
    #[arg(long, value_name = "JSON")]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct SeriesArgs {
    /// JSON registry file to list instead of the built-in one.
    #[arg(long, value_name = "JSON")]
    pub registry: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct TuiArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Write tracing output to this file (the terminal is taken by the UI).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
