//! `fed-balance` library crate.
//!
//! The binary (`fedbs`) is a thin wrapper around this library so that:
//!
//! - the fetch/merge/metrics pipeline is testable without spawning processes
//! - the CLI report and the TUI share one code path
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod table;
pub mod tui;
