//! Reporting utilities: formatted terminal output for a dashboard run.

pub mod format;

pub use format::*;
