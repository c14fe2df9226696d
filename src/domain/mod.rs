//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - raw fetch outputs (`Observation`, `SeriesTable`)
//! - wide date-aligned tables (`Table`, `GrowthTable`)
//! - point-in-time summaries (`LatestDelta`, `StressReading`)
//! - per-run parameters (`RunParams`)

pub mod types;

pub use types::*;
