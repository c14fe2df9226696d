//! Input/output helpers.
//!
//! - table exports (CSV/JSON) (`export`)

pub mod export;

pub use export::*;
