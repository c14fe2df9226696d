//! Data sources: the FRED client and the series registry.

pub mod fred;
pub mod registry;

pub use fred::{FetchError, FredClient, SeriesSource};
pub use registry::{SeriesEntry, SeriesRegistry, SeriesRole};
