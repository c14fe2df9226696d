//! Table construction: date alignment of independently sampled series.

pub mod merge;

pub use merge::{AlignError, merge};
