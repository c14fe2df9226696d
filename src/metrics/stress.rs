//! Threshold-based stress annotations.
//!
//! Central bank liquidity swap lines and credit facility loans sit near zero
//! in calm markets and jump when offshore dollar funding or domestic credit
//! markets seize up. The latest level of each is classified against a pair
//! of thresholds in display units (billions of USD).

use std::collections::BTreeMap;

use crate::data::SeriesRegistry;
use crate::domain::{StressLevel, StressReading, StressThreshold, Table};

/// Thresholds keyed by FRED series id, so a registry that relabels a
/// series keeps its thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct StressThresholds {
    by_series_id: BTreeMap<String, StressThreshold>,
}

impl Default for StressThresholds {
    fn default() -> Self {
        Self::empty()
            .with(
                "WLCFLL",
                StressThreshold {
                    elevated: 50.0,
                    severe: 200.0,
                },
            )
            .with(
                "SWPT",
                StressThreshold {
                    elevated: 10.0,
                    severe: 100.0,
                },
            )
    }
}

impl StressThresholds {
    pub fn empty() -> Self {
        Self {
            by_series_id: BTreeMap::new(),
        }
    }

    pub fn with(mut self, series_id: impl Into<String>, threshold: StressThreshold) -> Self {
        self.by_series_id.insert(series_id.into(), threshold);
        self
    }

    pub fn get(&self, series_id: &str) -> Option<StressThreshold> {
        self.by_series_id.get(series_id).copied()
    }

    /// Threshold for a display label, resolved through the registry.
    pub fn for_label(&self, registry: &SeriesRegistry, label: &str) -> Option<StressThreshold> {
        registry.by_label(label).and_then(|e| self.get(&e.series_id))
    }
}

impl StressThreshold {
    pub fn classify(&self, value: f64) -> StressLevel {
        if value >= self.severe {
            StressLevel::Severe
        } else if value >= self.elevated {
            StressLevel::Elevated
        } else {
            StressLevel::Normal
        }
    }
}

/// Classify the latest value of every thresholded column in `table`.
///
/// Readings follow the table's column order; columns without a threshold or
/// without any value are skipped.
pub fn assess(table: &Table, registry: &SeriesRegistry, thresholds: &StressThresholds) -> Vec<StressReading> {
    let mut out = Vec::new();
    for col in &table.columns {
        let Some(threshold) = thresholds.for_label(registry, col) else {
            continue;
        };
        let Some((date, value)) = table.latest(col) else {
            continue;
        };
        let level = threshold.classify(value);
        if level != StressLevel::Normal {
            tracing::info!(series = %col, value, level = level.display_name(), "stress threshold crossed");
        }
        out.push(StressReading {
            label: col.clone(),
            date,
            value,
            threshold,
            level,
        });
    }
    out
}
