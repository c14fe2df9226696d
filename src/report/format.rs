//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline and metrics code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{RunOutput, SeriesFailure};
use crate::data::{SeriesRegistry, SeriesRole};

/// Format the run header (what was requested, what loaded, date range).
pub fn format_run_summary(run: &RunOutput) -> String {
    let mut out = String::new();

    out.push_str("=== fedbs - Federal Reserve Balance Sheet (H.4.1, FRED) ===\n");
    out.push_str(&format!(
        "Loaded {} of {} selected series | requested start: {}\n",
        run.loaded(),
        run.requested.len(),
        run.start_date
    ));
    match (run.display.first_date(), run.display.last_date()) {
        (Some(first), Some(last)) => out.push_str(&format!(
            "Observations: {} weeks | {first} .. {last}\n",
            run.display.len()
        )),
        _ => out.push_str("Observations: none\n"),
    }
    out.push_str("Units: billions of USD\n");

    if !run.failures.is_empty() {
        out.push('\n');
        out.push_str(&format_failures(&run.failures));
    }

    out
}

/// Per-series fetch failures.
pub fn format_failures(failures: &[SeriesFailure]) -> String {
    let mut out = String::from("Could not load:\n");
    for f in failures {
        out.push_str(&format!("  - {} ({}): {}\n", f.label, f.series_id, f.error));
    }
    out
}

/// Latest level and change since the previous week, per series.
pub fn format_key_metrics(run: &RunOutput) -> String {
    let mut out = String::from("Key metrics (latest week):\n");
    if run.deltas.is_empty() {
        out.push_str("  Insufficient data for a week-over-week comparison.\n");
        return out;
    }

    out.push_str(&format!(
        "  {:<30} {:>12} {:>12} {:>9}\n",
        "series", "level", "change", "change%"
    ));
    for col in &run.display.columns {
        let Some(delta) = run.deltas.get(col) else {
            continue;
        };
        out.push_str(&format!(
            "  {:<30} {:>12} {:>12} {:>9}\n",
            col,
            fmt_billions(delta.current),
            fmt_signed_billions(delta.absolute),
            fmt_pct(delta.percent),
        ));
    }
    out
}

/// Latest composition row: each component as a share of the total.
pub fn format_composition(run: &RunOutput) -> String {
    let mut out = String::from("Composition (share of total, latest week):\n");
    let (Some(comp), Some(total)) = (&run.composition, &run.total_label) else {
        out.push_str("  Select the total series to see composition.\n");
        return out;
    };
    let Some(row) = comp.rows.iter().rev().find(|r| !r.values.is_empty()) else {
        out.push_str("  No composition data available.\n");
        return out;
    };

    out.push_str(&format!("  as of {} (total: {total})\n", row.date));
    for col in &comp.columns {
        if let Some(pct) = row.get(col) {
            out.push_str(&format!("  {col:<30} {pct:>8.2}%\n"));
        }
    }
    out
}

/// Latest growth rate per series and lag.
pub fn format_growth(run: &RunOutput) -> String {
    let mut out = String::from("Growth rates (latest available):\n");

    out.push_str(&format!("  {:<30}", "series"));
    for lag in &run.growth.lags {
        out.push_str(&format!(" {:>10}", lag_label(*lag)));
    }
    out.push('\n');

    for col in &run.growth.columns {
        out.push_str(&format!("  {col:<30}"));
        for &lag in &run.growth.lags {
            let cell = run.growth.latest(col, lag).map(|(_, v)| v);
            out.push_str(&format!(" {:>10}", fmt_pct(cell)));
        }
        out.push('\n');
    }
    out
}

/// Stress indicator readings against their thresholds.
pub fn format_stress(run: &RunOutput) -> String {
    let mut out = String::from("Stress indicators:\n");
    if run.stress.is_empty() {
        out.push_str("  Select 'Central Bank Liquidity Swaps' and/or 'Loans' to view stress indicators.\n");
        return out;
    }
    for r in &run.stress {
        out.push_str(&format!(
            "  {:<30} {:>12} [{}] (elevated >= {}, severe >= {}) as of {}\n",
            r.label,
            fmt_billions(r.value),
            r.level.display_name(),
            fmt_billions(r.threshold.elevated),
            fmt_billions(r.threshold.severe),
            r.date,
        ));
    }
    out
}

/// Registry listing (label, FRED id, role, description).
pub fn format_registry(registry: &SeriesRegistry) -> String {
    let mut out = format!("Series registry (version {}):\n", registry.version());
    out.push_str(&format!("  {:<30} {:<12} {:<10} {}\n", "label", "fred id", "role", "description"));
    for e in registry.entries() {
        out.push_str(&format!(
            "  {:<30} {:<12} {:<10} {}\n",
            e.label,
            e.series_id,
            role_name(e.role),
            e.description
        ));
    }
    out
}

pub fn lag_label(lag: usize) -> String {
    match lag {
        1 => "weekly".to_string(),
        52 => "annual".to_string(),
        n => format!("{n}w"),
    }
}

fn role_name(role: SeriesRole) -> &'static str {
    match role {
        SeriesRole::Total => "total",
        SeriesRole::Component => "component",
        SeriesRole::Stress => "stress",
        SeriesRole::Foreign => "foreign",
    }
}

/// `$7,123B`
pub fn fmt_billions(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}${}B", group_thousands(v.abs().round() as u64))
}

/// `+12.3B` / `-4.0B`
pub fn fmt_signed_billions(v: f64) -> String {
    format!("{v:+.1}B")
}

pub fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(p) => format!("{p:+.2}%"),
        None => "-".to_string(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_formatting() {
        assert_eq!(fmt_billions(7123.4), "$7,123B");
        assert_eq!(fmt_billions(999.6), "$1,000B");
        assert_eq!(fmt_billions(12.0), "$12B");
        assert_eq!(fmt_billions(-1234567.0), "-$1,234,567B");
        assert_eq!(fmt_signed_billions(12.34), "+12.3B");
        assert_eq!(fmt_signed_billions(-4.0), "-4.0B");
        assert_eq!(fmt_pct(Some(1.234)), "+1.23%");
        assert_eq!(fmt_pct(None), "-");
    }

    #[test]
    fn registry_listing_mentions_every_series() {
        let registry = SeriesRegistry::builtin();
        let txt = format_registry(&registry);
        for e in registry.entries() {
            assert!(txt.contains(&e.label));
            assert!(txt.contains(&e.series_id));
        }
    }

    #[test]
    fn lag_labels() {
        assert_eq!(lag_label(1), "weekly");
        assert_eq!(lag_label(52), "annual");
        assert_eq!(lag_label(13), "13w");
    }
}
