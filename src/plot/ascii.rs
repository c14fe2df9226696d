//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each series is drawn as a line with its own glyph; a legend maps glyphs
//! back to labels.

use chrono::NaiveDate;

use crate::domain::Table;

const GLYPHS: [char; 8] = ['*', '+', 'o', 'x', '#', '@', '%', '&'];

/// Render every column of a display table as a line over time.
pub fn render_ascii_plot(table: &Table, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(d_min), Some(d_max)) = (table.first_date(), table.last_date()) else {
        return "Plot: no data\n".to_string();
    };
    let x_span = (d_max - d_min).num_days().max(1) as f64;
    let x_of = |d: NaiveDate| (d - d_min).num_days() as f64 / x_span;

    let (y_min, y_max) = y_range(table).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    for (i, col) in table.columns.iter().enumerate() {
        let glyph = GLYPHS[i % GLYPHS.len()];
        let points: Vec<(f64, f64)> = table
            .column_series(col)
            .into_iter()
            .map(|(d, v)| (x_of(d), v))
            .collect();
        draw_series(&mut grid, &points, y_min, y_max, glyph);
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {d_min} .. {d_max} | y=[{y_min:.1}, {y_max:.1}] $B\n"
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    for (i, col) in table.columns.iter().enumerate() {
        out.push_str(&format!("  {} {col}\n", GLYPHS[i % GLYPHS.len()]));
    }

    out
}

fn y_range(table: &Table) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for row in &table.rows {
        for &v in row.values.values() {
            min_y = min_y.min(v);
            max_y = max_y.max(v);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() && max_y.is_finite() {
        Some((min_y - 1.0, max_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(u: f64, width: usize) -> usize {
    let width = width.max(2);
    (u.clamp(0.0, 1.0) * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_series(grid: &mut [Vec<char>], points: &[(f64, f64)], y_min: f64, y_max: f64, ch: char) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(u, y) in points {
        let x = map_x(u, width);
        let yy = map_y(y, y_min, y_max, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, yy, ch),
            None => grid[yy][x] = ch,
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0 && (y0 as usize) < grid.len() && x0 >= 0 && (x0 as usize) < grid[0].len() {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Row;

    #[test]
    fn plot_golden_snapshot_small() {
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let mut r1 = Row::new(d1);
        r1.values.insert("A".into(), 100.0);
        let mut r2 = Row::new(d2);
        r2.values.insert("A".into(), 110.0);
        let table = Table {
            columns: vec!["A".into()],
            rows: vec![r1, r2],
        };

        let txt = render_ascii_plot(&table, 10, 5);
        let expected = concat!(
            "Plot: 2024-01-03 .. 2024-01-10 | y=[99.5, 110.5] $B\n",
            "        **\n",
            "      **\n",
            "    **\n",
            "  **\n",
            "**\n",
            "  * A\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_table_renders_placeholder() {
        assert_eq!(render_ascii_plot(&Table::default(), 20, 5), "Plot: no data\n");
    }
}
