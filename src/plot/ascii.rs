//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - snapshot bars: `#`
//! - trend series: one marker per category (`a`, `b`, `c`, ...), joined by `.`

use crate::domain::{AggregatedSnapshot, TrendSeries};
use crate::report::fmt_thousands;

const MARKERS: &[char] = &['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

/// Horizontal bar chart of a snapshot, one line per category, largest first.
pub fn render_bar_chart(snapshot: &AggregatedSnapshot, width: usize) -> String {
    if snapshot.is_empty() {
        return String::new();
    }
    let width = width.max(10);

    let labels: Vec<String> = snapshot.entries.iter().map(|e| e.label()).collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0).min(28);
    let max = snapshot
        .entries
        .iter()
        .map(|e| e.total)
        .fold(0.0_f64, f64::max);

    let mut out = String::new();
    for (label, entry) in labels.iter().zip(&snapshot.entries) {
        let len = if max > 0.0 {
            ((entry.total.max(0.0) / max) * width as f64).round() as usize
        } else {
            0
        };
        let label: String = label.chars().take(label_width).collect();
        out.push_str(&format!(
            "{label:<label_width$} |{} {}\n",
            "#".repeat(len),
            fmt_thousands(entry.total)
        ));
    }
    out
}

/// Line plot of the `limit` largest trend categories over the years.
pub fn render_trend_plot(trend: &TrendSeries, limit: usize, width: usize, height: usize) -> String {
    let years = trend.years();
    let (Some(&y0), Some(&y1)) = (years.first(), years.last()) else {
        return String::new();
    };
    let width = width.max(10);
    let height = height.max(5);

    let categories: Vec<Vec<String>> = trend
        .categories()
        .into_iter()
        .take(limit.clamp(1, MARKERS.len()))
        .collect();
    let lines: Vec<Vec<(i64, f64)>> = categories.iter().map(|k| trend.line(k)).collect();

    let (v_min, v_max) = value_range(&lines).unwrap_or((0.0, 1.0));
    let (v_min, v_max) = pad_range(v_min, v_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    for (idx, line) in lines.iter().enumerate() {
        let marker = MARKERS[idx];
        let mut prev = None;
        for &(year, v) in line {
            let x = map_x(year, y0, y1, width);
            let y = map_y(v, v_min, v_max, height);
            if let Some((px, py)) = prev {
                draw_line(&mut grid, px, py, x, y, '.');
            }
            prev = Some((x, y));
        }
        // Markers last so joins never hide a data point.
        for &(year, v) in line {
            grid[map_y(v, v_min, v_max, height)][map_x(year, y0, y1, width)] = marker;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: tahun=[{y0}, {y1}] | jumlah=[{}, {}]\n",
        fmt_thousands(v_min.max(0.0)),
        fmt_thousands(v_max)
    ));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    for (idx, key) in categories.iter().enumerate() {
        out.push_str(&format!("  {} = {}\n", MARKERS[idx], key.join(" / ")));
    }
    out
}

fn value_range(lines: &[Vec<(i64, f64)>]) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for &(_, v) in lines.iter().flatten() {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v.is_finite() && max_v.is_finite() && max_v > min_v {
        Some((min_v, max_v))
    } else if min_v.is_finite() {
        Some((min_v - 1.0, min_v + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(year: i64, first: i64, last: i64, width: usize) -> usize {
    let width = width.max(2);
    if last <= first {
        return width / 2;
    }
    let u = ((year - first) as f64 / (last - first) as f64).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, v_min: f64, v_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    // largest value on row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    // Bresenham
    let (mut x0, mut y0) = (x0 as isize, y0 as isize);
    let (x1, y1) = (x1 as isize, y1 as isize);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid.get_mut(y0 as usize).and_then(|row| row.get_mut(x0 as usize)) {
            *cell = ch;
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
