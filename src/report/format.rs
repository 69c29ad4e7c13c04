//! Formatted terminal output for view reports, trends and pipeline errors.
//!
//! We keep formatting code in one place so:
//! - the aggregation code stays clean and testable
//! - output changes are localized

use crate::domain::TrendSeries;
use crate::error::PipelineError;
use crate::report::{PanelSnapshot, ViewReport, proportions};

/// Population unit used in the portal's summaries.
const UNIT: &str = "jiwa";

/// Largest raw payload echoed inline in a diagnostic.
pub const RAW_PREVIEW_CHARS: usize = 4000;

/// Full text report for one view and year.
pub fn format_view_report(report: &ViewReport, bar_width: usize, trend_limit: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} ({}) ===\n", report.view.title(), report.dataset));
    out.push_str(&format!("Tahun tersedia: {}\n", format_years(&report.years)));

    let Some(year) = report.year else {
        out.push_str("Tidak ada data yang tersedia.\n");
        return out;
    };
    out.push_str(&format!("Tahun: {year}\n"));

    if report.is_empty() {
        out.push_str("\nTidak ada data yang tersedia untuk tahun yang dipilih.\n");
    } else {
        for (idx, panel) in report.panels.iter().enumerate() {
            out.push('\n');
            out.push_str(&format_panel(panel));
            if idx == 0 {
                out.push('\n');
                out.push_str(&crate::plot::render_bar_chart(&panel.snapshot, bar_width));
            }
        }
    }

    if !report.trend.is_empty() {
        out.push_str("\nTren dari tahun ke tahun:\n");
        out.push_str(&format_trend_table(&report.trend, trend_limit));
    }

    out
}

/// One panel: each category with its total and share, then the grand total.
pub fn format_panel(panel: &PanelSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} per {} (tahun {}):\n",
        panel.title,
        panel.snapshot.group_by.join(" x "),
        panel.snapshot.year
    ));

    if panel.snapshot.is_empty() {
        out.push_str("  (kosong)\n");
        return out;
    }

    for share in proportions(&panel.snapshot) {
        out.push_str(&format!(
            "- {}: {} {UNIT} ({:.1}%)\n",
            share.label,
            fmt_thousands(share.total),
            share.percent
        ));
    }
    out.push_str(&format!(
        "Total Keseluruhan: {} {UNIT}\n",
        fmt_thousands(panel.snapshot.total())
    ));
    out
}

/// Trend table with years as columns and the `limit` largest categories as rows.
pub fn format_trend_table(trend: &TrendSeries, limit: usize) -> String {
    let years = trend.years();
    let categories = trend.categories();
    let shown = categories.len().min(limit.max(1));

    let label_width = categories
        .iter()
        .take(shown)
        .map(|k| k.join(" / ").chars().count())
        .max()
        .unwrap_or(8)
        .clamp(8, 32);

    let mut out = String::new();
    let mut header = format!("{:<label_width$}", trend.group_by.join(" / "));
    for y in &years {
        header.push_str(&format!(" {y:>12}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for key in categories.iter().take(shown) {
        let mut line = format!("{:<label_width$}", truncate(&key.join(" / "), label_width));
        for y in &years {
            let cell = trend
                .value(*y, key)
                .map(fmt_thousands)
                .unwrap_or_else(|| "-".to_string());
            line.push_str(&format!(" {cell:>12}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    if categories.len() > shown {
        out.push_str(&format!("... {} kategori lainnya\n", categories.len() - shown));
    }
    out
}

pub fn format_years(years: &[i64]) -> String {
    if years.is_empty() {
        return "-".to_string();
    }
    years.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

/// Error text plus the details a diagnostic panel needs.
pub fn format_diagnostic(err: &PipelineError, raw_chars: usize) -> String {
    let mut out = format!("Error: {err}\n");

    match err {
        PipelineError::Fetch { .. } => {
            out.push_str("Gagal mengambil data dari API. Pastikan URL API benar dan koneksi internet stabil.\n");
        }
        PipelineError::ColumnsMissing { source, .. } => {
            out.push_str(&format!(
                "Kolom yang dibutuhkan tidak ditemukan: {}\n",
                source.missing.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
            out.push_str(&format!(
                "Kolom yang tersedia dalam data: {}\n",
                source.available.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        PipelineError::Schema { .. } | PipelineError::TypeCoercion { .. } => {}
    }

    if let Some(raw) = err.raw_payload() {
        let pretty = serde_json::to_string_pretty(raw).unwrap_or_else(|_| raw.to_string());
        out.push_str("Respons API mentah:\n");
        out.push_str(&truncate(&pretty, raw_chars));
        out.push('\n');
    }
    out
}

/// Round to an integer and group thousands with commas: `1234567.4` -> `1,234,567`.
pub fn fmt_thousands(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let rounded = v.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

/// Two significant digits with an SI suffix: `123456` -> `120k`, `1_240_000` -> `1.2M`.
pub fn fmt_si(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    if v == 0.0 {
        return "0".to_string();
    }
    // Round first: 999_999 becomes 1.0M, not 1000k.
    let step = 10f64.powi(v.abs().log10().floor() as i32 - 1);
    let rounded = (v / step).round() * step;
    let (scale, suffix) = match rounded.abs() {
        a if a >= 1e9 => (1e9, "G"),
        a if a >= 1e6 => (1e6, "M"),
        a if a >= 1e3 => (1e3, "k"),
        _ => (1.0, ""),
    };
    let scaled = rounded / scale;
    let decimals = (1 - scaled.abs().log10().floor() as i32).max(0) as usize;
    format!("{scaled:.decimals$}{suffix}")
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
