//! Aggregation: per-year snapshots, cross-year trends, and the per-view report.
//!
//! Aggregation is a plain sum of the measure. Rows that lack one of the
//! `group_by` fields are left out of that grouping.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::{
    AggregatedSnapshot, CategoryTotal, NormalizedRow, NormalizedTable, Panel, TrendPoint, TrendSeries, View,
};

pub mod format;

pub use format::*;

/// Totals per category for rows with `year == year`, largest first.
pub fn snapshot<S: AsRef<str>>(rows: &[NormalizedRow], year: i64, group_by: &[S]) -> AggregatedSnapshot {
    let mut sums: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.year == year) {
        if let Some(key) = group_key(row, group_by) {
            *sums.entry(key).or_insert(0.0) += row.measure;
        }
    }

    let mut entries: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(key, total)| CategoryTotal { key, total })
        .collect();
    // Stable: equal totals keep key order.
    entries.sort_by(|a, b| b.total.partial_cmp(&a.total).unwrap_or(std::cmp::Ordering::Equal));

    AggregatedSnapshot {
        year,
        group_by: owned(group_by),
        entries,
    }
}

/// Totals per (year, category) over all years, years ascending.
pub fn trend<S: AsRef<str>>(rows: &[NormalizedRow], group_by: &[S]) -> TrendSeries {
    let mut sums: BTreeMap<(i64, Vec<String>), f64> = BTreeMap::new();
    for row in rows {
        if let Some(key) = group_key(row, group_by) {
            *sums.entry((row.year, key)).or_insert(0.0) += row.measure;
        }
    }

    TrendSeries {
        group_by: owned(group_by),
        points: sums
            .into_iter()
            .map(|((year, key), total)| TrendPoint { year, key, total })
            .collect(),
    }
}

/// Distinct years present in `rows`, most recent first.
pub fn available_years(rows: &[NormalizedRow]) -> Vec<i64> {
    let years: BTreeSet<i64> = rows.iter().map(|r| r.year).collect();
    years.into_iter().rev().collect()
}

/// A snapshot entry with its share of the snapshot total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Share {
    pub label: String,
    pub total: f64,
    pub percent: f64,
}

/// Percent share of each entry (the pie-chart view). A zero total gives 0%.
pub fn proportions(snapshot: &AggregatedSnapshot) -> Vec<Share> {
    let sum = snapshot.total();
    snapshot
        .entries
        .iter()
        .map(|e| Share {
            label: e.label(),
            total: e.total,
            percent: if sum != 0.0 { e.total / sum * 100.0 } else { 0.0 },
        })
        .collect()
}

/// A titled snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub title: String,
    pub snapshot: AggregatedSnapshot,
}

/// Everything one dashboard tab shows for a selected year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewReport {
    pub view: View,
    pub dataset: String,
    /// `None` when the dataset has no rows at all.
    pub year: Option<i64>,
    pub years: Vec<i64>,
    /// The first panel is the primary category.
    pub panels: Vec<PanelSnapshot>,
    pub trend: TrendSeries,
}

impl ViewReport {
    pub fn primary(&self) -> Option<&PanelSnapshot> {
        self.panels.first()
    }

    /// The selected year has no rows (normal empty state, not an error).
    pub fn is_empty(&self) -> bool {
        self.panels.iter().all(|p| p.snapshot.is_empty())
    }
}

/// Build the report for `view` from a normalized table.
///
/// `year` defaults to the most recent available year. `group_by` overrides
/// the panels with a single custom grouping.
pub fn build_view_report(
    view: View,
    table: &NormalizedTable,
    year: Option<i64>,
    group_by: Option<&[String]>,
) -> ViewReport {
    let years = available_years(&table.rows);
    let selected = year.or_else(|| years.first().copied());

    let panels: Vec<Panel> = match group_by {
        Some(fields) if !fields.is_empty() => vec![Panel::new("Jumlah Penduduk", fields)],
        _ => view
            .panels(&table.spec)
            .into_iter()
            .filter(|p| p.group_by.iter().all(|f| table.has_field(f)))
            .collect(),
    };

    let trend_by = panels
        .first()
        .map(|p| p.group_by.clone())
        .unwrap_or_else(|| table.spec.category_fields.clone());

    let panels = match selected {
        Some(y) => panels
            .into_iter()
            .map(|p| PanelSnapshot {
                snapshot: snapshot(&table.rows, y, &p.group_by),
                title: p.title,
            })
            .collect(),
        None => Vec::new(),
    };

    ViewReport {
        view,
        dataset: table.spec.name.clone(),
        year: selected,
        years,
        panels,
        trend: trend(&table.rows, &trend_by),
    }
}

fn group_key<S: AsRef<str>>(row: &NormalizedRow, group_by: &[S]) -> Option<Vec<String>> {
    group_by
        .iter()
        .map(|f| row.dim(f.as_ref()).map(str::to_string))
        .collect()
}

fn owned<S: AsRef<str>>(fields: &[S]) -> Vec<String> {
    fields.iter().map(|f| f.as_ref().to_string()).collect()
}
