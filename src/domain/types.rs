//! Shared row and aggregate types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during aggregation
//! - exported to JSON/CSV
//! - handed to a view layer (TUI or an external renderer)

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::DatasetSpec;

/// One untyped row of the fetched `pivot_data` payload.
pub type RawRecord = Map<String, Value>;

/// The validated, still untyped, row set of one dataset.
pub type RowList = Vec<RawRecord>;

/// A row restricted to the dataset's resolved fields, with year and measure coerced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub year: i64,
    pub measure: f64,
    /// Categorical fields (everything except year and measure).
    pub dims: BTreeMap<String, String>,
}

impl NormalizedRow {
    pub fn dim(&self, field: &str) -> Option<&str> {
        self.dims.get(field).map(String::as_str)
    }

    /// Convert back to a `RawRecord` using `spec`'s field names.
    pub fn to_record(&self, spec: &DatasetSpec) -> RawRecord {
        let mut record = RawRecord::new();
        record.insert(spec.year_field.clone(), Value::from(self.year));
        record.insert(spec.measure_field.clone(), Value::from(self.measure));
        for (field, value) in &self.dims {
            record.insert(field.clone(), Value::String(value.clone()));
        }
        record
    }
}

/// Normalizer output: rows plus bookkeeping about what was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedTable {
    pub spec: DatasetSpec,
    /// Required fields after resolving optional ones against the fetched columns.
    pub fields: Vec<String>,
    pub rows: Vec<NormalizedRow>,
    pub rows_read: usize,
    /// Rows dropped for a null or absent required field.
    pub dropped_incomplete: usize,
    /// Rows dropped by the skip-row coercion policy.
    pub dropped_invalid: usize,
}

impl NormalizedTable {
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn to_records(&self) -> RowList {
        self.rows.iter().map(|r| r.to_record(&self.spec)).collect()
    }
}

/// Summed measure for one category (one value per `group_by` field).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub key: Vec<String>,
    pub total: f64,
}

impl CategoryTotal {
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

/// Totals per category for one selected year.
///
/// Entries are ordered by descending total, ties by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSnapshot {
    pub year: i64,
    pub group_by: Vec<String>,
    pub entries: Vec<CategoryTotal>,
}

impl AggregatedSnapshot {
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[&str]) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.key.iter().map(String::as_str).eq(key.iter().copied()))
            .map(|e| e.total)
    }
}

/// One aggregate point of a trend line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub year: i64,
    pub key: Vec<String>,
    pub total: f64,
}

/// Totals per (year, category) across all years, ordered by year ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub group_by: Vec<String>,
    pub points: Vec<TrendPoint>,
}

impl TrendSeries {
    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i64> {
        let mut years: Vec<i64> = self.points.iter().map(|p| p.year).collect();
        years.dedup();
        years
    }

    /// Categories ordered by their all-years total, descending.
    pub fn categories(&self) -> Vec<Vec<String>> {
        let mut totals: BTreeMap<&[String], f64> = BTreeMap::new();
        for p in &self.points {
            *totals.entry(p.key.as_slice()).or_insert(0.0) += p.total;
        }
        let mut out: Vec<(&[String], f64)> = totals.into_iter().collect();
        out.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        out.into_iter().map(|(k, _)| k.to_vec()).collect()
    }

    /// The time-ordered line for one category.
    pub fn line(&self, key: &[String]) -> Vec<(i64, f64)> {
        self.points
            .iter()
            .filter(|p| p.key == key)
            .map(|p| (p.year, p.total))
            .collect()
    }

    pub fn value(&self, year: i64, key: &[String]) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.year == year && p.key == key)
            .map(|p| p.total)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
