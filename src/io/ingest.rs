//! Row normalization.
//!
//! This module turns the untyped `pivot_data` rows into `NormalizedRow`s:
//!
//! - **Strict schema**: every required field must exist as a column somewhere in
//!   the row set, otherwise the dataset fails with `ColumnsMissingError`
//! - **Incomplete rows** (a required field null or absent) are dropped and counted
//! - **Coercion**: year to integer, measure to `f64`; a bad value either fails the
//!   dataset or drops the row, depending on `CoercionPolicy`

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::config::CoercionPolicy;
use crate::domain::{DatasetSpec, NormalizedRow, NormalizedTable, RawRecord};
use crate::error::{ColumnsMissingError, NormalizeError, TypeCoercionError};

/// Union of the keys of every row (the "columns" of the row set).
pub fn columns(rows: &[RawRecord]) -> BTreeSet<String> {
    rows.iter().flat_map(|r| r.keys().cloned()).collect()
}

/// Required fields of `spec`, plus each optional field that `columns` carries.
pub fn resolve_fields(spec: &DatasetSpec, columns: &BTreeSet<String>) -> Vec<String> {
    let mut fields = spec.required_fields.clone();
    for f in &spec.optional_fields {
        if columns.contains(f) && !fields.contains(f) {
            fields.push(f.clone());
        }
    }
    fields
}

pub fn normalize(
    rows: &[RawRecord],
    spec: &DatasetSpec,
    policy: CoercionPolicy,
) -> Result<NormalizedTable, NormalizeError> {
    let available = columns(rows);
    let fields = resolve_fields(spec, &available);

    let missing: BTreeSet<String> = fields
        .iter()
        .filter(|f| !available.contains(*f))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ColumnsMissingError { missing, available }.into());
    }

    let dims: Vec<&String> = fields
        .iter()
        .filter(|f| **f != spec.year_field && **f != spec.measure_field)
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    let mut dropped_incomplete = 0usize;
    let mut dropped_invalid = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        let complete = fields
            .iter()
            .all(|f| row.get(f).is_some_and(|v| !v.is_null()));
        if !complete {
            dropped_incomplete += 1;
            continue;
        }

        let coerced = coerce_field(row, &spec.year_field, idx, "integer", coerce_year).and_then(|year| {
            coerce_field(row, &spec.measure_field, idx, "number", coerce_measure).map(|m| (year, m))
        });

        let (year, measure) = match coerced {
            Ok(v) => v,
            Err(err) => match policy {
                CoercionPolicy::Abort => {
                    tracing::warn!(dataset = %spec.name, error = %err, "coercion failed");
                    return Err(err.into());
                }
                CoercionPolicy::SkipRow => {
                    tracing::debug!(dataset = %spec.name, error = %err, "dropping row");
                    dropped_invalid += 1;
                    continue;
                }
            },
        };

        let dims = dims
            .iter()
            .map(|f| ((*f).clone(), category_text(&row[f.as_str()])))
            .collect::<BTreeMap<_, _>>();

        out.push(NormalizedRow { year, measure, dims });
    }

    if dropped_incomplete > 0 || dropped_invalid > 0 {
        tracing::info!(
            dataset = %spec.name,
            rows = rows.len(),
            dropped_incomplete,
            dropped_invalid,
            "rows dropped during normalization"
        );
    }

    Ok(NormalizedTable {
        spec: spec.clone(),
        fields,
        rows: out,
        rows_read: rows.len(),
        dropped_incomplete,
        dropped_invalid,
    })
}

fn coerce_field<T>(
    row: &RawRecord,
    field: &str,
    idx: usize,
    target: &'static str,
    coerce: fn(&Value) -> Option<T>,
) -> Result<T, TypeCoercionError> {
    let value = &row[field];
    coerce(value).ok_or_else(|| TypeCoercionError {
        field: field.to_string(),
        value: value.to_string(),
        row: idx,
        target,
    })
}

/// Integers, integral floats, and strings holding an integer.
fn coerce_year(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Numbers and numeric strings; non-finite values are rejected.
fn coerce_measure(v: &Value) -> Option<f64> {
    let f = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn category_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::{DatasetId, RowList};

    fn rows(v: Value) -> RowList {
        crate::data::schema::validate(&json!({"data": {"pivot_data": v}})).unwrap()
    }

    fn blood_type() -> DatasetSpec {
        DatasetSpec::for_dataset(DatasetId::BloodType, "http://test/goldarah")
    }

    #[test]
    fn blood_type_row_is_coerced() {
        let input = rows(json!([
            {"tahun": 2023, "gol_drh": "A", "jumlah": "100", "nama_kecamatan": "X", "jenis_kelamin": "L"}
        ]));
        let table = normalize(&input, &blood_type(), CoercionPolicy::Abort).unwrap();
        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.year, 2023);
        assert_eq!(row.measure, 100.0);
        assert_eq!(row.dim("gol_drh"), Some("A"));
        assert_eq!(row.dim("nama_kecamatan"), Some("X"));
    }

    #[test]
    fn missing_column_is_a_hard_stop() {
        let input = rows(json!([{"tahun": 2023, "gol_drh": "A", "jumlah": 1, "nama_kecamatan": "X"}]));
        let err = normalize(&input, &blood_type(), CoercionPolicy::Abort).unwrap_err();
        let NormalizeError::ColumnsMissing(err) = err else {
            panic!("expected ColumnsMissing, got {err:?}");
        };
        assert_eq!(err.missing.iter().collect::<Vec<_>>(), vec!["jenis_kelamin"]);
        assert!(err.available.contains("gol_drh"));
    }

    #[test]
    fn empty_row_set_has_no_columns() {
        let err = normalize(&[], &blood_type(), CoercionPolicy::Abort).unwrap_err();
        assert!(matches!(err, NormalizeError::ColumnsMissing(e) if e.missing.len() == 5));
    }

    #[test]
    fn incomplete_rows_are_dropped() {
        let input = rows(json!([
            {"tahun": 2023, "gol_drh": "A", "jumlah": 10, "nama_kecamatan": "X", "jenis_kelamin": "L"},
            {"tahun": 2023, "gol_drh": null, "jumlah": 10, "nama_kecamatan": "X", "jenis_kelamin": "L"},
            {"tahun": 2023, "jumlah": 10, "nama_kecamatan": "X", "jenis_kelamin": "P"},
            {"tahun": null, "gol_drh": "B", "jumlah": "bad", "nama_kecamatan": "Y", "jenis_kelamin": "P"}
        ]));
        let table = normalize(&input, &blood_type(), CoercionPolicy::Abort).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.dropped_incomplete, 3);
        assert_eq!(table.rows_read, 4);
    }

    #[test]
    fn normalizing_twice_drops_nothing_more() {
        let spec = blood_type();
        let input = rows(json!([
            {"tahun": "2022", "gol_drh": "O", "jumlah": 7.5, "nama_kecamatan": "X", "jenis_kelamin": "L"},
            {"tahun": 2023, "gol_drh": "AB", "jumlah": "3", "nama_kecamatan": "Y", "jenis_kelamin": "P", "extra": 1},
            {"tahun": 2023, "gol_drh": "AB", "jumlah": null, "nama_kecamatan": "Y", "jenis_kelamin": "P"}
        ]));
        let once = normalize(&input, &spec, CoercionPolicy::Abort).unwrap();
        let twice = normalize(&once.to_records(), &spec, CoercionPolicy::Abort).unwrap();
        assert_eq!(once.rows, twice.rows);
        assert_eq!(twice.dropped_incomplete, 0);
    }

    #[test]
    fn bad_measure_aborts_by_default() {
        let input = rows(json!([
            {"tahun": 2023, "gol_drh": "A", "jumlah": "100", "nama_kecamatan": "X", "jenis_kelamin": "L"},
            {"tahun": 2023, "gol_drh": "B", "jumlah": "abc", "nama_kecamatan": "X", "jenis_kelamin": "L"}
        ]));
        let err = normalize(&input, &blood_type(), CoercionPolicy::Abort).unwrap_err();
        let NormalizeError::TypeCoercion(err) = err else {
            panic!("expected TypeCoercion, got {err:?}");
        };
        assert_eq!(err.field, "jumlah");
        assert_eq!(err.value, "\"abc\"");
        assert_eq!(err.row, 1);
    }

    #[test]
    fn bad_measure_can_skip_the_row() {
        let input = rows(json!([
            {"tahun": 2023, "gol_drh": "A", "jumlah": "100", "nama_kecamatan": "X", "jenis_kelamin": "L"},
            {"tahun": 2023, "gol_drh": "B", "jumlah": "abc", "nama_kecamatan": "X", "jenis_kelamin": "L"}
        ]));
        let table = normalize(&input, &blood_type(), CoercionPolicy::SkipRow).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.dropped_invalid, 1);
    }

    #[test]
    fn occupation_without_gender_column() {
        let spec = DatasetSpec::for_dataset(DatasetId::Occupation, "http://test/pekerjaan");
        let input = rows(json!([
            {"tahun": 2024, "jenis_pekerjaan": "PETANI", "jumlah": 12, "kecamatan": "Cibatu"}
        ]));
        let table = normalize(&input, &spec, CoercionPolicy::Abort).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(!table.has_field("jenis_kelamin"));
    }

    #[test]
    fn occupation_gender_becomes_required_when_present() {
        let spec = DatasetSpec::for_dataset(DatasetId::Occupation, "http://test/pekerjaan");
        let input = rows(json!([
            {"tahun": 2024, "jenis_pekerjaan": "PETANI", "jumlah": 12, "kecamatan": "Cibatu", "jenis_kelamin": "L"},
            {"tahun": 2024, "jenis_pekerjaan": "GURU", "jumlah": 3, "kecamatan": "Cibatu"}
        ]));
        let table = normalize(&input, &spec, CoercionPolicy::Abort).unwrap();
        assert!(table.has_field("jenis_kelamin"));
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].dim("jenis_kelamin"), Some("L"));
    }

    #[test]
    fn year_coercion_rules() {
        assert_eq!(coerce_year(&json!(2023)), Some(2023));
        assert_eq!(coerce_year(&json!(2023.0)), Some(2023));
        assert_eq!(coerce_year(&json!(" 2021 ")), Some(2021));
        assert_eq!(coerce_year(&json!(-5)), Some(-5));
        assert_eq!(coerce_year(&json!(2023.5)), None);
        assert_eq!(coerce_year(&json!("2023a")), None);
        assert_eq!(coerce_year(&json!(true)), None);
    }

    #[test]
    fn measure_coercion_rules() {
        assert_eq!(coerce_measure(&json!("1.5e3")), Some(1500.0));
        assert_eq!(coerce_measure(&json!(-4)), Some(-4.0));
        assert_eq!(coerce_measure(&json!("NaN")), None);
        assert_eq!(coerce_measure(&json!("inf")), None);
        assert_eq!(coerce_measure(&json!([1])), None);
    }

    #[test]
    fn numeric_categories_use_json_text() {
        assert_eq!(category_text(&json!(12)), "12");
        assert_eq!(category_text(&json!("A")), "A");
    }
}
