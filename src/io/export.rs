//! Export aggregated tables to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.
//! One column per `group_by` field, then the year and the summed total.

use std::io::Write;
use std::path::Path;

use crate::domain::{AggregatedSnapshot, TrendSeries};
use crate::error::AppError;

/// Write a snapshot table to `path`.
pub fn write_snapshot_csv(path: &Path, snapshot: &AggregatedSnapshot) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_snapshot(file, snapshot)
}

/// Write a trend table to `path`.
pub fn write_trend_csv(path: &Path, trend: &TrendSeries) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_trend(file, trend)
}

pub fn write_snapshot<W: Write>(writer: W, snapshot: &AggregatedSnapshot) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = snapshot.group_by.iter().map(String::as_str).collect();
    header.extend(["tahun", "jumlah"]);
    out.write_record(&header).map_err(csv_error)?;

    for entry in &snapshot.entries {
        let mut record = entry.key.clone();
        record.push(snapshot.year.to_string());
        record.push(fmt_total(entry.total));
        out.write_record(&record).map_err(csv_error)?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

pub fn write_trend<W: Write>(writer: W, trend: &TrendSeries) -> Result<(), AppError> {
    let mut out = csv::Writer::from_writer(writer);

    let mut header = vec!["tahun"];
    header.extend(trend.group_by.iter().map(String::as_str));
    header.push("jumlah");
    out.write_record(&header).map_err(csv_error)?;

    for point in &trend.points {
        let mut record = vec![point.year.to_string()];
        record.extend(point.key.iter().cloned());
        record.push(fmt_total(point.total));
        out.write_record(&record).map_err(csv_error)?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

/// Integral totals without a trailing `.0`.
fn fmt_total(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

fn csv_error(e: csv::Error) -> AppError {
    AppError::new(2, format!("Failed to write export CSV row: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoryTotal, TrendPoint};

    #[test]
    fn snapshot_csv_has_group_columns() {
        let snap = AggregatedSnapshot {
            year: 2023,
            group_by: vec!["nama_kecamatan".to_string(), "jenis_kelamin".to_string()],
            entries: vec![
                CategoryTotal { key: vec!["Garut Kota".to_string(), "L".to_string()], total: 1200.0 },
                CategoryTotal { key: vec!["Garut Kota".to_string(), "P".to_string()], total: 10.5 },
            ],
        };
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snap).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "nama_kecamatan,jenis_kelamin,tahun,jumlah\nGarut Kota,L,2023,1200\nGarut Kota,P,2023,10.5\n"
        );
    }

    #[test]
    fn trend_csv_writes_to_file() {
        let trend = TrendSeries {
            group_by: vec!["agama".to_string()],
            points: vec![
                TrendPoint { year: 2022, key: vec!["Islam".to_string()], total: 5.0 },
                TrendPoint { year: 2023, key: vec!["Islam".to_string()], total: 6.0 },
            ],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.csv");
        write_trend_csv(&path, &trend).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "tahun,agama,jumlah\n2022,Islam,5\n2023,Islam,6\n");
    }
}
