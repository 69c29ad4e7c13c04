//! Debug bundle writer for inspecting raw API payloads.
//!
//! A bundle is a markdown file `debug/<dataset>_<timestamp>.md` holding the
//! error (if any), the columns found in the rows, and the pretty-printed payload.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde_json::Value;

use crate::data::validate;
use crate::error::{AppError, PipelineError};
use crate::io::ingest::columns;

pub const DEFAULT_DEBUG_DIR: &str = "debug";

/// Dump the payload carried by a failed pipeline run.
pub fn write_error_bundle(dir: &Path, err: &PipelineError) -> Result<PathBuf, AppError> {
    write_debug_bundle(dir, err.dataset(), err.raw_payload(), Some(err))
}

/// Write a bundle for `dataset`. Either part may be missing (a fetch failure
/// has no payload; a healthy dataset has no error).
pub fn write_debug_bundle(
    dir: &Path,
    dataset: &str,
    raw: Option<&Value>,
    err: Option<&PipelineError>,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{}_{ts}.md", file_stem(dataset)));

    let mut file = File::create(&path).map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    write_bundle(&mut file, dataset, raw, err)
        .map_err(|e| AppError::new(4, format!("Failed to write debug file '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), dataset, "debug bundle written");
    Ok(path)
}

fn write_bundle<W: Write>(
    out: &mut W,
    dataset: &str,
    raw: Option<&Value>,
    err: Option<&PipelineError>,
) -> std::io::Result<()> {
    writeln!(out, "# satudata debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(out, "- dataset: {dataset}")?;

    if let Some(err) = err {
        writeln!(out, "\n## Error")?;
        writeln!(out, "{err}")?;
        if let PipelineError::ColumnsMissing { source, .. } = err {
            writeln!(out, "\n- missing: {}", join(source.missing.iter()))?;
            writeln!(out, "- available: {}", join(source.available.iter()))?;
        }
    }

    let Some(raw) = raw else {
        writeln!(out, "\n(no payload)")?;
        return Ok(());
    };

    writeln!(out, "\n## Columns")?;
    match validate(raw) {
        Ok(rows) => {
            writeln!(out, "- rows: {}", rows.len())?;
            writeln!(out, "- columns: {}", join(columns(&rows).iter()))?;
        }
        Err(e) => writeln!(out, "- {e}")?,
    }

    writeln!(out, "\n## Raw payload")?;
    writeln!(out, "```json")?;
    let pretty = serde_json::to_string_pretty(raw).map_err(std::io::Error::other)?;
    writeln!(out, "{pretty}")?;
    writeln!(out, "```")?;
    Ok(())
}

/// `subdistrict_gender(religion)` -> `subdistrict_gender_religion`.
fn file_stem(dataset: &str) -> String {
    let stem: String = dataset
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    stem.trim_matches('_').to_string()
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}
