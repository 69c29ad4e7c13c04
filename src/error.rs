//! Error types.
//!
//! Each pipeline stage has its own error. `PipelineError` adds the dataset
//! name (and the raw payload, when one was fetched) so a view can render a
//! diagnostic panel. Everything collapses into `AppError` at the binary
//! boundary, which only carries an exit code and a message.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Network or decoding failure while retrieving a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("response from {url} is not valid JSON: {message}")]
    InvalidJson { url: String, message: String },
}

/// The payload does not nest a list at `data.pivot_data`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected a list at 'data.pivot_data': {reason}")]
pub struct SchemaError {
    pub reason: String,
}

/// Required columns are absent from the whole row set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("required columns not found: {}; available columns: {}", join(.missing), join(.available))]
pub struct ColumnsMissingError {
    pub missing: BTreeSet<String>,
    pub available: BTreeSet<String>,
}

/// A year or measure value that cannot be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {field} value {value} in row {row} to {target}")]
pub struct TypeCoercionError {
    pub field: String,
    /// The offending value, as JSON text.
    pub value: String,
    /// Zero-based index in the fetched row set.
    pub row: usize,
    pub target: &'static str,
}

/// Normalizer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    ColumnsMissing(#[from] ColumnsMissingError),
    #[error(transparent)]
    TypeCoercion(#[from] TypeCoercionError),
}

/// A failed dataset pipeline, with enough context for a diagnostic view.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("failed to fetch {dataset}: {source}")]
    Fetch { dataset: String, source: FetchError },

    #[error("unexpected payload structure for {dataset}: {source}")]
    Schema {
        dataset: String,
        source: SchemaError,
        raw: Arc<Value>,
    },

    #[error("{dataset}: {source}")]
    ColumnsMissing {
        dataset: String,
        source: ColumnsMissingError,
        raw: Arc<Value>,
    },

    #[error("{dataset}: {source}")]
    TypeCoercion {
        dataset: String,
        source: TypeCoercionError,
        raw: Arc<Value>,
    },
}

impl PipelineError {
    pub fn from_normalize(dataset: impl Into<String>, err: NormalizeError, raw: Arc<Value>) -> Self {
        let dataset = dataset.into();
        match err {
            NormalizeError::ColumnsMissing(source) => PipelineError::ColumnsMissing { dataset, source, raw },
            NormalizeError::TypeCoercion(source) => PipelineError::TypeCoercion { dataset, source, raw },
        }
    }

    pub fn dataset(&self) -> &str {
        match self {
            PipelineError::Fetch { dataset, .. }
            | PipelineError::Schema { dataset, .. }
            | PipelineError::ColumnsMissing { dataset, .. }
            | PipelineError::TypeCoercion { dataset, .. } => dataset,
        }
    }

    /// The fetched document, for the raw payload dump.
    pub fn raw_payload(&self) -> Option<&Value> {
        match self {
            PipelineError::Fetch { .. } => None,
            PipelineError::Schema { raw, .. }
            | PipelineError::ColumnsMissing { raw, .. }
            | PipelineError::TypeCoercion { raw, .. } => Some(raw.as_ref()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(4, err.to_string())
    }
}

fn join(set: &BTreeSet<String>) -> String {
    if set.is_empty() {
        return "(none)".to_string();
    }
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_missing_lists_both_sets() {
        let err = ColumnsMissingError {
            missing: ["jenis_kelamin".to_string()].into_iter().collect(),
            available: ["jumlah".to_string(), "tahun".to_string()].into_iter().collect(),
        };
        assert_eq!(
            err.to_string(),
            "required columns not found: jenis_kelamin; available columns: jumlah, tahun"
        );
    }

    #[test]
    fn pipeline_error_keeps_raw_payload() {
        let raw = Arc::new(serde_json::json!({"data": {}}));
        let err = PipelineError::Schema {
            dataset: "religion".to_string(),
            source: SchemaError { reason: "missing key 'pivot_data'".to_string() },
            raw: raw.clone(),
        };
        assert_eq!(err.dataset(), "religion");
        assert_eq!(err.raw_payload(), Some(raw.as_ref()));

        let app: AppError = err.into();
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().contains("pivot_data"));
    }
}
