//! Dataset pipeline shared by the CLI commands and the dashboard.
//!
//! Every dataset goes fetch -> validate -> normalize. Aggregation happens
//! per view in `crate::report`, so front-ends only deal with presentation.

use std::sync::Arc;

use serde_json::Value;

use crate::config::{CoercionPolicy, Settings};
use crate::data::{Clock, Fetcher, validate};
use crate::domain::{DatasetId, DatasetSpec, NormalizedTable, RawRecord, RowList, View};
use crate::error::PipelineError;
use crate::io::ingest::{columns, normalize};
use crate::report::{ViewReport, build_view_report};

/// A fetched and shape-checked payload, before normalization.
#[derive(Debug, Clone)]
pub struct FetchedRows {
    pub raw: Arc<Value>,
    pub records: RowList,
}

/// One dataset after the full pipeline.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub id: DatasetId,
    pub raw: Arc<Value>,
    pub records: RowList,
    pub table: NormalizedTable,
}

/// State of the derived subdistrict/gender tab.
#[derive(Debug, Clone)]
pub enum Derived {
    Ready {
        source: DatasetId,
        raw: Arc<Value>,
        table: NormalizedTable,
    },
    /// No source dataset carried any rows.
    Unavailable,
}

/// One dataset tab of the combined dashboard.
#[derive(Debug, Clone)]
pub struct DatasetTab {
    pub id: DatasetId,
    pub raw: Arc<Value>,
    pub records: RowList,
    /// A normalization failure is local to this tab.
    pub table: Result<NormalizedTable, PipelineError>,
}

/// Every dataset of the combined dashboard.
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// In `DatasetId::ALL` order.
    pub datasets: Vec<DatasetTab>,
    /// A failure here is local to the derived tab.
    pub derived: Result<Derived, PipelineError>,
}

/// Fetch `spec.api_url` and extract its `pivot_data` rows.
pub fn fetch_rows<C: Clock>(fetcher: &Fetcher<C>, spec: &DatasetSpec) -> Result<FetchedRows, PipelineError> {
    let raw = fetcher.fetch(&spec.api_url).map_err(|source| PipelineError::Fetch {
        dataset: spec.name.clone(),
        source,
    })?;

    let records = validate(&raw).map_err(|source| PipelineError::Schema {
        dataset: spec.name.clone(),
        source,
        raw: raw.clone(),
    })?;

    Ok(FetchedRows { raw, records })
}

/// Run the pipeline for one dataset.
pub fn load_dataset<C: Clock>(
    fetcher: &Fetcher<C>,
    id: DatasetId,
    settings: &Settings,
) -> Result<LoadedDataset, PipelineError> {
    let spec = settings.dataset_spec(id);
    let FetchedRows { raw, records } = fetch_rows(fetcher, &spec)?;
    let table = normalize_rows(&spec, &raw, &records, settings.coercion)?;
    Ok(LoadedDataset { id, raw, records, table })
}

fn normalize_rows(
    spec: &DatasetSpec,
    raw: &Arc<Value>,
    records: &[RawRecord],
    policy: CoercionPolicy,
) -> Result<NormalizedTable, PipelineError> {
    let table = normalize(records, spec, policy)
        .map_err(|e| PipelineError::from_normalize(spec.name.clone(), e, raw.clone()))?;
    tracing::info!(dataset = %spec.name, rows = table.rows.len(), "dataset loaded");
    Ok(table)
}

/// Load all four datasets sequentially.
///
/// A fetch or schema failure aborts the whole load. Normalization errors are
/// kept on the dataset's own tab.
pub fn load_all<C: Clock>(fetcher: &Fetcher<C>, settings: &Settings) -> Result<Dashboard, PipelineError> {
    let mut datasets = Vec::with_capacity(DatasetId::ALL.len());
    for id in DatasetId::ALL {
        let spec = settings.dataset_spec(id);
        let FetchedRows { raw, records } = fetch_rows(fetcher, &spec).inspect_err(|e| {
            tracing::error!(dataset = %id, error = %e, "combined load aborted");
        })?;
        let table = normalize_rows(&spec, &raw, &records, settings.coercion);
        if let Err(e) = &table {
            tracing::warn!(dataset = %id, error = %e, "tab failed to normalize");
        }
        datasets.push(DatasetTab { id, raw, records, table });
    }

    let sources = View::SUBDISTRICT_SOURCES.iter().filter_map(|id| {
        datasets
            .iter()
            .find(|d| d.id == *id)
            .map(|d| (d.id, d.raw.clone(), d.records.as_slice()))
    });
    let derived = derive_subdistrict_gender(sources, settings.coercion);

    Ok(Dashboard { datasets, derived })
}

/// Build the derived tab from the first source whose row set is non-empty.
///
/// `sources` must already be in priority order.
pub fn derive_subdistrict_gender<'a, I>(sources: I, policy: CoercionPolicy) -> Result<Derived, PipelineError>
where
    I: IntoIterator<Item = (DatasetId, Arc<Value>, &'a [RawRecord])>,
{
    for (id, raw, records) in sources {
        if records.is_empty() {
            continue;
        }
        let source_spec = DatasetSpec::for_dataset(id, "");
        let available = columns(records);
        let spec = DatasetSpec::subdistrict_gender(&source_spec, available.iter().map(String::as_str));

        tracing::debug!(source = %id, spec = %spec.name, "deriving subdistrict/gender view");
        let table = normalize(records, &spec, policy)
            .map_err(|e| PipelineError::from_normalize(spec.name.clone(), e, raw.clone()))?;
        return Ok(Derived::Ready { source: id, raw, table });
    }
    Ok(Derived::Unavailable)
}

/// Derived tab for a single-view run: fetch sources in priority order until
/// one has rows. A source that fails to load is skipped.
pub fn load_subdistrict_gender<C: Clock>(
    fetcher: &Fetcher<C>,
    settings: &Settings,
) -> Result<Derived, PipelineError> {
    for id in View::SUBDISTRICT_SOURCES {
        match fetch_rows(fetcher, &settings.dataset_spec(id)) {
            Ok(fetched) if !fetched.records.is_empty() => {
                return derive_subdistrict_gender(
                    [(id, fetched.raw, fetched.records.as_slice())],
                    settings.coercion,
                );
            }
            Ok(_) => tracing::debug!(source = %id, "source has no rows"),
            Err(e) => tracing::warn!(source = %id, error = %e, "source skipped"),
        }
    }
    Ok(Derived::Unavailable)
}

/// Normalized table backing `view`, loading only what that view needs.
/// `Ok(None)` is the unavailable derived tab.
pub fn load_view<C: Clock>(
    fetcher: &Fetcher<C>,
    view: View,
    settings: &Settings,
) -> Result<Option<(Arc<Value>, NormalizedTable)>, PipelineError> {
    match view.dataset() {
        Some(id) => {
            let loaded = load_dataset(fetcher, id, settings)?;
            Ok(Some((loaded.raw, loaded.table)))
        }
        None => match load_subdistrict_gender(fetcher, settings)? {
            Derived::Ready { raw, table, .. } => Ok(Some((raw, table))),
            Derived::Unavailable => Ok(None),
        },
    }
}

impl Dashboard {
    pub fn dataset(&self, id: DatasetId) -> Option<&DatasetTab> {
        self.datasets.iter().find(|d| d.id == id)
    }

    /// Normalized table behind `view`. `Ok(None)` for the unavailable derived tab.
    pub fn table(&self, view: View) -> Result<Option<&NormalizedTable>, &PipelineError> {
        match view.dataset() {
            Some(id) => match self.dataset(id) {
                Some(d) => d.table.as_ref().map(Some),
                None => Ok(None),
            },
            None => match &self.derived {
                Ok(Derived::Ready { table, .. }) => Ok(Some(table)),
                Ok(Derived::Unavailable) => Ok(None),
                Err(e) => Err(e),
            },
        }
    }

    /// Report for `view` at `year` (most recent when `None`).
    pub fn report(&self, view: View, year: Option<i64>) -> Result<Option<ViewReport>, &PipelineError> {
        Ok(self.table(view)?.map(|t| build_view_report(view, t, year, None)))
    }
}
