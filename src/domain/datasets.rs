//! Static dataset descriptors and the dashboard views built on top of them.
//!
//! A `DatasetSpec` describes one remote API source: where to fetch it and which
//! columns a row must carry. A `View` describes one dashboard tab: which
//! dataset feeds it and which groupings it shows.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const YEAR_FIELD: &str = "tahun";
pub const MEASURE_FIELD: &str = "jumlah";
pub const GENDER_FIELD: &str = "jenis_kelamin";

/// Subdistrict column names, in lookup preference order.
pub const SUBDISTRICT_FIELDS: [&str; 2] = ["nama_kecamatan", "kecamatan"];

const API_BASE: &str = "https://satudata-api.garutkab.go.id/api/datasets";

/// One of the four population datasets served by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetId {
    BloodType,
    Occupation,
    Religion,
    MaritalStatus,
}

impl DatasetId {
    pub const ALL: [DatasetId; 4] = [
        DatasetId::Religion,
        DatasetId::Occupation,
        DatasetId::MaritalStatus,
        DatasetId::BloodType,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            DatasetId::BloodType => "Golongan Darah",
            DatasetId::Occupation => "Pekerjaan",
            DatasetId::Religion => "Agama",
            DatasetId::MaritalStatus => "Status Perkawinan",
        }
    }

    /// Stable machine name (used in file names and config keys).
    pub fn slug(self) -> &'static str {
        match self {
            DatasetId::BloodType => "blood_type",
            DatasetId::Occupation => "occupation",
            DatasetId::Religion => "religion",
            DatasetId::MaritalStatus => "marital_status",
        }
    }

    pub fn default_url(self) -> String {
        let path = match self {
            DatasetId::BloodType => "jumlah-penduduk-kabupaten-garut-berdasarkan-golongan-darah-4167",
            DatasetId::Occupation => "jumlah-penduduk-kabupaten-garut-berdasarkan-pekerjaan-4095",
            DatasetId::Religion => "jumlah-penduduk-kabupaten-garut-berdasarkan-agama-4203",
            DatasetId::MaritalStatus => "jumlah-penduduk-kabupaten-garut-berdasarkan-status-kawin-4203",
        };
        format!("{API_BASE}/{path}/")
    }

    /// The column holding this dataset's primary category.
    pub fn category_field(self) -> &'static str {
        match self {
            DatasetId::BloodType => "gol_drh",
            DatasetId::Occupation => "jenis_pekerjaan",
            DatasetId::Religion => "agama",
            DatasetId::MaritalStatus => "status_kawin",
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Declarative schema for one remote dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSpec {
    /// Label used in errors, logs and file names.
    pub name: String,
    pub api_url: String,
    pub required_fields: Vec<String>,
    /// Fields that become required only when the fetched rows carry them.
    pub optional_fields: Vec<String>,
    pub category_fields: Vec<String>,
    pub measure_field: String,
    pub year_field: String,
}

impl DatasetSpec {
    /// Built-in descriptor for `id`, fetched from `api_url`.
    pub fn for_dataset(id: DatasetId, api_url: impl Into<String>) -> Self {
        let category = id.category_field();
        let (extra, optional): (&[&str], &[&str]) = match id {
            DatasetId::BloodType => (&["nama_kecamatan", GENDER_FIELD], &[]),
            DatasetId::Occupation => (&["kecamatan"], &[GENDER_FIELD]),
            DatasetId::Religion | DatasetId::MaritalStatus => (&[GENDER_FIELD], &[]),
        };

        let mut required = vec![YEAR_FIELD.to_string(), category.to_string(), MEASURE_FIELD.to_string()];
        required.extend(extra.iter().map(|f| f.to_string()));

        Self {
            name: id.slug().to_string(),
            api_url: api_url.into(),
            required_fields: required,
            optional_fields: optional.iter().map(|f| f.to_string()).collect(),
            category_fields: vec![category.to_string()],
            measure_field: MEASURE_FIELD.to_string(),
            year_field: YEAR_FIELD.to_string(),
        }
    }

    /// Spec for the derived "subdistrict and gender" tab, resolved against the
    /// columns of the borrowed source dataset.
    pub fn subdistrict_gender<'a>(
        source: &DatasetSpec,
        columns: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let columns: Vec<&str> = columns.into_iter().collect();
        let subdistrict = SUBDISTRICT_FIELDS
            .iter()
            .find(|f| columns.contains(f))
            .copied()
            .unwrap_or(SUBDISTRICT_FIELDS[1]);

        Self {
            name: format!("subdistrict_gender({})", source.name),
            api_url: source.api_url.clone(),
            required_fields: vec![
                source.year_field.clone(),
                subdistrict.to_string(),
                source.measure_field.clone(),
                GENDER_FIELD.to_string(),
            ],
            optional_fields: Vec::new(),
            category_fields: vec![subdistrict.to_string()],
            measure_field: source.measure_field.clone(),
            year_field: source.year_field.clone(),
        }
    }

    /// Fields other than year and measure that a normalized row keeps.
    pub fn dimension_fields(&self) -> impl Iterator<Item = &str> {
        self.required_fields
            .iter()
            .chain(self.optional_fields.iter())
            .map(String::as_str)
            .filter(move |f| *f != self.year_field && *f != self.measure_field)
    }
}

/// One dashboard tab, in combined tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Religion,
    SubdistrictGender,
    MaritalStatus,
    Occupation,
    BloodType,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Religion,
        View::SubdistrictGender,
        View::MaritalStatus,
        View::Occupation,
        View::BloodType,
    ];

    /// Priority order of datasets the derived tab may borrow from.
    pub const SUBDISTRICT_SOURCES: [DatasetId; 3] =
        [DatasetId::Religion, DatasetId::MaritalStatus, DatasetId::BloodType];

    pub fn title(self) -> &'static str {
        match self {
            View::Religion => "Berdasarkan Agama",
            View::SubdistrictGender => "Berdasarkan Kecamatan & Jenis Kelamin",
            View::MaritalStatus => "Berdasarkan Perkawinan",
            View::Occupation => "Berdasarkan Pekerjaan",
            View::BloodType => "Berdasarkan Golongan Darah",
        }
    }

    /// The dataset backing this view, `None` for the derived tab.
    pub fn dataset(self) -> Option<DatasetId> {
        match self {
            View::Religion => Some(DatasetId::Religion),
            View::MaritalStatus => Some(DatasetId::MaritalStatus),
            View::Occupation => Some(DatasetId::Occupation),
            View::BloodType => Some(DatasetId::BloodType),
            View::SubdistrictGender => None,
        }
    }

    /// Panels shown for the selected year. The first one is the primary
    /// panel and also drives the trend chart.
    pub fn panels(self, spec: &DatasetSpec) -> Vec<Panel> {
        let primary = Panel::new("Jumlah Penduduk", &spec.category_fields);
        let gender = Panel::new("Jenis Kelamin", &[GENDER_FIELD]);
        match self {
            View::Religion | View::MaritalStatus => vec![primary, gender],
            View::Occupation => vec![primary, Panel::new("Kecamatan", &["kecamatan"]), gender],
            View::BloodType => vec![
                primary,
                Panel::new("Kecamatan", &["nama_kecamatan"]),
                Panel::new("Kecamatan & Jenis Kelamin", &["nama_kecamatan", GENDER_FIELD]),
            ],
            View::SubdistrictGender => {
                let subdistrict = spec.category_fields[0].as_str();
                vec![
                    primary,
                    gender,
                    Panel::new("Kecamatan & Jenis Kelamin", &[subdistrict, GENDER_FIELD]),
                ]
            }
        }
    }

    pub fn next(self) -> View {
        let idx = View::ALL.iter().position(|v| *v == self).unwrap_or(0);
        View::ALL[(idx + 1) % View::ALL.len()]
    }

    pub fn prev(self) -> View {
        let idx = View::ALL.iter().position(|v| *v == self).unwrap_or(0);
        View::ALL[(idx + View::ALL.len() - 1) % View::ALL.len()]
    }
}

/// A titled grouping for one snapshot panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Panel {
    pub title: String,
    pub group_by: Vec<String>,
}

impl Panel {
    pub fn new<S: AsRef<str>>(title: &str, group_by: &[S]) -> Self {
        Self {
            title: title.to_string(),
            group_by: group_by.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }
}
