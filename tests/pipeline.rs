//! End-to-end pipeline runs against a scripted API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use satudata_dash::app::pipeline::{Derived, load_all, load_dataset, load_view};
use satudata_dash::config::{CoercionPolicy, Settings};
use satudata_dash::data::{Fetcher, ManualClock, Transport, TtlCache};
use satudata_dash::domain::{DatasetId, View};
use satudata_dash::error::{FetchError, PipelineError};
use satudata_dash::report::{build_view_report, snapshot};

/// Serves canned bodies per URL and counts requests.
#[derive(Clone, Default)]
struct FakeApi {
    bodies: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeApi {
    fn serve(&self, settings: &Settings, id: DatasetId, body: Value) {
        self.bodies.lock().unwrap().insert(settings.url_for(id), body.to_string());
    }

    fn remove(&self, settings: &Settings, id: DatasetId) {
        self.bodies.lock().unwrap().remove(&settings.url_for(id));
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for FakeApi {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
    }
}

fn rows(rows: Value) -> Value {
    json!({ "data": { "pivot_data": rows } })
}

fn harness(settings: &Settings) -> (FakeApi, Fetcher<Arc<ManualClock>>, Arc<ManualClock>) {
    let api = FakeApi::default();
    let clock = Arc::new(ManualClock::new());
    let cache = TtlCache::with_clock(settings.cache_ttl(), clock.clone());
    let fetcher = Fetcher::new(Box::new(api.clone()), cache);
    (api, fetcher, clock)
}

fn serve_all(api: &FakeApi, settings: &Settings) {
    api.serve(
        settings,
        DatasetId::Religion,
        rows(json!([
            {"tahun": 2022, "agama": "ISLAM", "jenis_kelamin": "LAKI-LAKI", "jumlah": 1000},
            {"tahun": 2023, "agama": "ISLAM", "jenis_kelamin": "LAKI-LAKI", "jumlah": 1100},
            {"tahun": 2023, "agama": "ISLAM", "jenis_kelamin": "PEREMPUAN", "jumlah": 1050},
            {"tahun": 2023, "agama": "KRISTEN", "jenis_kelamin": "PEREMPUAN", "jumlah": 20},
        ])),
    );
    api.serve(
        settings,
        DatasetId::Occupation,
        rows(json!([{"tahun": 2023, "jenis_pekerjaan": "PETANI", "kecamatan": "CIBATU", "jumlah": 70}])),
    );
    api.serve(
        settings,
        DatasetId::MaritalStatus,
        rows(json!([{"tahun": 2023, "status_kawin": "KAWIN", "jenis_kelamin": "LAKI-LAKI", "jumlah": 40}])),
    );
    api.serve(
        settings,
        DatasetId::BloodType,
        rows(json!([
            {"tahun": 2023, "gol_drh": "A", "nama_kecamatan": "GARUT KOTA", "jenis_kelamin": "LAKI-LAKI", "jumlah": 30},
            {"tahun": 2023, "gol_drh": "O", "nama_kecamatan": "GARUT KOTA", "jenis_kelamin": "PEREMPUAN", "jumlah": 50},
        ])),
    );
}

#[test]
fn scenario_row_normalizes_and_aggregates() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    api.serve(
        &settings,
        DatasetId::BloodType,
        rows(json!([
            {"tahun": "2023", "jumlah": "100", "gol_drh": "A", "nama_kecamatan": "X", "jenis_kelamin": "L"}
        ])),
    );

    let loaded = load_dataset(&fetcher, DatasetId::BloodType, &settings).unwrap();
    let row = &loaded.table.rows[0];
    assert_eq!(row.year, 2023);
    assert_eq!(row.measure, 100.0);

    let snap = snapshot(&loaded.table.rows, 2023, &["gol_drh"]);
    assert_eq!(snap.entries.len(), 1);
    assert_eq!(snap.get(&["A"]), Some(100.0));
}

#[test]
fn missing_pivot_data_is_a_schema_error_with_payload() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    api.serve(&settings, DatasetId::Religion, json!({"data": {"rows": []}}));

    let err = load_dataset(&fetcher, DatasetId::Religion, &settings).unwrap_err();
    assert!(matches!(err, PipelineError::Schema { .. }));
    assert_eq!(err.raw_payload(), Some(&json!({"data": {"rows": []}})));
}

#[test]
fn non_numeric_measure_fails_the_dataset() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    api.serve(
        &settings,
        DatasetId::Religion,
        rows(json!([
            {"tahun": 2023, "agama": "ISLAM", "jenis_kelamin": "L", "jumlah": 5},
            {"tahun": 2023, "agama": "HINDU", "jenis_kelamin": "L", "jumlah": "abc"},
        ])),
    );

    let err = load_dataset(&fetcher, DatasetId::Religion, &settings).unwrap_err();
    match err {
        PipelineError::TypeCoercion { source, .. } => {
            assert_eq!(source.field, "jumlah");
            assert_eq!(source.row, 1);
        }
        other => panic!("expected a coercion error, got {other:?}"),
    }

    let lenient = Settings { coercion: CoercionPolicy::SkipRow, ..Settings::default() };
    let loaded = load_dataset(&fetcher, DatasetId::Religion, &lenient).unwrap();
    assert_eq!(loaded.table.rows.len(), 1);
    assert_eq!(loaded.table.dropped_invalid, 1);
}

#[test]
fn occupation_without_gender_column_loads() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    serve_all(&api, &settings);

    let loaded = load_dataset(&fetcher, DatasetId::Occupation, &settings).unwrap();
    assert!(!loaded.table.has_field("jenis_kelamin"));

    let report = build_view_report(View::Occupation, &loaded.table, None, None);
    let titles: Vec<&str> = report.panels.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Jumlah Penduduk", "Kecamatan"]);
}

#[test]
fn combined_view_fails_fast_on_any_dataset() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    serve_all(&api, &settings);
    api.remove(&settings, DatasetId::BloodType);

    let err = load_all(&fetcher, &settings).unwrap_err();
    assert!(matches!(err, PipelineError::Fetch { .. }));
    assert_eq!(err.dataset(), "blood_type");
}

#[test]
fn derived_tab_follows_source_priority() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    serve_all(&api, &settings);
    api.serve(&settings, DatasetId::Religion, rows(json!([])));
    api.remove(&settings, DatasetId::MaritalStatus);

    let (_, table) = load_view(&fetcher, View::SubdistrictGender, &settings).unwrap().unwrap();
    assert_eq!(table.spec.category_fields, vec!["nama_kecamatan"]);

    let report = build_view_report(View::SubdistrictGender, &table, Some(2023), None);
    let gender = &report.panels[1];
    assert_eq!(gender.title, "Jenis Kelamin");
    assert_eq!(gender.snapshot.total(), 80.0);
}

#[test]
fn combined_view_keeps_derived_errors_local() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    serve_all(&api, &settings);

    // Religion rows carry no subdistrict column.
    let dash = load_all(&fetcher, &settings).unwrap();
    assert!(matches!(dash.derived, Err(PipelineError::ColumnsMissing { .. })));
    assert!(dash.report(View::SubdistrictGender, None).is_err());

    // Empty year is an empty state, not an error.
    let empty = dash.report(View::BloodType, Some(1999)).unwrap().unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.years, vec![2023]);
}

#[test]
fn empty_religion_hands_the_derived_tab_to_marital_status() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    serve_all(&api, &settings);
    api.serve(&settings, DatasetId::Religion, rows(json!([])));
    api.serve(
        &settings,
        DatasetId::MaritalStatus,
        rows(json!([
            {"tahun": 2023, "status_kawin": "KAWIN", "jenis_kelamin": "LAKI-LAKI", "kecamatan": "CIBATU", "jumlah": 40},
            {"tahun": 2023, "status_kawin": "KAWIN", "jenis_kelamin": "PEREMPUAN", "kecamatan": "CIBATU", "jumlah": 45},
        ])),
    );

    let dash = load_all(&fetcher, &settings).unwrap();
    assert!(matches!(
        dash.report(View::Religion, None),
        Err(PipelineError::ColumnsMissing { .. })
    ));

    match &dash.derived {
        Ok(Derived::Ready { source, table, .. }) => {
            assert_eq!(*source, DatasetId::MaritalStatus);
            assert_eq!(table.spec.category_fields, vec!["kecamatan"]);
        }
        other => panic!("unexpected derived tab: {other:?}"),
    }
    let report = dash.report(View::SubdistrictGender, Some(2023)).unwrap().unwrap();
    assert_eq!(report.primary().unwrap().snapshot.get(&["CIBATU"]), Some(85.0));
}

#[test]
fn coercion_failure_keeps_other_tabs_rendering() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    serve_all(&api, &settings);
    api.serve(
        &settings,
        DatasetId::Religion,
        rows(json!([{"tahun": 2023, "agama": "ISLAM", "jenis_kelamin": "L", "jumlah": "abc"}])),
    );

    let dash = load_all(&fetcher, &settings).unwrap();
    match dash.report(View::Religion, None) {
        Err(PipelineError::TypeCoercion { source, .. }) => assert_eq!(source.field, "jumlah"),
        other => panic!("expected a coercion error, got {other:?}"),
    }
    for view in [View::Occupation, View::MaritalStatus, View::BloodType] {
        let report = dash.report(view, None).unwrap().unwrap();
        assert!(!report.is_empty(), "{view:?} should still render");
    }
}

#[test]
fn derived_tab_unavailable_when_sources_are_empty() {
    let settings = Settings::default();
    let (api, fetcher, _) = harness(&settings);
    for id in View::SUBDISTRICT_SOURCES {
        api.serve(&settings, id, rows(json!([])));
    }
    assert!(load_view(&fetcher, View::SubdistrictGender, &settings).unwrap().is_none());
}

#[test]
fn repeated_loads_within_ttl_hit_the_cache() {
    let settings = Settings::default();
    let (api, fetcher, clock) = harness(&settings);
    serve_all(&api, &settings);

    load_all(&fetcher, &settings).unwrap();
    assert_eq!(api.calls(), 4);

    clock.advance(Duration::from_secs(settings.cache_ttl_secs - 1));
    load_all(&fetcher, &settings).unwrap();
    assert_eq!(api.calls(), 4);

    clock.advance(Duration::from_secs(2));
    load_all(&fetcher, &settings).unwrap();
    assert_eq!(api.calls(), 8);
}
