//! Runtime settings.
//!
//! Resolution order: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is honored through `dotenvy`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{DatasetId, DatasetSpec};
use crate::error::AppError;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

const ENV_CONFIG: &str = "SATUDATA_CONFIG";
const ENV_CACHE_TTL: &str = "SATUDATA_CACHE_TTL_SECS";
const ENV_HTTP_TIMEOUT: &str = "SATUDATA_HTTP_TIMEOUT_SECS";
const ENV_COERCION: &str = "SATUDATA_COERCION";
const ENV_LOG_DIR: &str = "SATUDATA_LOG_DIR";

/// What to do with a year/measure value that cannot be coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CoercionPolicy {
    /// Fail the whole dataset on the first bad value.
    #[default]
    Abort,
    /// Drop the offending row and keep going.
    SkipRow,
}

/// Per-dataset URL overrides (`[urls]` table).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlOverrides {
    pub blood_type: Option<String>,
    pub occupation: Option<String>,
    pub religion: Option<String>,
    pub marital_status: Option<String>,
}

impl UrlOverrides {
    fn slot(&mut self, id: DatasetId) -> &mut Option<String> {
        match id {
            DatasetId::BloodType => &mut self.blood_type,
            DatasetId::Occupation => &mut self.occupation,
            DatasetId::Religion => &mut self.religion,
            DatasetId::MaritalStatus => &mut self.marital_status,
        }
    }

    fn get(&self, id: DatasetId) -> Option<&str> {
        match id {
            DatasetId::BloodType => self.blood_type.as_deref(),
            DatasetId::Occupation => self.occupation.as_deref(),
            DatasetId::Religion => self.religion.as_deref(),
            DatasetId::MaritalStatus => self.marital_status.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub cache_ttl_secs: u64,
    /// `0` leaves the transport default in place.
    pub http_timeout_secs: u64,
    pub coercion: CoercionPolicy,
    pub log_dir: PathBuf,
    pub urls: UrlOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            coercion: CoercionPolicy::Abort,
            log_dir: PathBuf::from("logs"),
            urls: UrlOverrides::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path` (or `SATUDATA_CONFIG`) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let file = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

        let mut settings = match file {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::new(2, format!("Failed to read config '{}': {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| AppError::new(2, format!("Invalid config '{}': {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CACHE_TTL) {
            self.cache_ttl_secs = parse_u64(ENV_CACHE_TTL, &raw)?;
        }
        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT) {
            self.http_timeout_secs = parse_u64(ENV_HTTP_TIMEOUT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_COERCION) {
            self.coercion = CoercionPolicy::from_str(raw.trim(), true)
                .map_err(|_| AppError::new(2, format!("Invalid {ENV_COERCION} '{raw}' (expected abort or skip-row).")))?;
        }
        if let Some(raw) = lookup(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(raw);
        }
        for id in DatasetId::ALL {
            let key = format!("SATUDATA_URL_{}", id.slug().to_uppercase());
            if let Some(url) = lookup(&key) {
                *self.urls.slot(id) = Some(url);
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }

    pub fn url_for(&self, id: DatasetId) -> String {
        self.urls
            .get(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.default_url())
    }

    pub fn dataset_spec(&self, id: DatasetId) -> DatasetSpec {
        DatasetSpec::for_dataset(id, self.url_for(id))
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, AppError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| AppError::new(2, format!("Invalid {key} '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_portal() {
        let s = Settings::default();
        assert_eq!(s.cache_ttl(), Duration::from_secs(3600));
        assert_eq!(s.coercion, CoercionPolicy::Abort);
        assert!(s.url_for(DatasetId::Religion).ends_with("agama-4203/"));
    }

    #[test]
    fn toml_overrides_defaults() {
        let s = Settings::from_toml(
            r#"
cache_ttl_secs = 60
coercion = "skip-row"

[urls]
occupation = "http://localhost/pekerjaan"
"#,
        )
        .unwrap();
        assert_eq!(s.cache_ttl_secs, 60);
        assert_eq!(s.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert_eq!(s.coercion, CoercionPolicy::SkipRow);
        assert_eq!(s.url_for(DatasetId::Occupation), "http://localhost/pekerjaan");
        assert_eq!(s.url_for(DatasetId::BloodType), DatasetId::BloodType.default_url());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::from_toml("ttl = 5").is_err());
    }

    #[test]
    fn env_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SATUDATA_CACHE_TTL_SECS", "10"),
            ("SATUDATA_HTTP_TIMEOUT_SECS", "0"),
            ("SATUDATA_URL_MARITAL_STATUS", "http://mirror/kawin"),
        ]);
        let mut s = Settings::default();
        s.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.cache_ttl_secs, 10);
        assert_eq!(s.http_timeout(), None);
        assert_eq!(s.dataset_spec(DatasetId::MaritalStatus).api_url, "http://mirror/kawin");
    }

    #[test]
    fn bad_env_value_is_a_config_error() {
        let mut s = Settings::default();
        let err = s
            .apply_env(|k| (k == "SATUDATA_COERCION").then(|| "maybe".to_string()))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
