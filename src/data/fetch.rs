//! Satu Data API retrieval.
//!
//! `Fetcher` wraps a `Transport` (the network GET) with the TTL cache. Within
//! the TTL window repeated fetches of one URL are served from memory. Failures
//! are not cached, so the next call retries.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::Settings;
use crate::data::cache::{Clock, SystemClock, TtlCache};
use crate::error::{AppError, FetchError};

/// A plain HTTP GET returning the response body.
pub trait Transport {
    fn get(&self, url: &str) -> Result<String, FetchError>;
}

/// Blocking `reqwest` transport. No headers, parameters or auth are sent.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send().map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.text().map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

pub struct Fetcher<C: Clock = SystemClock> {
    transport: Box<dyn Transport>,
    cache: TtlCache<C>,
}

impl Fetcher<SystemClock> {
    /// HTTP fetcher configured from `settings` (timeout and cache TTL).
    pub fn from_settings(settings: &Settings) -> Result<Self, AppError> {
        let transport = HttpTransport::new(settings.http_timeout())?;
        Ok(Self::new(Box::new(transport), TtlCache::new(settings.cache_ttl())))
    }
}

impl<C: Clock> Fetcher<C> {
    pub fn new(transport: Box<dyn Transport>, cache: TtlCache<C>) -> Self {
        Self { transport, cache }
    }

    /// Fetch and parse the JSON document at `url`, honoring the cache.
    pub fn fetch(&self, url: &str) -> Result<Arc<Value>, FetchError> {
        if let Some(doc) = self.cache.get(url) {
            tracing::debug!(url, "cache hit");
            return Ok(doc);
        }

        tracing::info!(url, "fetching");
        let body = self.transport.get(url).inspect_err(|e| {
            tracing::warn!(url, error = %e, "fetch failed");
        })?;

        let doc: Value = serde_json::from_str(&body).map_err(|e| FetchError::InvalidJson {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let doc = Arc::new(doc);
        self.cache.insert(url, doc.clone());
        Ok(doc)
    }

    /// Drop the cached document for `url` so the next fetch hits the network.
    pub fn invalidate(&self, url: &str) {
        self.cache.invalidate(url);
    }

    pub fn cache(&self) -> &TtlCache<C> {
        &self.cache
    }
}
