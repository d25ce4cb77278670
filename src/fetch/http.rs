use std::time::Duration;

use serde_json::Value;
use url::Url;

use super::{FetchError, Transport};
use crate::domain::{CacheKey, Config};

/// [`Transport`] backed by the catalog REST API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Creates a transport for the API rooted at `base_url`.
    ///
    /// The base URL may carry a path prefix; cache keys are resolved
    /// beneath it.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn new(mut base_url: Url, timeout: Duration) -> Result<Self, FetchError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tender-viewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network {
                endpoint: "client_init".into(),
                message: e.to_string(),
            })?;

        Ok(Self { http, base_url })
    }

    /// Creates a transport from the configured API URL and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(config.api_url().clone(), config.timeout())
    }

    /// The API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, key: &CacheKey) -> Result<Url, FetchError> {
        self.base_url
            .join(key.as_str().trim_start_matches('/'))
            .map_err(|e| FetchError::Network {
                endpoint: key.to_string(),
                message: format!("invalid request url: {e}"),
            })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, key: &CacheKey) -> Result<Value, FetchError> {
        let endpoint = key.to_string();
        let url = self.url_for(key)?;
        tracing::debug!(%url, "GET");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                endpoint,
                status,
                body,
            });
        }

        resp.json().await.map_err(|e| FetchError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;
    use crate::domain::{Collection, QueryState, RecordId};

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn resolves_keys_under_base_path() {
        let transport = transport("https://example.org/api");
        let mut query = QueryState::new(Collection::Tenders);
        query.set_page(NonZeroU32::new(2).unwrap());

        let url = transport.url_for(&query.cache_key()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/api/tenders?limit=50&offset=50&sort_by=dateModified&descending=true"
        );
    }

    #[test]
    fn keeps_encoded_detail_ids() {
        let transport = transport("http://localhost:8000");
        let key = CacheKey::detail(Collection::Contracts, &RecordId::new("C 1").unwrap());
        assert_eq!(
            transport.url_for(&key).unwrap().as_str(),
            "http://localhost:8000/contracts/C%201"
        );
    }
}
