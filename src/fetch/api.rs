use std::num::NonZeroU32;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use super::{Envelope, FetchCache, FetchError, Transport};
use crate::domain::{
    CacheKey, Collection, ContractListing, QueryState, RecordId, StatusCounts, Tender,
    TenderStats, flatten_release,
};

/// One page of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    /// The records on this page. Malformed entries are omitted.
    pub records: Vec<R>,
    /// Total matching records across all pages.
    pub total: u64,
}

impl<R> Page<R> {
    /// Number of pages needed to show every record; never less than one.
    #[must_use]
    pub fn total_pages(&self, page_size: NonZeroU32) -> u32 {
        let pages = self.total.div_ceil(u64::from(page_size.get())).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

/// Typed access to the catalog endpoints through a shared [`FetchCache`].
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    cache: FetchCache<T>,
}

impl<T: Transport> Catalog<T> {
    /// Creates a catalog with an empty cache.
    pub fn new(transport: T) -> Self {
        Self::with_cache(FetchCache::new(transport))
    }

    /// Creates a catalog over an existing cache.
    pub const fn with_cache(cache: FetchCache<T>) -> Self {
        Self { cache }
    }

    /// The response cache.
    pub const fn cache(&self) -> &FetchCache<T> {
        &self.cache
    }

    /// Fetches a page of tenders.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails.
    #[instrument(level = "debug", skip_all, fields(key = %query.cache_key()))]
    pub async fn tenders(&self, query: &QueryState) -> Result<Page<Tender>, FetchError> {
        debug_assert_eq!(query.collection(), Collection::Tenders);
        let key = query.cache_key();
        let body = self.cache.get(&key).await?;
        Ok(decode_page(&body, query, &key, decode_tender))
    }

    /// Fetches a tender by id.
    ///
    /// A tender already present on a loaded list page is returned without a
    /// request.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails or the record cannot be
    /// decoded.
    #[instrument(level = "debug", skip(self))]
    pub async fn tender(&self, id: &RecordId) -> Result<Option<Tender>, FetchError> {
        if let Some(tender) = self.loaded_tender(id) {
            tracing::debug!("reusing list entry");
            return Ok(Some(tender));
        }

        let key = CacheKey::detail(Collection::Tenders, id);
        let body = self.cache.get(&key).await?;
        let envelope = Envelope::open(&body);
        if envelope.data.is_null() {
            return Ok(None);
        }
        decode_tender(envelope.data.clone()).map(Some).map_err(|message| {
            FetchError::Decode {
                endpoint: key.to_string(),
                message,
            }
        })
    }

    /// Looks up a tender among the list pages already in the cache.
    ///
    /// Matches either the record id or the published tender number.
    pub fn loaded_tender(&self, id: &RecordId) -> Option<Tender> {
        let prefix = format!("{}?", Collection::Tenders.path());
        self.cache
            .settled_with_prefix(&prefix)
            .iter()
            .flat_map(|body| Envelope::open(body).entries().to_vec())
            .filter_map(|entry| decode_tender(entry).ok())
            .find(|tender| {
                tender.id == *id || tender.tender_id.as_deref() == Some(id.as_str())
            })
    }

    /// Fetches a page of contracts.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails.
    #[instrument(level = "debug", skip_all, fields(key = %query.cache_key()))]
    pub async fn contracts(
        &self,
        query: &QueryState,
    ) -> Result<Page<ContractListing>, FetchError> {
        debug_assert_eq!(query.collection(), Collection::Contracts);
        let key = query.cache_key();
        let body = self.cache.get(&key).await?;
        Ok(decode_page(&body, query, &key, decode::<ContractListing>))
    }

    /// Fetches a contract, with its parent tender reference, by id.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails (other than with 404)
    /// or the record cannot be decoded.
    #[instrument(level = "debug", skip(self))]
    pub async fn contract(&self, id: &RecordId) -> Result<Option<ContractListing>, FetchError> {
        let key = CacheKey::detail(Collection::Contracts, id);
        let body = match self.cache.get(&key).await {
            Ok(body) => body,
            Err(error) if error.is_not_found() => return Ok(None),
            Err(error) => return Err(error),
        };

        let envelope = Envelope::open(&body);
        if envelope.data.is_null() {
            return Ok(None);
        }
        decode(envelope.data.clone())
            .map(Some)
            .map_err(|message| FetchError::Decode {
                endpoint: key.to_string(),
                message,
            })
    }

    /// Fetches tender counts per status.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails.
    #[instrument(level = "debug", skip_all)]
    pub async fn status_counts(&self) -> Result<StatusCounts, FetchError> {
        let body = self.cache.get(&CacheKey::status_counts()).await?;
        Ok(StatusCounts::from_json(Envelope::open(&body).data))
    }

    /// Fetches catalog-wide totals.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] if the request fails or the body is not an
    /// object.
    #[instrument(level = "debug", skip_all)]
    pub async fn stats(&self) -> Result<TenderStats, FetchError> {
        let key = CacheKey::stats();
        let body = self.cache.get(&key).await?;
        decode(Envelope::open(&body).data.clone()).map_err(|message| FetchError::Decode {
            endpoint: key.to_string(),
            message,
        })
    }
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

fn decode_tender(value: Value) -> Result<Tender, String> {
    decode(flatten_release(value))
}

fn decode_page<R>(
    body: &Value,
    query: &QueryState,
    key: &CacheKey,
    decode_entry: impl Fn(Value) -> Result<R, String>,
) -> Page<R> {
    let envelope = Envelope::open(body);
    let entries = envelope.entries();

    let records: Vec<R> = entries
        .iter()
        .cloned()
        .enumerate()
        .filter_map(|(index, entry)| match decode_entry(entry) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!(%key, index, %error, "skipping malformed record");
                None
            }
        })
        .collect();

    let total = envelope
        .total
        .unwrap_or_else(|| query.offset() + entries.len() as u64);

    Page { records, total }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use serde_json::json;

    use super::*;

    /// Serves canned bodies by key and records every request.
    #[derive(Default)]
    struct Canned {
        bodies: HashMap<String, Result<Value, FetchError>>,
        requests: Mutex<Vec<String>>,
    }

    impl Canned {
        fn with(mut self, key: &str, body: Value) -> Self {
            self.bodies.insert(key.to_string(), Ok(body));
            self
        }

        fn failing(mut self, key: &str, status: u16) -> Self {
            self.bodies.insert(
                key.to_string(),
                Err(FetchError::Http {
                    endpoint: key.to_string(),
                    status,
                    body: "nope".into(),
                }),
            );
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Transport for Canned {
        async fn get(&self, key: &CacheKey) -> Result<Value, FetchError> {
            self.requests.lock().unwrap().push(key.to_string());
            self.bodies.get(key.as_str()).cloned().unwrap_or_else(|| {
                Err(FetchError::Http {
                    endpoint: key.to_string(),
                    status: 404,
                    body: "missing".into(),
                })
            })
        }
    }

    fn tenders_query() -> QueryState {
        QueryState::new(Collection::Tenders)
    }

    #[tokio::test]
    async fn decodes_tender_page_and_skips_malformed_entries() {
        let query = tenders_query();
        let catalog = Catalog::new(Canned::default().with(
            query.cache_key().as_str(),
            json!({
                "data": [
                    {"id": "T1", "tender": {"title": "Roads"}},
                    {"tender": {"title": "No id anywhere"}},
                    "garbage",
                    {"id": "T2", "title": "Schools"}
                ],
                "meta": {"total": 120, "limit": 50, "offset": 0}
            }),
        ));

        let page = catalog.tenders(&query).await.unwrap();

        let ids: Vec<_> = page.records.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["T1", "T2"]);
        assert_eq!(page.records[0].display_title(), "Roads");
        assert_eq!(page.total, 120);
        assert_eq!(page.total_pages(query.page_size()), 3);
    }

    #[tokio::test]
    async fn missing_total_is_inferred() {
        let query = tenders_query();
        let catalog = Catalog::new(
            Canned::default().with(query.cache_key().as_str(), json!([{"id": "T1"}])),
        );
        let page = catalog.tenders(&query).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn tender_detail_reuses_loaded_list_entry() {
        let query = tenders_query();
        let canned = Canned::default().with(
            query.cache_key().as_str(),
            json!({"data": [{"id": "T1", "tenderID": "UA-1"}], "meta": {"total": 1}}),
        );
        let catalog = Catalog::new(canned);
        catalog.tenders(&query).await.unwrap();

        let by_id = catalog.tender(&RecordId::new("T1").unwrap()).await.unwrap();
        let by_number = catalog.tender(&RecordId::new("UA-1").unwrap()).await.unwrap();

        assert_eq!(by_id.unwrap().id.as_str(), "T1");
        assert_eq!(by_number.unwrap().id.as_str(), "T1");
        assert_eq!(catalog.cache().transport().requests().len(), 1);
    }

    #[tokio::test]
    async fn tender_detail_fetches_and_handles_not_found() {
        let catalog = Catalog::new(
            Canned::default()
                .with("/tenders/T9", json!({"data": {"id": "T9", "title": "Bridge"}}))
                .with("/tenders/T0", json!({"data": null, "error": "Not Found"})),
        );

        let found = catalog.tender(&RecordId::new("T9").unwrap()).await.unwrap();
        assert_eq!(found.unwrap().display_title(), "Bridge");

        let missing = catalog.tender(&RecordId::new("T0").unwrap()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn undecodable_detail_is_a_decode_error() {
        let catalog = Catalog::new(
            Canned::default().with("/tenders/T1", json!({"data": {"title": "no id"}})),
        );
        let error = catalog
            .tender(&RecordId::new("T1").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(error, FetchError::Decode { .. }));
        assert_eq!(error.endpoint(), "/tenders/T1");
    }

    #[tokio::test]
    async fn contract_404_is_not_found_but_500_is_an_error() {
        let catalog = Catalog::new(
            Canned::default()
                .with(
                    "/contracts/C1",
                    json!({"contract": {"id": "C1"}, "tender_id": "T1", "tender_title": "Roads"}),
                )
                .failing("/contracts/C2", 404)
                .failing("/contracts/C3", 500),
        );

        let listing = catalog
            .contract(&RecordId::new("C1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.tender_title.as_deref(), Some("Roads"));

        assert!(catalog
            .contract(&RecordId::new("C2").unwrap())
            .await
            .unwrap()
            .is_none());

        let error = catalog
            .contract(&RecordId::new("C3").unwrap())
            .await
            .unwrap_err();
        assert_eq!(error.status(), Some(500));
    }

    #[tokio::test]
    async fn decodes_contract_page() {
        let query = QueryState::new(Collection::Contracts);
        let catalog = Catalog::new(Canned::default().with(
            query.cache_key().as_str(),
            json!({
                "data": [{"contract": {"id": "C1", "awardID": "A1"}, "tender_id": "T1"}],
                "meta": {"total": 1}
            }),
        ));

        let page = catalog.contracts(&query).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(
            page.records[0].contract.award_id.as_ref().map(RecordId::as_str),
            Some("A1")
        );
    }

    #[tokio::test]
    async fn decodes_bare_status_counts_and_stats() {
        let catalog = Catalog::new(
            Canned::default()
                .with("/tenders/meta/statuses", json!({"active": 2, "complete": 5}))
                .with("/tenders/stats", json!({"tenders": 7, "totalAwardValue": 10.5})),
        );

        let counts = catalog.status_counts().await.unwrap();
        assert_eq!(counts.by_count()[0], ("complete", 5));

        let stats = catalog.stats().await.unwrap();
        assert_eq!(stats.tenders, 7);
        assert_eq!(stats.total_award_value, Some(10.5));
    }

    #[test]
    fn empty_collection_has_one_page() {
        let page: Page<Tender> = Page {
            records: Vec::new(),
            total: 0,
        };
        assert_eq!(page.total_pages(NonZeroU32::new(50).unwrap()), 1);
    }
}
