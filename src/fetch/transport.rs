use std::future::Future;

use serde_json::Value;

use super::FetchError;
use crate::domain::CacheKey;

/// Issues a GET for a cache key and returns the decoded JSON body.
///
/// [`HttpTransport`](super::HttpTransport) talks to the real API; tests
/// substitute in-memory implementations.
pub trait Transport: Send + Sync + 'static {
    /// Fetches the resource at `key`.
    ///
    /// Non-2xx responses must be reported as [`FetchError::Http`].
    fn get(&self, key: &CacheKey) -> impl Future<Output = Result<Value, FetchError>> + Send;
}
