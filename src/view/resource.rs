use crate::{domain::CacheKey, fetch::FetchError};

/// The data, error and loading flag a view shows for one fetch.
///
/// While a new key loads, the data of the previous key stays visible.
/// Responses for any key other than the most recently requested one are
/// ignored on arrival.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource<T> {
    key: Option<CacheKey>,
    data: Option<T>,
    error: Option<FetchError>,
    loading: bool,
}

impl<T> Default for Resource<T> {
    fn default() -> Self {
        Self {
            key: None,
            data: None,
            error: None,
            loading: false,
        }
    }
}

impl<T> Resource<T> {
    /// Creates an idle resource with no data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as the requested key and starts loading.
    ///
    /// Existing data is kept until the new response arrives.
    pub fn begin(&mut self, key: CacheKey) {
        self.key = Some(key);
        self.error = None;
        self.loading = true;
    }

    /// Applies the response for `key`.
    ///
    /// Returns `false`, leaving the resource untouched, if `key` is no
    /// longer the requested key. A failure clears the data so nothing stale
    /// is shown beside the error.
    pub fn settle(&mut self, key: &CacheKey, result: Result<T, FetchError>) -> bool {
        if self.key.as_ref() != Some(key) {
            tracing::debug!(%key, "ignoring superseded response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            Err(error) => {
                self.data = None;
                self.error = Some(error);
            }
        }
        true
    }

    /// The most recently requested key.
    #[must_use]
    pub const fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// The data to show, possibly from a previous key.
    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// The error of the requested key.
    #[must_use]
    pub const fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether the shown data belongs to a previous key.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.loading && self.data.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> CacheKey {
        CacheKey::endpoint(raw)
    }

    fn server_error() -> FetchError {
        FetchError::Http {
            endpoint: "/tenders".into(),
            status: 500,
            body: "Internal Server Error".into(),
        }
    }

    #[test]
    fn keeps_previous_data_while_loading() {
        let mut resource = Resource::new();
        resource.begin(key("/a"));
        assert!(resource.is_loading());
        assert!(!resource.is_stale());
        assert!(resource.settle(&key("/a"), Ok(1)));

        resource.begin(key("/b"));
        assert_eq!(resource.data(), Some(&1));
        assert!(resource.is_stale());

        resource.settle(&key("/b"), Ok(2));
        assert_eq!(resource.data(), Some(&2));
        assert!(!resource.is_loading());
    }

    #[test]
    fn ignores_superseded_responses() {
        let mut resource = Resource::new();
        resource.begin(key("/a"));
        resource.begin(key("/b"));

        assert!(!resource.settle(&key("/a"), Ok(1)));
        assert_eq!(resource.data(), None);
        assert!(resource.is_loading());

        assert!(resource.settle(&key("/b"), Ok(2)));
        assert_eq!(resource.data(), Some(&2));
    }

    #[test]
    fn failure_clears_stale_data() {
        let mut resource = Resource::new();
        resource.begin(key("/a"));
        resource.settle(&key("/a"), Ok(1));

        resource.begin(key("/b"));
        resource.settle(&key("/b"), Err(server_error()));

        assert_eq!(resource.data(), None);
        assert_eq!(resource.error().and_then(FetchError::status), Some(500));
    }

    #[test]
    fn retrying_clears_the_error() {
        let mut resource: Resource<u8> = Resource::new();
        resource.begin(key("/a"));
        resource.settle(&key("/a"), Err(server_error()));
        resource.begin(key("/a"));
        assert!(resource.error().is_none());
    }
}
