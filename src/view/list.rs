//! Paged list of tenders or contracts.
//!
//! The list owns its query and the page loaded for it. Paging is bounded by
//! the total of a page loaded for the current filters and sort; rows of an
//! earlier query stay visible while the next one loads.

use std::{future::Future, num::NonZeroU32};

use super::{Resource, Route};
use crate::{
    domain::{
        CacheKey, Collection, ContractListing, QueryError, QueryState, RecordId, Sort, SortKey,
        Tender, query::DatePresence,
    },
    fetch::{Catalog, FetchError, Page, Transport},
};

/// A record that can be shown as a list row.
pub trait ListRow: Sized + Send {
    /// The collection rows are listed from.
    const COLLECTION: Collection;

    /// The id to navigate to when the row is selected.
    fn row_id(&self) -> Option<&RecordId>;

    /// Fetches one page of rows.
    fn fetch_page<T: Transport>(
        catalog: &Catalog<T>,
        query: &QueryState,
    ) -> impl Future<Output = Result<Page<Self>, FetchError>> + Send;
}

impl ListRow for Tender {
    const COLLECTION: Collection = Collection::Tenders;

    fn row_id(&self) -> Option<&RecordId> {
        Some(&self.id)
    }

    fn fetch_page<T: Transport>(
        catalog: &Catalog<T>,
        query: &QueryState,
    ) -> impl Future<Output = Result<Page<Self>, FetchError>> + Send {
        catalog.tenders(query)
    }
}

impl ListRow for ContractListing {
    const COLLECTION: Collection = Collection::Contracts;

    fn row_id(&self) -> Option<&RecordId> {
        self.contract.id.as_ref()
    }

    fn fetch_page<T: Transport>(
        catalog: &Catalog<T>,
        query: &QueryState,
    ) -> impl Future<Output = Result<Page<Self>, FetchError>> + Send {
        catalog.contracts(query)
    }
}

/// What a list currently shows.
#[derive(Debug, PartialEq)]
pub enum ListState<'a, R> {
    /// Nothing to show yet.
    Loading,
    /// The request failed.
    Failed(&'a FetchError),
    /// The request succeeded with no matching records.
    Empty,
    /// A page of records.
    Rows {
        /// The records.
        rows: &'a [R],
        /// Total matching records.
        total: u64,
        /// Number of pages.
        total_pages: u32,
        /// Whether the rows belong to a previous query that is being
        /// replaced.
        stale: bool,
    },
}

/// A paginated, sortable, filterable list of records.
#[derive(Debug)]
pub struct ListView<R> {
    query: QueryState,
    page: Resource<Page<R>>,
    /// The query of the last requested page.
    requested: Option<QueryState>,
    /// The query of the page in `page`, once one has loaded.
    shown: Option<QueryState>,
}

impl<R: ListRow> ListView<R> {
    /// Creates a list showing `query`, which must target `R::COLLECTION`.
    #[must_use]
    pub fn new(query: QueryState) -> Self {
        debug_assert_eq!(query.collection(), R::COLLECTION);
        Self {
            query,
            page: Resource::new(),
            requested: None,
            shown: None,
        }
    }

    /// A list with the default query.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(QueryState::new(R::COLLECTION))
    }

    /// The current query.
    #[must_use]
    pub const fn query(&self) -> &QueryState {
        &self.query
    }

    /// The key the current query is fetched under.
    #[must_use]
    pub fn key(&self) -> CacheKey {
        self.query.cache_key()
    }

    /// The route that reproduces this list.
    #[must_use]
    pub fn route(&self) -> Route {
        match R::COLLECTION {
            Collection::Tenders => Route::Tenders(self.query.clone()),
            Collection::Contracts => Route::Contracts(self.query.clone()),
        }
    }

    /// Selects a sort column; selecting the active column flips direction.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedSort`] if the collection cannot be
    /// sorted by `key`.
    pub fn toggle_sort(&mut self, key: SortKey) -> Result<Sort, QueryError> {
        self.query.toggle_sort(key)
    }

    /// Sets the search term and returns to the first page.
    pub fn set_search(&mut self, search: Option<&str>) {
        self.query.set_search(search);
    }

    /// Sets the status filter and returns to the first page.
    pub fn set_status(&mut self, status: Option<&str>) {
        self.query.set_status(status);
    }

    /// Sets the date-presence filter and returns to the first page.
    pub const fn set_has_date(&mut self, has_date: Option<DatePresence>) {
        self.query.set_has_date(has_date);
    }

    /// Sets the minimum-value filter and returns to the first page.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidMinValue`] for non-finite values.
    pub fn set_min_value(&mut self, min_value: Option<f64>) -> Result<(), QueryError> {
        self.query.set_min_value(min_value)
    }

    /// Number of pages, once a page of the current filters and sort has
    /// loaded.
    ///
    /// Rows kept from a previous query do not count: their total says
    /// nothing about the new one.
    #[must_use]
    pub fn total_pages(&self) -> Option<u32> {
        let shown = self.shown.as_ref()?;
        if !same_listing(shown, &self.query) {
            return None;
        }
        self.page
            .data()
            .map(|page| page.total_pages(self.query.page_size()))
    }

    /// Moves to `page` (1-based).
    ///
    /// Returns `false` without changing anything if `page` is 0, beyond the
    /// last page, or already current. Until a page of the current filters
    /// and sort has loaded only page 1 is reachable.
    pub fn go_to_page(&mut self, page: u32) -> bool {
        let Some(page) = NonZeroU32::new(page) else {
            return false;
        };
        let last = self.total_pages().unwrap_or(1);
        if page.get() > last || page == self.query.page() {
            return false;
        }
        self.query.set_page(page);
        true
    }

    /// Moves to the next page, if any.
    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.query.page().get().saturating_add(1))
    }

    /// Moves to the previous page, if any.
    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.query.page().get() - 1)
    }

    /// Starts loading the current query and returns its key.
    pub fn begin(&mut self) -> CacheKey {
        let key = self.key();
        self.page.begin(key.clone());
        self.requested = Some(self.query.clone());
        key
    }

    /// Applies a response. Responses for superseded queries are ignored.
    pub fn settle(&mut self, key: &CacheKey, result: Result<Page<R>, FetchError>) -> bool {
        let succeeded = result.is_ok();
        if !self.page.settle(key, result) {
            return false;
        }
        self.shown = if succeeded {
            self.requested.clone()
        } else {
            None
        };
        true
    }

    /// Loads the current query through `catalog`.
    pub async fn load<T: Transport>(&mut self, catalog: &Catalog<T>) {
        let key = self.begin();
        let result = R::fetch_page(catalog, &self.query).await;
        self.settle(&key, result);
    }

    /// What to show.
    #[must_use]
    pub fn state(&self) -> ListState<'_, R> {
        if let Some(error) = self.page.error() {
            return ListState::Failed(error);
        }
        match self.page.data() {
            None => ListState::Loading,
            Some(page) if page.records.is_empty() && !self.page.is_stale() => ListState::Empty,
            Some(page) => ListState::Rows {
                rows: &page.records,
                total: page.total,
                total_pages: page.total_pages(self.query.page_size()),
                stale: self.page.is_stale(),
            },
        }
    }

    /// The route to the detail view of row `index`.
    ///
    /// Returns `None` if there is no such row or it has no id.
    #[must_use]
    pub fn select(&self, index: usize) -> Option<Route> {
        let row = self.page.data()?.records.get(index)?;
        let id = row.row_id()?.clone();
        let list = self.query.clone();
        Some(match R::COLLECTION {
            Collection::Tenders => Route::Tender {
                id,
                anchor: None,
                list,
            },
            Collection::Contracts => Route::Contract {
                id,
                anchor: None,
                list,
            },
        })
    }
}

/// Whether two queries differ at most in their page.
fn same_listing(a: &QueryState, b: &QueryState) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set_page(NonZeroU32::MIN);
    b.set_page(NonZeroU32::MIN);
    a == b
}
