//! Query state and its canonical request form.
//!
//! A [`QueryState`] is the client-held description of what a list shows:
//! search term, filters, sort and page. It is rendered into exactly one
//! parameter string, which doubles as the request query and the cache key.

use std::{fmt, num::NonZeroU32, str::FromStr};

use url::{Url, form_urlencoded};

use super::RecordId;

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: NonZeroU32 = NonZeroU32::new(50).expect("non-zero");

/// A top-level collection served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    /// `/tenders`
    Tenders,
    /// `/contracts`
    Contracts,
}

impl Collection {
    /// The collection's path segment.
    #[must_use]
    pub const fn segment(self) -> &'static str {
        match self {
            Self::Tenders => "tenders",
            Self::Contracts => "contracts",
        }
    }

    /// The collection's path, e.g. `/tenders`.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Tenders => "/tenders",
            Self::Contracts => "/contracts",
        }
    }

    /// The sort applied when the user has not chosen one.
    #[must_use]
    pub const fn default_sort(self) -> Sort {
        match self {
            Self::Tenders => Sort::new(SortKey::DateModified),
            Self::Contracts => Sort::new(SortKey::DateSigned),
        }
    }

    /// The sort keys the backend understands for this collection.
    #[must_use]
    pub const fn sort_keys(self) -> &'static [SortKey] {
        match self {
            Self::Tenders => &[
                SortKey::DateModified,
                SortKey::Value,
                SortKey::Title,
                SortKey::StartDate,
                SortKey::EndDate,
                SortKey::Complexity,
            ],
            Self::Contracts => &[SortKey::DateSigned, SortKey::Value],
        }
    }

    /// Whether the collection can be sorted by `key`.
    #[must_use]
    pub fn supports(self, key: SortKey) -> bool {
        self.sort_keys().contains(&key)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// A sortable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SortKey {
    /// Last modification date.
    DateModified,
    /// Estimated or contracted value.
    Value,
    /// Title, case-insensitive.
    Title,
    /// Start of the tender period.
    StartDate,
    /// End of the tender period.
    EndDate,
    /// Number of nested detail entries.
    Complexity,
    /// Contract signature date.
    DateSigned,
}

impl SortKey {
    /// The `sort_by` value understood by the backend.
    #[must_use]
    pub const fn param(self) -> &'static str {
        match self {
            Self::DateModified => "dateModified",
            Self::Value => "value",
            Self::Title => "title",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::Complexity => "complexity",
            Self::DateSigned => "dateSigned",
        }
    }

    /// Column heading.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DateModified => "Modified",
            Self::Value => "Value",
            Self::Title => "Title",
            Self::StartDate => "Start",
            Self::EndDate => "End",
            Self::Complexity => "Details",
            Self::DateSigned => "Date Signed",
        }
    }

    /// The direction applied when this column is first selected.
    ///
    /// Numeric and date columns start with the largest/latest first; text
    /// columns start alphabetically.
    #[must_use]
    pub const fn default_direction(self) -> SortDirection {
        match self {
            Self::Title => SortDirection::Ascending,
            Self::DateModified
            | Self::Value
            | Self::StartDate
            | Self::EndDate
            | Self::Complexity
            | Self::DateSigned => SortDirection::Descending,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.param())
    }
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "datemodified" | "modified" => Ok(Self::DateModified),
            "value" => Ok(Self::Value),
            "title" => Ok(Self::Title),
            "startdate" | "start" => Ok(Self::StartDate),
            "enddate" | "end" => Ok(Self::EndDate),
            "complexity" | "details" => Ok(Self::Complexity),
            "datesigned" | "signed" => Ok(Self::DateSigned),
            _ => Err(QueryError::UnknownSortKey(s.to_string())),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    /// Smallest/earliest/alphabetical first.
    Ascending,
    /// Largest/latest first.
    Descending,
}

impl SortDirection {
    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    /// Whether this is [`SortDirection::Descending`].
    #[must_use]
    pub const fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }

    /// Column indicator.
    #[must_use]
    pub const fn arrow(self) -> &'static str {
        match self {
            Self::Ascending => "↑",
            Self::Descending => "↓",
        }
    }
}

/// A sort key with its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sort {
    /// The column.
    pub key: SortKey,
    /// The direction.
    pub direction: SortDirection,
}

impl Sort {
    /// Sort by `key` in its default direction.
    #[must_use]
    pub const fn new(key: SortKey) -> Self {
        Self {
            key,
            direction: key.default_direction(),
        }
    }

    /// The sort that results from selecting the `key` column.
    ///
    /// Selecting the active column flips its direction; selecting another
    /// column starts in that column's default direction.
    #[must_use]
    pub const fn toggled(self, key: SortKey) -> Self {
        if self.key as u8 == key as u8 {
            Self {
                key,
                direction: self.direction.flipped(),
            }
        } else {
            Self::new(key)
        }
    }
}

/// Filter on whether a tender period start date is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePresence {
    /// Only records with a start date.
    Present,
    /// Only records without a start date.
    Absent,
}

impl DatePresence {
    /// The `has_date` value understood by the backend.
    #[must_use]
    pub const fn param(self) -> &'static str {
        match self {
            Self::Present => "yes",
            Self::Absent => "no",
        }
    }
}

impl FromStr for DatePresence {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "present" => Ok(Self::Present),
            "no" | "false" | "absent" => Ok(Self::Absent),
            _ => Err(QueryError::InvalidDatePresence(s.to_string())),
        }
    }
}

/// Errors raised while building a query.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    /// The sort key is not recognised.
    #[error("unknown sort key '{0}'")]
    UnknownSortKey(String),

    /// The collection cannot be sorted by this key.
    #[error("{collection} cannot be sorted by {key}")]
    UnsupportedSort {
        /// The collection being queried.
        collection: Collection,
        /// The rejected key.
        key: SortKey,
    },

    /// The minimum value is not a finite number.
    #[error("minimum value must be a finite number, got {0}")]
    InvalidMinValue(f64),

    /// The date filter is not `yes` or `no`.
    #[error("date filter must be 'yes' or 'no', got '{0}'")]
    InvalidDatePresence(String),
}

/// Client-held list state.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    collection: Collection,
    search: Option<String>,
    sort: Sort,
    status: Option<String>,
    has_date: Option<DatePresence>,
    min_value: Option<f64>,
    page: NonZeroU32,
    page_size: NonZeroU32,
}

impl QueryState {
    /// The default state of a collection: first page, default sort, no
    /// filters.
    #[must_use]
    pub const fn new(collection: Collection) -> Self {
        Self {
            collection,
            search: None,
            sort: collection.default_sort(),
            status: None,
            has_date: None,
            min_value: None,
            page: NonZeroU32::MIN,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// The queried collection.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// The normalized search term.
    #[must_use]
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// The active sort.
    #[must_use]
    pub const fn sort(&self) -> Sort {
        self.sort
    }

    /// The status filter.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The date-presence filter.
    #[must_use]
    pub const fn has_date(&self) -> Option<DatePresence> {
        self.has_date
    }

    /// The minimum-value filter.
    #[must_use]
    pub const fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(&self) -> NonZeroU32 {
        self.page
    }

    /// Records per page.
    #[must_use]
    pub const fn page_size(&self) -> NonZeroU32 {
        self.page_size
    }

    /// Index of the first record on the current page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.get() - 1) * u64::from(self.page_size.get())
    }

    /// Sets the search term. Blank terms clear the search.
    ///
    /// Resets to the first page.
    pub fn set_search(&mut self, search: Option<&str>) {
        self.search = search
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string);
        self.page = NonZeroU32::MIN;
    }

    /// Sets the status filter. `all` or a blank value clears it.
    ///
    /// Resets to the first page.
    pub fn set_status(&mut self, status: Option<&str>) {
        self.status = status
            .map(str::trim)
            .filter(|status| !status.is_empty() && !status.eq_ignore_ascii_case("all"))
            .map(str::to_string);
        self.page = NonZeroU32::MIN;
    }

    /// Sets the date-presence filter.
    ///
    /// Resets to the first page.
    pub const fn set_has_date(&mut self, has_date: Option<DatePresence>) {
        self.has_date = has_date;
        self.page = NonZeroU32::MIN;
    }

    /// Sets the minimum-value filter.
    ///
    /// Resets to the first page.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidMinValue`] if the value is NaN or
    /// infinite.
    pub fn set_min_value(&mut self, min_value: Option<f64>) -> Result<(), QueryError> {
        if let Some(value) = min_value.filter(|value| !value.is_finite()) {
            return Err(QueryError::InvalidMinValue(value));
        }
        // -0.0 and 0.0 must produce the same key
        self.min_value = min_value.map(|value| value + 0.0);
        self.page = NonZeroU32::MIN;
        Ok(())
    }

    /// Selects a sort column, toggling direction if it is already active.
    ///
    /// Resets to the first page.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedSort`] if the collection cannot be
    /// sorted by `key`; the state is left unchanged.
    pub fn toggle_sort(&mut self, key: SortKey) -> Result<Sort, QueryError> {
        self.ensure_sortable(key)?;
        self.sort = self.sort.toggled(key);
        self.page = NonZeroU32::MIN;
        Ok(self.sort)
    }

    /// Replaces the sort outright.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedSort`] if the collection cannot be
    /// sorted by the key.
    pub fn set_sort(&mut self, sort: Sort) -> Result<(), QueryError> {
        self.ensure_sortable(sort.key)?;
        self.sort = sort;
        self.page = NonZeroU32::MIN;
        Ok(())
    }

    /// Sets the page size. Resets to the first page.
    pub const fn set_page_size(&mut self, page_size: NonZeroU32) {
        self.page_size = page_size;
        self.page = NonZeroU32::MIN;
    }

    /// Moves to `page` without bounds checking.
    ///
    /// Bounds depend on the total, which only the list view knows.
    pub const fn set_page(&mut self, page: NonZeroU32) {
        self.page = page;
    }

    fn ensure_sortable(&self, key: SortKey) -> Result<(), QueryError> {
        if self.collection.supports(key) {
            Ok(())
        } else {
            Err(QueryError::UnsupportedSort {
                collection: self.collection,
                key,
            })
        }
    }

    /// The canonical request parameters, in fixed order.
    ///
    /// `limit`, `offset`, `sort_by` and `descending` are always present;
    /// filters appear only when set.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("limit", self.page_size.to_string()),
            ("offset", self.offset().to_string()),
            ("sort_by", self.sort.key.param().to_string()),
            ("descending", self.sort.direction.is_descending().to_string()),
        ];

        if let Some(search) = &self.search {
            params.push(("search", search.clone()));
        }
        if let Some(status) = &self.status {
            params.push(("status", status.clone()));
        }
        if let Some(has_date) = self.has_date {
            params.push(("has_date", has_date.param().to_string()));
        }
        if let Some(min_value) = self.min_value {
            params.push(("min_value", min_value.to_string()));
        }

        params
    }

    /// The canonical, percent-encoded query string.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        encode(self.params())
    }

    /// The cache key identifying the page this state describes.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey(format!(
            "{}?{}",
            self.collection.path(),
            self.to_query_string()
        ))
    }

    /// Parameters that reproduce this state in a shareable URL.
    ///
    /// Values equal to the collection defaults are omitted.
    #[must_use]
    pub fn url_params(&self) -> Vec<(&'static str, String)> {
        let defaults = Self::new(self.collection);
        let mut params = Vec::new();

        if self.page != defaults.page {
            params.push(("page", self.page.to_string()));
        }
        if self.page_size != defaults.page_size {
            params.push(("page_size", self.page_size.to_string()));
        }
        if self.sort != defaults.sort {
            params.push(("sort_by", self.sort.key.param().to_string()));
            params.push(("descending", self.sort.direction.is_descending().to_string()));
        }

        params.extend(
            self.params()
                .into_iter()
                .filter(|(name, _)| matches!(*name, "search" | "status" | "has_date" | "min_value")),
        );
        params
    }

    /// Rebuilds a state from URL parameters.
    ///
    /// Unknown parameters are ignored and invalid values fall back to the
    /// defaults so a hand-edited link still opens.
    #[must_use]
    pub fn from_url_params<'a, I>(collection: Collection, params: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut state = Self::new(collection);
        let mut sort_key = None;
        let mut descending = None;
        let mut page = None;

        for (name, value) in params {
            match name {
                "search" => state.set_search(Some(value)),
                "status" => state.set_status(Some(value)),
                "has_date" => match value.parse() {
                    Ok(presence) => state.set_has_date(Some(presence)),
                    Err(error) => tracing::warn!(%error, "ignoring date filter"),
                },
                "min_value" => {
                    let parsed = value.parse::<f64>().ok();
                    if parsed.is_none_or(|value| state.set_min_value(Some(value)).is_err()) {
                        tracing::warn!(value, "ignoring minimum value");
                    }
                }
                "sort_by" => match value.parse::<SortKey>() {
                    Ok(key) if collection.supports(key) => sort_key = Some(key),
                    _ => tracing::warn!(value, %collection, "ignoring sort key"),
                },
                "descending" => descending = value.parse::<bool>().ok(),
                "page" => page = value.parse::<NonZeroU32>().ok(),
                "page_size" => {
                    if let Ok(size) = value.parse::<NonZeroU32>() {
                        state.set_page_size(size);
                    }
                }
                _ => tracing::debug!(name, "ignoring unknown parameter"),
            }
        }

        if let Some(key) = sort_key {
            let mut sort = Sort::new(key);
            if let Some(descending) = descending {
                sort.direction = if descending {
                    SortDirection::Descending
                } else {
                    SortDirection::Ascending
                };
            }
            state.sort = sort;
        }
        if let Some(page) = page {
            state.page = page;
        }

        state
    }
}

/// The exact request path (and query) a response is cached under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of a single record, e.g. `/tenders/T%201`.
    #[must_use]
    pub fn detail(collection: Collection, id: &RecordId) -> Self {
        let mut url = Url::parse("http://localhost/").expect("static base url is valid");
        url.path_segments_mut()
            .expect("http urls have path segments")
            .pop_if_empty()
            .push(collection.segment())
            .push(id.as_str());
        Self(url.path().to_string())
    }

    /// Key of the tender count per status.
    #[must_use]
    pub fn status_counts() -> Self {
        Self::endpoint("/tenders/meta/statuses")
    }

    /// Key of the catalog-wide totals.
    #[must_use]
    pub fn stats() -> Self {
        Self::endpoint("/tenders/stats")
    }

    /// Key of a fixed endpoint such as `/tenders/stats`.
    #[must_use]
    pub fn endpoint(path: &str) -> Self {
        Self(path.to_string())
    }

    /// The key as a request path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn encode(params: Vec<(&'static str, String)>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, value) in params {
        serializer.append_pair(name, &value);
    }
    serializer.finish()
}

/// Encodes URL parameters in order.
pub(crate) fn encode_url_params(params: Vec<(&'static str, String)>) -> String {
    encode(params)
}
