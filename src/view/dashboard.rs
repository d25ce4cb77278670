//! The overview screen.
//!
//! Five panels load concurrently and settle independently, so one failing
//! endpoint leaves the others intact.

use std::num::NonZeroU32;

use futures::{FutureExt, StreamExt, future::BoxFuture, stream::FuturesUnordered};

use super::Resource;
use crate::{
    domain::{CacheKey, Collection, QueryState, Sort, SortKey, StatusCounts, Tender, TenderStats},
    fetch::{Catalog, FetchError, Page, Transport},
};

/// Rows shown in each of the short highlight panels.
pub const HIGHLIGHT_ROWS: NonZeroU32 = NonZeroU32::new(5).expect("non-zero");

/// One independently loaded part of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    /// The main tender list.
    Tenders,
    /// The most recently modified tenders with a value.
    Recent,
    /// The tenders with the most detail entries.
    Detailed,
    /// Tender count per status.
    Statuses,
    /// Catalog-wide totals.
    Stats,
}

impl Panel {
    /// Every panel, in display order.
    pub const ALL: [Self; 5] = [
        Self::Stats,
        Self::Statuses,
        Self::Recent,
        Self::Detailed,
        Self::Tenders,
    ];

    /// Panel heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Tenders => "Tenders",
            Self::Recent => "Recently Modified",
            Self::Detailed => "Most Detailed",
            Self::Statuses => "By Status",
            Self::Stats => "Summary",
        }
    }
}

enum Update {
    Tenders(CacheKey, Result<Page<Tender>, FetchError>),
    Recent(CacheKey, Result<Page<Tender>, FetchError>),
    Detailed(CacheKey, Result<Page<Tender>, FetchError>),
    Statuses(CacheKey, Result<StatusCounts, FetchError>),
    Stats(CacheKey, Result<TenderStats, FetchError>),
}

/// The landing view: several panels fetched side by side.
///
/// A failing panel shows its own error and never blocks the others.
#[derive(Debug)]
pub struct Dashboard {
    main: QueryState,
    tenders: Resource<Page<Tender>>,
    recent: Resource<Page<Tender>>,
    detailed: Resource<Page<Tender>>,
    statuses: Resource<StatusCounts>,
    stats: Resource<TenderStats>,
}

impl Dashboard {
    /// Creates a dashboard whose main list shows `main`.
    #[must_use]
    pub fn new(main: QueryState) -> Self {
        debug_assert_eq!(main.collection(), Collection::Tenders);
        Self {
            main,
            tenders: Resource::new(),
            recent: Resource::new(),
            detailed: Resource::new(),
            statuses: Resource::new(),
            stats: Resource::new(),
        }
    }

    /// The main list query.
    #[must_use]
    pub const fn main_query(&self) -> &QueryState {
        &self.main
    }

    /// The query behind the "recently modified" panel.
    #[must_use]
    pub fn recent_query() -> QueryState {
        highlight_query(SortKey::DateModified)
    }

    /// The query behind the "most detailed" panel.
    #[must_use]
    pub fn detailed_query() -> QueryState {
        highlight_query(SortKey::Complexity)
    }

    /// Loads every panel concurrently.
    ///
    /// `on_settled` is called once per panel, in completion order, right
    /// after that panel's resource has been updated.
    pub async fn load<T: Transport>(
        &mut self,
        catalog: &Catalog<T>,
        mut on_settled: impl FnMut(&Self, Panel) + Send,
    ) {
        let main = self.main.clone();
        let recent = Self::recent_query();
        let detailed = Self::detailed_query();

        let main_key = main.cache_key();
        let recent_key = recent.cache_key();
        let detailed_key = detailed.cache_key();
        let statuses_key = CacheKey::status_counts();
        let stats_key = CacheKey::stats();

        self.tenders.begin(main_key.clone());
        self.recent.begin(recent_key.clone());
        self.detailed.begin(detailed_key.clone());
        self.statuses.begin(statuses_key.clone());
        self.stats.begin(stats_key.clone());

        let mut pending: FuturesUnordered<BoxFuture<'_, Update>> = FuturesUnordered::new();
        pending.push(
            async move { Update::Tenders(main_key, catalog.tenders(&main).await) }.boxed(),
        );
        pending.push(
            async move { Update::Recent(recent_key, catalog.tenders(&recent).await) }
                .boxed(),
        );
        pending.push(
            async move { Update::Detailed(detailed_key, catalog.tenders(&detailed).await) }
                .boxed(),
        );
        pending.push(
            async move { Update::Statuses(statuses_key, catalog.status_counts().await) }
                .boxed(),
        );
        pending.push(
            async move { Update::Stats(stats_key, catalog.stats().await) }.boxed(),
        );

        while let Some(update) = pending.next().await {
            let panel = self.apply(update);
            on_settled(self, panel);
        }
    }

    fn apply(&mut self, update: Update) -> Panel {
        match update {
            Update::Tenders(key, result) => {
                self.tenders.settle(&key, result);
                Panel::Tenders
            }
            Update::Recent(key, result) => {
                self.recent.settle(&key, result);
                Panel::Recent
            }
            Update::Detailed(key, result) => {
                self.detailed.settle(&key, result);
                Panel::Detailed
            }
            Update::Statuses(key, result) => {
                self.statuses.settle(&key, result);
                Panel::Statuses
            }
            Update::Stats(key, result) => {
                self.stats.settle(&key, result);
                Panel::Stats
            }
        }
    }

    /// The main tender list.
    #[must_use]
    pub const fn tenders(&self) -> &Resource<Page<Tender>> {
        &self.tenders
    }

    /// The "recently modified" panel.
    #[must_use]
    pub const fn recent(&self) -> &Resource<Page<Tender>> {
        &self.recent
    }

    /// The "most detailed" panel.
    #[must_use]
    pub const fn detailed(&self) -> &Resource<Page<Tender>> {
        &self.detailed
    }

    /// The status counts panel.
    #[must_use]
    pub const fn statuses(&self) -> &Resource<StatusCounts> {
        &self.statuses
    }

    /// The summary panel.
    #[must_use]
    pub const fn stats(&self) -> &Resource<TenderStats> {
        &self.stats
    }

    /// Whether any panel is still loading.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.tenders.is_loading()
            || self.recent.is_loading()
            || self.detailed.is_loading()
            || self.statuses.is_loading()
            || self.stats.is_loading()
    }
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(QueryState::new(Collection::Tenders))
    }
}

fn highlight_query(key: SortKey) -> QueryState {
    let mut query = QueryState::new(Collection::Tenders);
    query
        .set_sort(Sort::new(key))
        .expect("tenders can be sorted by every highlight key");
    query
        .set_min_value(Some(1.0))
        .expect("this must never fail");
    query.set_page_size(HIGHLIGHT_ROWS);
    query
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::{Value, json};

    use super::*;
    use crate::domain::SortDirection;

    struct Canned(HashMap<String, Result<Value, FetchError>>);

    impl Transport for Canned {
        async fn get(&self, key: &CacheKey) -> Result<Value, FetchError> {
            self.0.get(key.as_str()).cloned().unwrap_or_else(|| {
                Err(FetchError::Http {
                    endpoint: key.to_string(),
                    status: 404,
                    body: "Not Found".into(),
                })
            })
        }
    }

    fn list(ids: &[&str]) -> Value {
        let data: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
        json!({"data": data, "meta": {"total": ids.len()}})
    }

    #[test]
    fn highlight_queries() {
        let recent = Dashboard::recent_query();
        assert_eq!(recent.sort().key, SortKey::DateModified);
        assert_eq!(recent.sort().direction, SortDirection::Descending);
        assert_eq!(recent.page_size().get(), 5);
        assert_eq!(recent.min_value(), Some(1.0));

        let detailed = Dashboard::detailed_query();
        assert_eq!(detailed.sort().key, SortKey::Complexity);
        assert_ne!(recent.cache_key(), detailed.cache_key());
    }

    #[tokio::test]
    async fn failing_panel_does_not_block_the_others() {
        let dashboard = Dashboard::default();
        let mut bodies = HashMap::new();
        bodies.insert(
            dashboard.main_query().cache_key().to_string(),
            Ok(list(&["T1", "T2"])),
        );
        bodies.insert(
            Dashboard::recent_query().cache_key().to_string(),
            Ok(list(&["T2"])),
        );
        bodies.insert(
            Dashboard::detailed_query().cache_key().to_string(),
            Ok(list(&["T1"])),
        );
        bodies.insert(
            CacheKey::status_counts().to_string(),
            Ok(json!({"active": 1, "complete": 1})),
        );
        bodies.insert(
            CacheKey::stats().to_string(),
            Err(FetchError::Http {
                endpoint: "/tenders/stats".into(),
                status: 500,
                body: "Internal Server Error".into(),
            }),
        );
        let catalog = Catalog::new(Canned(bodies));

        let mut dashboard = dashboard;
        let mut settled = Vec::new();
        dashboard
            .load(&catalog, |_, panel| settled.push(panel))
            .await;

        settled.sort_by_key(|panel| Panel::ALL.iter().position(|p| p == panel));
        assert_eq!(settled, Panel::ALL);
        assert!(!dashboard.is_loading());

        assert_eq!(dashboard.tenders().data().map(|p| p.records.len()), Some(2));
        assert_eq!(dashboard.recent().data().map(|p| p.total), Some(1));
        assert_eq!(dashboard.detailed().data().map(|p| p.total), Some(1));
        assert_eq!(dashboard.statuses().data().map(StatusCounts::total), Some(2));
        assert_eq!(
            dashboard.stats().error().and_then(FetchError::status),
            Some(500)
        );
    }

    #[tokio::test]
    async fn callback_sees_the_settled_panel() {
        let catalog = Catalog::new(Canned(HashMap::new()));
        let mut dashboard = Dashboard::default();
        dashboard
            .load(&catalog, |dashboard, panel| {
                let loading = match panel {
                    Panel::Tenders => dashboard.tenders().is_loading(),
                    Panel::Recent => dashboard.recent().is_loading(),
                    Panel::Detailed => dashboard.detailed().is_loading(),
                    Panel::Statuses => dashboard.statuses().is_loading(),
                    Panel::Stats => dashboard.stats().is_loading(),
                };
                assert!(!loading, "{panel:?} still loading");
            })
            .await;
    }
}
