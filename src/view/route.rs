//! Mapping between view state and shareable URLs.
//!
//! ```text
//! /                         dashboard
//! /tenders?search=roads     tender list
//! /tenders/T1#contract-C1   tender detail, contract C1 expanded
//! /contracts                contract list
//! /contracts/C1             contract detail
//! ```
//!
//! Detail routes carry the query of the list they were opened from, so
//! closing them restores the same filters, sort and page.

use std::{fmt, str::FromStr};

use url::{Position, Url, form_urlencoded};

use crate::domain::{
    Collection, InvalidIdError, QueryState, RecordId, query::encode_url_params,
};

/// The kinds of nested card a fragment can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CardKind {
    /// A line item.
    Item,
    /// A bid.
    Bid,
    /// An award.
    Award,
    /// A contract.
    Contract,
    /// A milestone.
    Milestone,
    /// A contract transaction.
    Transaction,
    /// A published document.
    Document,
    /// An enquiry.
    Question,
    /// A complaint.
    Complaint,
}

impl CardKind {
    const ALL: [Self; 9] = [
        Self::Item,
        Self::Bid,
        Self::Award,
        Self::Contract,
        Self::Milestone,
        Self::Transaction,
        Self::Document,
        Self::Question,
        Self::Complaint,
    ];

    /// The fragment prefix, e.g. `contract` in `#contract-C1`.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Bid => "bid",
            Self::Award => "award",
            Self::Contract => "contract",
            Self::Milestone => "milestone",
            Self::Transaction => "transaction",
            Self::Document => "document",
            Self::Question => "question",
            Self::Complaint => "complaint",
        }
    }
}

/// A URL fragment designating a nested record, e.g. `#contract-C1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Anchor {
    /// The kind of record.
    pub kind: CardKind,
    /// The record's id within its parent.
    pub id: RecordId,
}

impl Anchor {
    /// Creates an anchor.
    #[must_use]
    pub const fn new(kind: CardKind, id: RecordId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.prefix(), self.id)
    }
}

impl FromStr for Anchor {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fragment = s.strip_prefix('#').unwrap_or(s);
        let (prefix, id) = fragment
            .split_once('-')
            .ok_or_else(|| RouteError::InvalidAnchor(fragment.to_string()))?;
        let kind = CardKind::ALL
            .into_iter()
            .find(|kind| kind.prefix() == prefix)
            .ok_or_else(|| RouteError::InvalidAnchor(fragment.to_string()))?;
        let id = RecordId::new(id).map_err(|_| RouteError::InvalidAnchor(fragment.to_string()))?;
        Ok(Self { kind, id })
    }
}

/// Errors raised while resolving a URL.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RouteError {
    /// Not a URL or absolute path.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The path does not name a view.
    #[error("no view at '{0}'")]
    UnknownPath(String),

    /// The record id segment is blank.
    #[error(transparent)]
    InvalidId(#[from] InvalidIdError),

    /// The fragment is not `<kind>-<id>`.
    #[error("invalid anchor '#{0}'")]
    InvalidAnchor(String),
}

/// A navigable view.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// The dashboard.
    Home,
    /// The tender list.
    Tenders(QueryState),
    /// A single tender, opened from a tender list.
    Tender {
        /// The tender.
        id: RecordId,
        /// The nested record to reveal.
        anchor: Option<Anchor>,
        /// The list to return to.
        list: QueryState,
    },
    /// The contract list.
    Contracts(QueryState),
    /// A single contract, opened from a contract list.
    Contract {
        /// The contract.
        id: RecordId,
        /// The nested record to reveal.
        anchor: Option<Anchor>,
        /// The list to return to.
        list: QueryState,
    },
}

impl Route {
    /// A tender detail route returning to the default tender list.
    #[must_use]
    pub const fn tender(id: RecordId) -> Self {
        Self::Tender {
            id,
            anchor: None,
            list: QueryState::new(Collection::Tenders),
        }
    }

    /// A contract detail route returning to the default contract list.
    #[must_use]
    pub const fn contract(id: RecordId) -> Self {
        Self::Contract {
            id,
            anchor: None,
            list: QueryState::new(Collection::Contracts),
        }
    }

    /// Resolves an absolute URL or a path such as `/tenders/T1#award-A1`.
    ///
    /// The host is ignored. Unknown query parameters and malformed anchors
    /// are dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if the input is not a URL or its path does
    /// not name a view.
    pub fn parse(input: &str) -> Result<Self, RouteError> {
        let input = input.trim();
        let url = match Url::parse(input) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse("http://localhost/")?.join(input)?
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_url(&url)
    }

    /// Resolves a parsed URL. See [`Route::parse`].
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if the path does not name a view.
    pub fn from_url(url: &Url) -> Result<Self, RouteError> {
        let segments: Vec<String> = url
            .path_segments()
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .map(decode_segment)
            .collect();

        let query = |collection| {
            QueryState::from_url_params(
                collection,
                url.query_pairs()
                    .collect::<Vec<_>>()
                    .iter()
                    .map(|(name, value)| (name.as_ref(), value.as_ref())),
            )
        };
        let anchor = || {
            url.fragment()
                .filter(|fragment| !fragment.is_empty())
                .and_then(|fragment| {
                    decode_segment(fragment)
                        .parse::<Anchor>()
                        .map_err(|error| tracing::debug!(%error, "ignoring fragment"))
                        .ok()
                })
        };

        match segments.as_slice() {
            [] => Ok(Self::Home),
            [collection] if collection == "tenders" => Ok(Self::Tenders(query(Collection::Tenders))),
            [collection] if collection == "contracts" => {
                Ok(Self::Contracts(query(Collection::Contracts)))
            }
            [collection, id] if collection == "tenders" => Ok(Self::Tender {
                id: RecordId::new(id.as_str())?,
                anchor: anchor(),
                list: query(Collection::Tenders),
            }),
            [collection, id] if collection == "contracts" => Ok(Self::Contract {
                id: RecordId::new(id.as_str())?,
                anchor: anchor(),
                list: query(Collection::Contracts),
            }),
            _ => Err(RouteError::UnknownPath(url.path().to_string())),
        }
    }

    /// The absolute URL of this view under `base`.
    #[must_use]
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);

        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            match self {
                Self::Home => {}
                Self::Tenders(_) | Self::Contracts(_) => {
                    segments.push(self.collection_segment());
                }
                Self::Tender { id, .. } | Self::Contract { id, .. } => {
                    segments.push(self.collection_segment()).push(id.as_str());
                }
            }
        }

        let params = self.query().map(QueryState::url_params).unwrap_or_default();
        if !params.is_empty() {
            url.set_query(Some(&encode_url_params(params)));
        }
        if let Some(anchor) = self.anchor() {
            url.set_fragment(Some(&anchor.to_string()));
        }
        url
    }

    /// The shareable link: [`Route::to_url`] as text.
    #[must_use]
    pub fn permalink(&self, base: &Url) -> String {
        self.to_url(base).to_string()
    }

    /// The view shown when this one is closed.
    ///
    /// Detail views return to their list with its query intact; other
    /// views are unchanged.
    #[must_use]
    pub fn close(&self) -> Self {
        match self {
            Self::Tender { list, .. } => Self::Tenders(list.clone()),
            Self::Contract { list, .. } => Self::Contracts(list.clone()),
            other => other.clone(),
        }
    }

    /// The same view with `anchor` revealed. Only detail views carry
    /// anchors.
    #[must_use]
    pub fn with_anchor(self, anchor: Option<Anchor>) -> Self {
        match self {
            Self::Tender { id, list, .. } => Self::Tender { id, anchor, list },
            Self::Contract { id, list, .. } => Self::Contract { id, anchor, list },
            other => other,
        }
    }

    /// The list query this view shows or returns to.
    #[must_use]
    pub const fn query(&self) -> Option<&QueryState> {
        match self {
            Self::Home => None,
            Self::Tenders(query)
            | Self::Contracts(query)
            | Self::Tender { list: query, .. }
            | Self::Contract { list: query, .. } => Some(query),
        }
    }

    /// The anchor of a detail view.
    #[must_use]
    pub const fn anchor(&self) -> Option<&Anchor> {
        match self {
            Self::Tender { anchor, .. } | Self::Contract { anchor, .. } => anchor.as_ref(),
            Self::Home | Self::Tenders(_) | Self::Contracts(_) => None,
        }
    }

    const fn collection_segment(&self) -> &'static str {
        match self {
            Self::Contracts(_) | Self::Contract { .. } => Collection::Contracts.segment(),
            Self::Home | Self::Tenders(_) | Self::Tender { .. } => Collection::Tenders.segment(),
        }
    }
}

impl fmt::Display for Route {
    /// The path, query and fragment, without scheme or host.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Url::parse("http://localhost/") {
            Ok(base) => f.write_str(&self.to_url(&base)[Position::BeforePath..]),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl FromStr for Route {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Percent-decodes a path segment or fragment. `+` is kept literally.
fn decode_segment(segment: &str) -> String {
    let escaped = segment
        .replace('+', "%2B")
        .replace('&', "%26")
        .replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use test_case::test_case;

    use super::*;
    use crate::domain::SortKey;

    fn id(raw: &str) -> RecordId {
        RecordId::new(raw).unwrap()
    }

    fn web() -> Url {
        Url::parse("https://tenders.example.org").unwrap()
    }

    #[test]
    fn parses_contract_anchor() {
        let route = Route::parse("/tenders/T1#contract-C1").unwrap();
        assert_eq!(
            route,
            Route::Tender {
                id: id("T1"),
                anchor: Some(Anchor::new(CardKind::Contract, id("C1"))),
                list: QueryState::new(Collection::Tenders),
            }
        );
    }

    #[test_case("/", Route::Home)]
    #[test_case("", Route::Home)]
    #[test_case("/tenders", Route::Tenders(QueryState::new(Collection::Tenders)))]
    #[test_case("/tenders/", Route::Tenders(QueryState::new(Collection::Tenders)))]
    #[test_case("/contracts", Route::Contracts(QueryState::new(Collection::Contracts)))]
    #[test_case("https://other.host/contracts/C9", Route::contract(RecordId::new("C9").unwrap()))]
    fn parses_paths(input: &str, expected: Route) {
        assert_eq!(Route::parse(input).unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_paths() {
        assert_eq!(
            Route::parse("/suppliers/S1"),
            Err(RouteError::UnknownPath("/suppliers/S1".into()))
        );
        assert!(Route::parse("/tenders/T1/extra").is_err());
    }

    #[test]
    fn malformed_anchor_is_ignored() {
        let route = Route::parse("/tenders/T1#overview").unwrap();
        assert_eq!(route.anchor(), None);
        let route = Route::parse("/tenders/T1#contract-").unwrap();
        assert_eq!(route.anchor(), None);
    }

    #[test]
    fn anchor_ids_may_contain_dashes() {
        let anchor: Anchor = "#award-UA-2024-01-a1".parse().unwrap();
        assert_eq!(anchor.kind, CardKind::Award);
        assert_eq!(anchor.id.as_str(), "UA-2024-01-a1");
        assert_eq!(anchor.to_string(), "award-UA-2024-01-a1");
    }

    #[test]
    fn permalink_reproduces_route() {
        let mut list = QueryState::new(Collection::Tenders);
        list.set_search(Some("school roof"));
        list.toggle_sort(SortKey::Value).unwrap();
        list.set_page(NonZeroU32::new(3).unwrap());

        let route = Route::Tender {
            id: id("UA 1/2"),
            anchor: Some(Anchor::new(CardKind::Contract, id("C 1"))),
            list,
        };

        let link = route.permalink(&web());
        assert!(link.starts_with("https://tenders.example.org/tenders/UA%201%2F2?"));
        assert!(link.ends_with("#contract-C%201"));
        assert_eq!(Route::parse(&link).unwrap(), route);
    }

    #[test]
    fn permalink_respects_base_path() {
        let base = Url::parse("https://example.org/viewer/").unwrap();
        assert_eq!(
            Route::contract(id("C1")).permalink(&base),
            "https://example.org/viewer/contracts/C1"
        );
    }

    #[test]
    fn close_returns_to_list_with_query() {
        let route = Route::parse("/tenders/T1?search=roads&page=2#award-A1").unwrap();
        let closed = route.close();

        let Route::Tenders(query) = &closed else {
            panic!("expected tender list, got {closed:?}");
        };
        assert_eq!(query.search(), Some("roads"));
        assert_eq!(query.page().get(), 2);
        assert_eq!(closed.to_string(), "/tenders?page=2&search=roads");
    }

    #[test]
    fn display_is_relative() {
        assert_eq!(Route::Home.to_string(), "/");
        assert_eq!(Route::contract(id("C1")).to_string(), "/contracts/C1");
    }

    #[test]
    fn plus_in_path_is_literal() {
        let route = Route::parse("/tenders/A+B").unwrap();
        assert_eq!(route, Route::tender(id("A+B")));
    }
}
