//! Read-only client for an OCDS procurement catalog.
//!
//! Tenders and contracts are fetched from a JSON backend, cached per
//! request, and presented as paginated lists, expandable detail pages and
//! shareable links.

pub mod domain;
pub use domain::{Config, ContractListing, QueryState, RecordId, Tender};

pub mod fetch;
pub use fetch::{Catalog, FetchCache, FetchError, HttpTransport};

pub mod view;
pub use view::{Dashboard, ListView, Route, TenderDetail};
