//! Fetching catalog records over HTTP.
//!
//! Requests are keyed by their exact path and query. A [`FetchCache`]
//! deduplicates concurrent requests for the same key and memoizes the
//! settled result; [`Catalog`] layers typed decoding on top.

mod api;
pub use api::{Catalog, Page};

mod cache;
pub use cache::FetchCache;

mod envelope;
pub use envelope::Envelope;

mod error;
pub use error::FetchError;

mod http;
pub use http::HttpTransport;

mod transport;
pub use transport::Transport;
