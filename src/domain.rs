//! Domain models for the procurement catalog.
//!
//! This module contains the typed records served by the backend, the query
//! state that selects them, and the client configuration.

pub mod record;
pub use record::{Award, Contract, ContractListing, Tender};

mod record_id;
pub use record_id::{InvalidIdError, RecordId};

mod lenient;
pub use lenient::parse_timestamp;

pub mod format;

pub mod query;
pub use query::{CacheKey, Collection, QueryError, QueryState, Sort, SortDirection, SortKey};

mod release;
pub use release::flatten_release;

mod stats;
pub use stats::{StatusCounts, TenderStats};

mod config;
pub use config::{Config, ConfigError, ConfigKey, parse_base_url};
