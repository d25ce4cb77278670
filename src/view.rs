//! Client-side view state.
//!
//! Views hold what is on screen: the query of a list, the expanded cards
//! of a detail page, the panels of the dashboard. They never block on the
//! network; each fetch is tracked by a [`Resource`] and applied when it
//! settles. Every view can be reproduced from its [`Route`].

mod route;
pub use route::{Anchor, CardKind, Route, RouteError};

mod resource;
pub use resource::Resource;

pub mod list;
pub use list::{ListRow, ListState, ListView};

pub mod detail;
pub use detail::{CardId, ContractDetail, ExpandState, Section, TenderDetail};

pub mod dashboard;
pub use dashboard::{Dashboard, Panel};
