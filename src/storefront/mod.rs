//! Storefront reads: filter criteria, query composition and the records returned.
pub mod criteria;
pub mod query;
pub mod record;

pub use criteria::{FilterCriteria, FilterParams, Pagination, SortBy, SortKey};
pub use query::{compose, Filter, Stage, StorefrontQuery};
pub use record::{ProductDetail, ProductSearchHit, StorefrontListing, StorefrontPage, StorefrontProduct};
