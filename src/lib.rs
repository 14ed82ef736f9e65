//! OpenSASE Storefront Catalog
//!
//! Public storefront reads over the product catalog.
//!
//! ## Features
//! - Discount windows evaluated per product
//! - Filterable, sortable, paginated storefront listings
//! - Review aggregates (count, total, average) per product
//! - Per-viewer wishlist membership
//! - Product detail with brand and category summaries

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod http;
pub mod repository;
pub mod service;
pub mod storefront;

pub use config::{AppConfig, ConfigError};
pub use service::CatalogService;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("catalog store unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl From<repository::RepositoryError> for CatalogError {
    fn from(err: repository::RepositoryError) -> Self { Self::UpstreamUnavailable(err.to_string()) }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
