//! Store access for the catalog.
//!
//! Catalog entities are read-only here; the wishlist is the only collection written.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::aggregates::{Brand, Category, CategoryLink, Product, Review, WishlistEntry};
use crate::domain::value_objects::{BrandId, ProductId, Slug, UserId};
use crate::storefront::{StorefrontPage, StorefrontQuery};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCatalogStore;
pub use postgres::PgCatalogStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait StorefrontRepository: Send + Sync {
    /// Execute the stages of `query` in order and return the page with the filtered count.
    async fn run(&self, query: &StorefrontQuery) -> Result<StorefrontPage, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    /// Active products whose name contains `needle`, case-insensitively, ordered by name.
    async fn search_active_by_name(&self, needle: &str) -> Result<Vec<Product>, RepositoryError>;
}

#[async_trait]
pub trait BrandRepository: Send + Sync {
    async fn find_brand(&self, id: &BrandId) -> Result<Option<Brand>, RepositoryError>;
    async fn find_active_brand_by_slug(&self, slug: &Slug) -> Result<Option<Brand>, RepositoryError>;
    /// Active brands ordered by name.
    async fn list_active_brands(&self) -> Result<Vec<Brand>, RepositoryError>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_active_category_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError>;
    /// First active category, by creation, listing `product` as a member.
    async fn find_active_category_for(&self, product: &ProductId) -> Result<Option<Category>, RepositoryError>;
    /// Active categories in creation order.
    async fn list_active_categories(&self) -> Result<Vec<CategoryLink>, RepositoryError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Approved reviews of `product`, newest first.
    async fn approved_reviews_for(&self, product: &ProductId) -> Result<Vec<Review>, RepositoryError>;
}

#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Create or update the entry for `(user, product)`.
    async fn upsert_wishlist(&self, user: &UserId, product: &ProductId, is_liked: bool) -> Result<WishlistEntry, RepositoryError>;
    /// Remove every entry of `user`, returning how many were removed.
    async fn clear_wishlist(&self, user: &UserId) -> Result<u64, RepositoryError>;
}

/// Everything the catalog service needs from a store.
pub trait CatalogStore:
    StorefrontRepository
    + ProductRepository
    + BrandRepository
    + CategoryRepository
    + ReviewRepository
    + WishlistRepository
{
}

impl<T> CatalogStore for T where
    T: StorefrontRepository
        + ProductRepository
        + BrandRepository
        + CategoryRepository
        + ReviewRepository
        + WishlistRepository
{
}
