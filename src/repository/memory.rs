use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::aggregates::{Brand, Category, CategoryLink, Product, Review, ReviewSummary, WishlistEntry};
use crate::domain::value_objects::{BrandId, ProductId, Slug, UserId};
use crate::storefront::{SortKey, Stage, StorefrontPage, StorefrontProduct, StorefrontQuery};

use super::{
    BrandRepository, CategoryRepository, ProductRepository, RepositoryError, ReviewRepository,
    StorefrontRepository, WishlistRepository,
};

#[derive(Default)]
struct CatalogState {
    products: HashMap<ProductId, Product>,
    brands: HashMap<BrandId, Brand>,
    /// Insertion order doubles as creation order.
    categories: Vec<Category>,
    reviews: Vec<Review>,
    wishlists: HashMap<(UserId, ProductId), WishlistEntry>,
}

/// Catalog held in process memory. Every read takes one snapshot of the whole catalog.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self { Self::default() }

    pub async fn insert_brand(&self, brand: Brand) {
        self.state.write().await.brands.insert(brand.id, brand);
    }

    pub async fn insert_product(&self, product: Product) {
        self.state.write().await.products.insert(product.id, product);
    }

    pub async fn insert_category(&self, category: Category) {
        let mut state = self.state.write().await;
        state.categories.retain(|c| c.id != category.id);
        state.categories.push(category);
    }

    pub async fn insert_review(&self, review: Review) {
        self.state.write().await.reviews.push(review);
    }
}

impl CatalogState {
    fn joined_rows(&self) -> Vec<StorefrontProduct> {
        self.products
            .values()
            .filter_map(|product| {
                let brand = self.brands.get(product.brand.as_ref()?)?;
                brand.is_active.then(|| StorefrontProduct::join(product, brand))
            })
            .collect()
    }

    fn review_summary(&self, product: &ProductId) -> ReviewSummary {
        ReviewSummary::from_ratings(self.reviews.iter().filter(|r| &r.product == product).map(|r| r.rating))
    }
}

fn sort_rows(rows: &mut [StorefrontProduct], key: SortKey) {
    match key {
        SortKey::IdAsc => rows.sort_by_key(|r| r.id),
        SortKey::PriceDesc => rows.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id))),
        SortKey::PriceAsc => rows.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id))),
        SortKey::Newest => rows.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id))),
    }
}

#[async_trait]
impl StorefrontRepository for InMemoryCatalogStore {
    async fn run(&self, query: &StorefrontQuery) -> Result<StorefrontPage, RepositoryError> {
        let state = self.state.read().await;
        let mut rows: Vec<StorefrontProduct> = Vec::new();
        let mut count = None;

        for stage in query.stages() {
            match stage {
                Stage::BrandJoin => rows = state.joined_rows(),
                Stage::ReviewSummary => {
                    for row in &mut rows {
                        row.reviews = state.review_summary(&row.id);
                    }
                }
                Stage::DiscountFlag { now } => {
                    for row in &mut rows {
                        row.is_discounted = row.discount.is_active_at(*now);
                    }
                }
                Stage::Match(filters) => rows.retain(|row| filters.iter().all(|f| f.matches(row))),
                Stage::WishlistJoin { viewer, liked_only } => {
                    for row in &mut rows {
                        row.is_liked = state.wishlists.get(&(*viewer, row.id)).map(|w| w.is_liked);
                    }
                    if *liked_only {
                        rows.retain(|row| row.is_liked == Some(true));
                    }
                }
                Stage::SortAndPaginate { sort, pagination } => {
                    sort_rows(&mut rows, *sort);
                    let total = rows.len() as u64;
                    count = Some(total);
                    if let Some(p) = pagination {
                        let offset = usize::try_from(p.offset(total)).unwrap_or(usize::MAX);
                        rows = rows.into_iter().skip(offset).take(p.limit() as usize).collect();
                    }
                }
            }
        }

        let count = count.unwrap_or(rows.len() as u64);
        Ok(StorefrontPage { results: rows, count })
    }
}

#[async_trait]
impl ProductRepository for InMemoryCatalogStore {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.state.read().await.products.get(id).cloned())
    }

    async fn search_active_by_name(&self, needle: &str) -> Result<Vec<Product>, RepositoryError> {
        let needle = needle.to_lowercase();
        let state = self.state.read().await;
        let mut hits: Vec<Product> = state
            .products
            .values()
            .filter(|p| p.is_active && p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(hits)
    }
}

#[async_trait]
impl BrandRepository for InMemoryCatalogStore {
    async fn find_brand(&self, id: &BrandId) -> Result<Option<Brand>, RepositoryError> {
        Ok(self.state.read().await.brands.get(id).cloned())
    }

    async fn find_active_brand_by_slug(&self, slug: &Slug) -> Result<Option<Brand>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.brands.values().find(|b| b.is_active && &b.slug == slug).cloned())
    }

    async fn list_active_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        let state = self.state.read().await;
        let mut brands: Vec<Brand> = state.brands.values().filter(|b| b.is_active).cloned().collect();
        brands.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(brands)
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCatalogStore {
    async fn find_active_category_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.is_active && &c.slug == slug).cloned())
    }

    async fn find_active_category_for(&self, product: &ProductId) -> Result<Option<Category>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| c.is_active && c.contains(product)).cloned())
    }

    async fn list_active_categories(&self) -> Result<Vec<CategoryLink>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.categories.iter().filter(|c| c.is_active).map(Category::link).collect())
    }
}

#[async_trait]
impl ReviewRepository for InMemoryCatalogStore {
    async fn approved_reviews_for(&self, product: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        let state = self.state.read().await;
        let mut reviews: Vec<Review> = state
            .reviews
            .iter()
            .filter(|r| &r.product == product && r.is_approved())
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(reviews)
    }
}

#[async_trait]
impl WishlistRepository for InMemoryCatalogStore {
    async fn upsert_wishlist(&self, user: &UserId, product: &ProductId, is_liked: bool) -> Result<WishlistEntry, RepositoryError> {
        let mut state = self.state.write().await;
        let entry = state
            .wishlists
            .entry((*user, *product))
            .and_modify(|e| e.set_liked(is_liked))
            .or_insert_with(|| WishlistEntry::new(*user, *product, is_liked));
        Ok(entry.clone())
    }

    async fn clear_wishlist(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let mut state = self.state.write().await;
        let before = state.wishlists.len();
        state.wishlists.retain(|(owner, _), _| owner != user);
        Ok((before - state.wishlists.len()) as u64)
    }
}
