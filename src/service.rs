//! Catalog service: binds query composition and discount evaluation to a catalog store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::domain::aggregates::{Brand, Category, CategoryLink, Review, WishlistEntry};
use crate::domain::events::{DomainEvent, WishlistEvent};
use crate::domain::value_objects::{ProductId, Slug, UserId};
use crate::repository::{
    BrandRepository, CatalogStore, CategoryRepository, ProductRepository, ReviewRepository,
    StorefrontRepository, WishlistRepository,
};
use crate::storefront::{
    compose, Filter, FilterCriteria, Pagination, ProductDetail, ProductSearchHit, SortKey,
    StorefrontListing, StorefrontQuery,
};
use crate::{CatalogError, Result};

/// Size of the per-brand listing.
pub const BRAND_LISTING_SIZE: u32 = 10;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    events: Option<async_nats::Client>,
    clock: Clock,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store, events: None, clock: Arc::new(Utc::now) }
    }

    /// Publish domain events on NATS.
    pub fn with_events(mut self, client: async_nats::Client) -> Self {
        self.events = Some(client);
        self
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> { (self.clock)() }

    pub async fn list_storefront(&self, criteria: &FilterCriteria, viewer: Option<UserId>) -> Result<StorefrontListing> {
        let category = match criteria.category.as_deref() {
            Some(raw) => self.resolve_category(raw).await?,
            None => None,
        };

        let query = compose(criteria, category.as_ref(), viewer, self.now());
        let page = self.store.run(&query).await?;

        info!(
            event_name = "storefront.listed",
            count = page.count,
            returned = page.results.len(),
            category = category.as_ref().map(|c| c.slug.as_str()),
            anonymous = viewer.is_none(),
            "storefront listing served"
        );
        Ok(StorefrontListing::from_page(category.map(|c| c.summary()), page))
    }

    /// Unknown, inactive and malformed slugs all resolve to no category.
    async fn resolve_category(&self, raw: &str) -> Result<Option<Category>> {
        let Ok(slug) = Slug::new(raw) else {
            debug!(category = raw, "malformed category slug ignored");
            return Ok(None);
        };
        let category = self.store.find_active_category_by_slug(&slug).await?;
        if category.is_none() {
            debug!(category = %slug, "category not found, listing unrestricted");
        }
        Ok(category)
    }

    pub async fn get_storefront_item(&self, id: &ProductId) -> Result<ProductDetail> {
        let product = self
            .store
            .find_by_id(id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(CatalogError::NotFound("product"))?;
        let brand_id = product.brand.ok_or(CatalogError::NotFound("product"))?;
        let brand = self
            .store
            .find_brand(&brand_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or(CatalogError::NotFound("product"))?;
        let category = self.store.find_active_category_for(id).await?.map(|c| c.link());

        Ok(ProductDetail::new(product, &brand, category, self.now()))
    }

    /// Newest active products of an active brand.
    pub async fn list_brand_storefront(&self, slug: &str, viewer: Option<UserId>) -> Result<StorefrontListing> {
        let slug = Slug::new(slug).map_err(|_| CatalogError::NotFound("brand"))?;
        let brand = self
            .store
            .find_active_brand_by_slug(&slug)
            .await?
            .ok_or(CatalogError::NotFound("brand"))?;

        let query = StorefrontQuery::builder(self.now())
            .filter(Filter::Brand(brand.id))
            .viewer(viewer)
            .sort(SortKey::Newest)
            .paginate(Pagination::new(1, BRAND_LISTING_SIZE))
            .build();
        let page = self.store.run(&query).await?;

        info!(event_name = "storefront.brand_listed", brand = %brand.slug, count = page.count, "brand listing served");
        Ok(StorefrontListing::from_page(None, page))
    }

    pub async fn search_products(&self, name: &str) -> Result<Vec<ProductSearchHit>> {
        let needle = name.trim();
        if needle.is_empty() {
            return Err(CatalogError::InvalidRequest("search term is empty".into()));
        }
        let products = self.store.search_active_by_name(needle).await?;
        Ok(products.iter().map(ProductSearchHit::from).collect())
    }

    /// Active categories, for discovering the slugs the listing filter accepts.
    pub async fn list_categories(&self) -> Result<Vec<CategoryLink>> {
        Ok(self.store.list_active_categories().await?)
    }

    pub async fn list_brands(&self) -> Result<Vec<Brand>> {
        Ok(self.store.list_active_brands().await?)
    }

    /// Approved reviews of a product, newest first. A product that is missing, has no
    /// brand, or whose brand is inactive has no visible reviews.
    pub async fn list_product_reviews(&self, id: &ProductId) -> Result<Vec<Review>> {
        let Some(product) = self.store.find_by_id(id).await? else {
            return Ok(Vec::new());
        };
        let Some(brand_id) = product.brand else {
            return Ok(Vec::new());
        };
        match self.store.find_brand(&brand_id).await? {
            Some(brand) if brand.is_active => Ok(self.store.approved_reviews_for(id).await?),
            _ => Ok(Vec::new()),
        }
    }

    pub async fn set_wishlist(&self, viewer: UserId, product: ProductId, is_liked: bool) -> Result<WishlistEntry> {
        if self.store.find_by_id(&product).await?.is_none() {
            return Err(CatalogError::NotFound("product"));
        }
        let entry = self.store.upsert_wishlist(&viewer, &product, is_liked).await?;

        info!(event_name = "wishlist.updated", user = %viewer, product = %product, is_liked, "wishlist updated");
        self.publish(DomainEvent::Wishlist(WishlistEvent::Updated {
            user: viewer,
            product,
            is_liked,
            at: entry.updated,
        }))
        .await;
        Ok(entry)
    }

    /// Every storefront product the viewer has liked, unpaginated.
    pub async fn list_wishlist(&self, viewer: UserId) -> Result<StorefrontListing> {
        let query = StorefrontQuery::builder(self.now()).liked_by(viewer).build();
        let page = self.store.run(&query).await?;
        Ok(StorefrontListing::from_page(None, page))
    }

    pub async fn clear_wishlist(&self, viewer: UserId) -> Result<u64> {
        let removed = self.store.clear_wishlist(&viewer).await?;
        info!(event_name = "wishlist.cleared", user = %viewer, removed, "wishlist cleared");
        self.publish(DomainEvent::Wishlist(WishlistEvent::Cleared { user: viewer, removed, at: self.now() }))
            .await;
        Ok(removed)
    }

    async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.events else { return };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, subject = event.subject(), "could not encode domain event");
                return;
            }
        };
        if let Err(err) = client.publish(event.subject().to_string(), payload.into()).await {
            warn!(error = %err, subject = event.subject(), "could not publish domain event");
        }
    }
}
