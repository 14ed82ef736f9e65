//! PostgreSQL catalog store. Storefront queries are compiled into one SQL statement whose
//! nesting mirrors the stage order: the joins and computed columns live in an inner
//! select, the match stage filters over it and pagination wraps the filtered set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::aggregates::{
    Brand, BrandSummary, Category, CategoryLink, DiscountWindow, Product, Review, ReviewStatus,
    ReviewSummary, WishlistEntry,
};
use crate::domain::value_objects::{BrandId, CategoryId, ProductId, Slug, UserId};
use crate::storefront::query::{RECOMMENDED_MIN_QUANTITY, RECOMMENDED_MIN_RATING};
use crate::storefront::{
    Filter, Pagination, SortKey, Stage, StorefrontPage, StorefrontProduct, StorefrontQuery,
};

use super::{
    BrandRepository, CategoryRepository, ProductRepository, RepositoryError, ReviewRepository,
    StorefrontRepository, WishlistRepository,
};

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

// =============================================================================
// Storefront query compilation
// =============================================================================

/// The stages of a [`StorefrontQuery`] regrouped by the SQL clause they contribute to.
#[derive(Debug)]
struct Plan<'q> {
    brand_join: bool,
    reviews: bool,
    now: Option<DateTime<Utc>>,
    filters: Vec<&'q Filter>,
    wishlist: Option<(UserId, bool)>,
    sort: SortKey,
    pagination: Option<Pagination>,
}

impl<'q> Plan<'q> {
    fn from_query(query: &'q StorefrontQuery) -> Result<Self, RepositoryError> {
        let mut plan = Plan {
            brand_join: false,
            reviews: false,
            now: None,
            filters: Vec::new(),
            wishlist: None,
            sort: SortKey::IdAsc,
            pagination: None,
        };
        for stage in query.stages() {
            match stage {
                Stage::BrandJoin => plan.brand_join = true,
                Stage::ReviewSummary => plan.reviews = true,
                Stage::DiscountFlag { now } => plan.now = Some(*now),
                Stage::Match(filters) => plan.filters.extend(filters),
                Stage::WishlistJoin { viewer, liked_only } => plan.wishlist = Some((*viewer, *liked_only)),
                Stage::SortAndPaginate { sort, pagination } => {
                    plan.sort = *sort;
                    plan.pagination = *pagination;
                }
            }
        }
        if !plan.brand_join {
            return Err(RepositoryError::Decode("storefront query without a brand join".into()));
        }
        Ok(plan)
    }
}

const PRODUCT_COLUMNS: &str = "p.id, p.sku, p.name, p.description, p.price, p.discounted_price, \
     p.discount_start, p.discount_end, p.quantity, p.is_active, p.created, \
     b.id AS brand_id, b.name AS brand_name, b.is_active AS brand_is_active";

fn push_discount_flag(qb: &mut QueryBuilder<'_, Postgres>, now: Option<DateTime<Utc>>) {
    let Some(now) = now else {
        qb.push("FALSE");
        return;
    };
    qb.push("CASE WHEN p.discounted_price > 0 THEN CASE ")
        .push("WHEN p.discount_start IS NULL AND p.discount_end IS NULL THEN TRUE ")
        .push("WHEN p.discount_end IS NULL THEN p.discount_start <= ")
        .push_bind(now)
        .push(" WHEN p.discount_start IS NULL THEN p.discount_end >= ")
        .push_bind(now)
        .push(" ELSE p.discount_start <= ")
        .push_bind(now)
        .push(" AND p.discount_end >= ")
        .push_bind(now)
        .push(" END ELSE FALSE END");
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::ActiveOnly => {
            qb.push("s.is_active");
        }
        Filter::PriceRange { min, max } => {
            qb.push("s.price >= ").push_bind(*min);
            if let Some(max) = max {
                qb.push(" AND s.price <= ").push_bind(*max);
            }
        }
        Filter::RatingFloor(floor) => {
            qb.push("s.average_rating >= ").push_bind(*floor);
        }
        Filter::DiscountActive => {
            qb.push("s.is_discounted");
        }
        Filter::NewSince { from, until } => {
            qb.push("s.created >= ").push_bind(*from).push(" AND s.created < ").push_bind(*until);
        }
        Filter::GeneralRecommendation => {
            qb.push("s.quantity > ")
                .push_bind(RECOMMENDED_MIN_QUANTITY)
                .push(" AND s.average_rating >= ")
                .push_bind(RECOMMENDED_MIN_RATING);
        }
        Filter::CategoryMembership(ids) => {
            let ids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
            qb.push("s.id = ANY(").push_bind(ids).push(")");
        }
        Filter::Brand(brand) => {
            qb.push("s.brand_id = ").push_bind(brand.as_uuid());
        }
    }
}

/// `SELECT * FROM (<joined>) AS s WHERE <filters>`
fn push_filtered(qb: &mut QueryBuilder<'_, Postgres>, plan: &Plan<'_>) {
    qb.push("SELECT * FROM (SELECT ").push(PRODUCT_COLUMNS).push(", ");

    if plan.reviews {
        qb.push(
            "COALESCE(r.total_reviews, 0)::BIGINT AS total_reviews, \
             COALESCE(r.total_ratings, 0)::BIGINT AS total_ratings, \
             CASE WHEN COALESCE(r.total_reviews, 0) = 0 THEN 0::FLOAT8 \
             ELSE r.total_ratings::FLOAT8 / r.total_reviews::FLOAT8 END AS average_rating, ",
        );
    } else {
        qb.push("0::BIGINT AS total_reviews, 0::BIGINT AS total_ratings, 0::FLOAT8 AS average_rating, ");
    }

    push_discount_flag(qb, plan.now);
    qb.push(" AS is_discounted, ");
    qb.push(if plan.wishlist.is_some() { "w.is_liked AS is_liked" } else { "NULL::BOOLEAN AS is_liked" });

    qb.push(" FROM products p JOIN brands b ON b.id = p.brand_id AND b.is_active");
    if plan.reviews {
        qb.push(
            " LEFT JOIN (SELECT product_id, COUNT(*) AS total_reviews, SUM(rating) AS total_ratings \
             FROM reviews GROUP BY product_id) r ON r.product_id = p.id",
        );
    }
    if let Some((viewer, liked_only)) = plan.wishlist {
        qb.push(if liked_only { " JOIN" } else { " LEFT JOIN" })
            .push(" wishlists w ON w.product_id = p.id AND w.user_id = ")
            .push_bind(viewer.as_uuid());
        if liked_only {
            qb.push(" AND w.is_liked");
        }
    }
    qb.push(") AS s WHERE ");

    if plan.filters.is_empty() {
        qb.push("TRUE");
    }
    for (i, filter) in plan.filters.iter().enumerate() {
        if i > 0 {
            qb.push(" AND ");
        }
        qb.push("(");
        push_filter(qb, filter);
        qb.push(")");
    }
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: SortKey) {
    qb.push(match sort {
        SortKey::IdAsc => " ORDER BY s.id ASC",
        SortKey::PriceDesc => " ORDER BY s.price DESC, s.id ASC",
        SortKey::PriceAsc => " ORDER BY s.price ASC, s.id ASC",
        SortKey::Newest => " ORDER BY s.created DESC, s.id DESC",
    });
}

fn count_statement<'a>(plan: &Plan<'_>) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM (");
    push_filtered(&mut qb, plan);
    qb.push(") AS filtered");
    qb
}

fn page_statement<'a>(plan: &Plan<'_>, count: u64) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new("");
    push_filtered(&mut qb, plan);
    push_order(&mut qb, plan.sort);
    if let Some(p) = plan.pagination {
        let offset = i64::try_from(p.offset(count)).unwrap_or(i64::MAX);
        qb.push(" LIMIT ").push_bind(i64::from(p.limit())).push(" OFFSET ").push_bind(offset);
    }
    qb
}

#[derive(sqlx::FromRow)]
struct StorefrontRow {
    id: Uuid,
    sku: String,
    name: String,
    description: String,
    price: Decimal,
    discounted_price: Decimal,
    discount_start: Option<DateTime<Utc>>,
    discount_end: Option<DateTime<Utc>>,
    quantity: i32,
    is_active: bool,
    created: DateTime<Utc>,
    brand_id: Uuid,
    brand_name: String,
    brand_is_active: bool,
    total_reviews: i64,
    total_ratings: i64,
    average_rating: f64,
    is_discounted: bool,
    is_liked: Option<bool>,
}

impl From<StorefrontRow> for StorefrontProduct {
    fn from(r: StorefrontRow) -> Self {
        Self {
            id: r.id.into(),
            sku: r.sku,
            name: r.name,
            description: r.description,
            price: r.price,
            discount: DiscountWindow::between(r.discounted_price, r.discount_start, r.discount_end),
            quantity: r.quantity,
            is_active: r.is_active,
            brand: BrandSummary { id: r.brand_id.into(), name: r.brand_name, is_active: r.brand_is_active },
            created: r.created,
            reviews: ReviewSummary {
                total_reviews: r.total_reviews,
                total_ratings: r.total_ratings,
                average_rating: r.average_rating,
            },
            is_discounted: r.is_discounted,
            is_liked: r.is_liked,
        }
    }
}

#[async_trait]
impl StorefrontRepository for PgCatalogStore {
    async fn run(&self, query: &StorefrontQuery) -> Result<StorefrontPage, RepositoryError> {
        let plan = Plan::from_query(query)?;

        // Count and page must observe the same snapshot.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY").execute(&mut *tx).await?;

        let (count,): (i64,) = count_statement(&plan).build_query_as().fetch_one(&mut *tx).await?;
        let count = u64::try_from(count).unwrap_or_default();

        let rows: Vec<StorefrontRow> = page_statement(&plan, count).build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        tracing::debug!(count, returned = rows.len(), "storefront query executed");
        Ok(StorefrontPage { results: rows.into_iter().map(Into::into).collect(), count })
    }
}

// =============================================================================
// Entity lookups
// =============================================================================

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    sku: String,
    name: String,
    description: String,
    price: Decimal,
    discounted_price: Decimal,
    discount_start: Option<DateTime<Utc>>,
    discount_end: Option<DateTime<Utc>>,
    quantity: i32,
    is_active: bool,
    brand_id: Option<Uuid>,
    created: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id.into(),
            sku: r.sku,
            name: r.name,
            description: r.description,
            price: r.price,
            discount: DiscountWindow::between(r.discounted_price, r.discount_start, r.discount_end),
            quantity: r.quantity,
            is_active: r.is_active,
            brand: r.brand_id.map(BrandId::from),
            created: r.created,
        }
    }
}

const PRODUCT_SELECT: &str = "SELECT id, sku, name, description, price, discounted_price, discount_start, \
     discount_end, quantity, is_active, brand_id, created FROM products";

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl ProductRepository for PgCatalogStore {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("{PRODUCT_SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn search_active_by_name(&self, needle: &str) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "{PRODUCT_SELECT} WHERE is_active AND name ILIKE '%' || $1 || '%' ORDER BY name COLLATE \"C\", id"
        ))
        .bind(escape_like(needle))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[derive(sqlx::FromRow)]
struct BrandRow {
    id: Uuid,
    name: String,
    slug: String,
    is_active: bool,
}

impl TryFrom<BrandRow> for Brand {
    type Error = RepositoryError;
    fn try_from(r: BrandRow) -> Result<Self, Self::Error> {
        let slug = Slug::new(r.slug).map_err(|e| RepositoryError::Decode(format!("brand {}: {e}", r.id)))?;
        Ok(Self { id: r.id.into(), name: r.name, slug, is_active: r.is_active })
    }
}

#[async_trait]
impl BrandRepository for PgCatalogStore {
    async fn find_brand(&self, id: &BrandId) -> Result<Option<Brand>, RepositoryError> {
        sqlx::query_as::<_, BrandRow>("SELECT id, name, slug, is_active FROM brands WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .map(Brand::try_from)
            .transpose()
    }

    async fn find_active_brand_by_slug(&self, slug: &Slug) -> Result<Option<Brand>, RepositoryError> {
        sqlx::query_as::<_, BrandRow>("SELECT id, name, slug, is_active FROM brands WHERE slug = $1 AND is_active")
            .bind(slug.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Brand::try_from)
            .transpose()
    }

    async fn list_active_brands(&self) -> Result<Vec<Brand>, RepositoryError> {
        sqlx::query_as::<_, BrandRow>("SELECT id, name, slug, is_active FROM brands WHERE is_active ORDER BY name COLLATE \"C\", id")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Brand::try_from)
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    slug: String,
    name: String,
    description: String,
    is_active: bool,
}

impl PgCatalogStore {
    async fn load_category(&self, row: CategoryRow) -> Result<Category, RepositoryError> {
        let members: Vec<(Uuid,)> = sqlx::query_as("SELECT product_id FROM category_products WHERE category_id = $1")
            .bind(row.id)
            .fetch_all(&self.pool)
            .await?;
        let slug = Slug::new(row.slug).map_err(|e| RepositoryError::Decode(format!("category {}: {e}", row.id)))?;
        Ok(Category {
            id: CategoryId::from(row.id),
            slug,
            name: row.name,
            description: row.description,
            products: members.into_iter().map(|(id,)| ProductId::from(id)).collect(),
            is_active: row.is_active,
        })
    }
}

#[async_trait]
impl CategoryRepository for PgCatalogStore {
    async fn find_active_category_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, slug, name, description, is_active FROM categories WHERE slug = $1 AND is_active",
        )
        .bind(slug.as_str())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.load_category(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_active_category_for(&self, product: &ProductId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.slug, c.name, c.description, c.is_active FROM categories c \
             JOIN category_products cp ON cp.category_id = c.id \
             WHERE c.is_active AND cp.product_id = $1 ORDER BY c.created, c.id LIMIT 1",
        )
        .bind(product.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(self.load_category(row).await?)),
            None => Ok(None),
        }
    }

    async fn list_active_categories(&self) -> Result<Vec<CategoryLink>, RepositoryError> {
        let rows: Vec<(Uuid, String, String)> =
            sqlx::query_as("SELECT id, slug, name FROM categories WHERE is_active ORDER BY created, id")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter()
            .map(|(id, slug, name)| {
                let slug = Slug::new(slug).map_err(|e| RepositoryError::Decode(format!("category {id}: {e}")))?;
                Ok(CategoryLink { id: CategoryId::from(id), name, slug })
            })
            .collect()
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    user_id: Option<Uuid>,
    title: String,
    rating: i32,
    review: String,
    is_recommended: bool,
    status: String,
    created: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;
    fn try_from(r: ReviewRow) -> Result<Self, Self::Error> {
        let status = r.status.parse::<ReviewStatus>().map_err(RepositoryError::Decode)?;
        Ok(Self {
            id: r.id.into(),
            product: r.product_id.into(),
            user: r.user_id.map(UserId::from),
            title: r.title,
            rating: r.rating,
            review: r.review,
            is_recommended: r.is_recommended,
            status,
            created: r.created,
        })
    }
}

#[async_trait]
impl ReviewRepository for PgCatalogStore {
    async fn approved_reviews_for(&self, product: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        sqlx::query_as::<_, ReviewRow>(
            "SELECT id, product_id, user_id, title, rating, review, is_recommended, status, created \
             FROM reviews WHERE product_id = $1 AND status = $2 ORDER BY created DESC, id DESC",
        )
        .bind(product.as_uuid())
        .bind(ReviewStatus::Approved.as_str())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Review::try_from)
        .collect()
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    user_id: Uuid,
    product_id: Uuid,
    is_liked: bool,
    updated: DateTime<Utc>,
}

#[async_trait]
impl WishlistRepository for PgCatalogStore {
    async fn upsert_wishlist(&self, user: &UserId, product: &ProductId, is_liked: bool) -> Result<WishlistEntry, RepositoryError> {
        let row = sqlx::query_as::<_, WishlistRow>(
            "INSERT INTO wishlists (user_id, product_id, is_liked, updated) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET is_liked = EXCLUDED.is_liked, updated = EXCLUDED.updated \
             RETURNING user_id, product_id, is_liked, updated",
        )
        .bind(user.as_uuid())
        .bind(product.as_uuid())
        .bind(is_liked)
        .fetch_one(&self.pool)
        .await?;
        Ok(WishlistEntry {
            user: row.user_id.into(),
            product: row.product_id.into(),
            is_liked: row.is_liked,
            updated: row.updated,
        })
    }

    async fn clear_wishlist(&self, user: &UserId) -> Result<u64, RepositoryError> {
        let done = sqlx::query("DELETE FROM wishlists WHERE user_id = $1")
            .bind(user.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected())
    }
}
