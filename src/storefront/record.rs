//! Records returned by storefront reads.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::{Brand, BrandSummary, CategoryLink, CategorySummary, DiscountWindow, Product, ReviewSummary};
use crate::domain::value_objects::ProductId;

/// A product joined with its brand, review totals, discount state and, for a known
/// viewer, wishlist membership.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorefrontProduct {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(flatten)]
    pub discount: DiscountWindow,
    pub quantity: i32,
    pub is_active: bool,
    pub brand: BrandSummary,
    pub created: DateTime<Utc>,
    #[serde(flatten)]
    pub reviews: ReviewSummary,
    pub is_discounted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

impl StorefrontProduct {
    pub fn join(product: &Product, brand: &Brand) -> Self {
        Self {
            id: product.id,
            sku: product.sku.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            discount: product.discount.clone(),
            quantity: product.quantity,
            is_active: product.is_active,
            brand: brand.summary(),
            created: product.created,
            reviews: ReviewSummary::default(),
            is_discounted: false,
            is_liked: None,
        }
    }

    pub fn average_rating(&self) -> f64 { self.reviews.average_rating }
}

/// One page of a storefront listing. `count` is the size of the filtered set before
/// pagination.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StorefrontPage {
    pub results: Vec<StorefrontProduct>,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StorefrontListing {
    pub category: Option<CategorySummary>,
    pub results: Vec<StorefrontProduct>,
    pub count: u64,
}

impl StorefrontListing {
    pub fn from_page(category: Option<CategorySummary>, page: StorefrontPage) -> Self {
        Self { category, results: page.results, count: page.count }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(flatten)]
    pub discount: DiscountWindow,
    pub quantity: i32,
    pub is_active: bool,
    pub brand: BrandSummary,
    pub created: DateTime<Utc>,
    pub is_discounted: bool,
    pub category: Option<CategoryLink>,
}

impl ProductDetail {
    pub fn new(product: Product, brand: &Brand, category: Option<CategoryLink>, now: DateTime<Utc>) -> Self {
        Self {
            is_discounted: product.is_discounted(now),
            id: product.id,
            sku: product.sku,
            name: product.name,
            description: product.description,
            price: product.price,
            discount: product.discount,
            quantity: product.quantity,
            is_active: product.is_active,
            brand: brand.summary(),
            created: product.created,
            category,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductSearchHit {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
}

impl From<&Product> for ProductSearchHit {
    fn from(p: &Product) -> Self { Self { id: p.id, name: p.name.clone(), price: p.price } }
}
