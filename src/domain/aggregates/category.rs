//! Category Aggregate

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{CategoryId, ProductId, Slug};

#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub slug: Slug,
    pub name: String,
    pub description: String,
    pub products: HashSet<ProductId>,
    pub is_active: bool,
}

impl Category {
    pub fn create(name: impl Into<String>, slug: Slug) -> Self {
        Self { id: CategoryId::new(), slug, name: name.into(), description: String::new(), products: HashSet::new(), is_active: true }
    }

    pub fn with_products(mut self, products: impl IntoIterator<Item = ProductId>) -> Self {
        self.products.extend(products);
        self
    }

    pub fn contains(&self, product: &ProductId) -> bool { self.products.contains(product) }

    /// Summary returned alongside a filtered listing.
    pub fn summary(&self) -> CategorySummary {
        CategorySummary { id: self.id, name: self.name.clone(), description: self.description.clone() }
    }

    /// Summary embedded into a product detail.
    pub fn link(&self) -> CategoryLink {
        CategoryLink { id: self.id, name: self.name.clone(), slug: self.slug.clone() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLink {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
}
