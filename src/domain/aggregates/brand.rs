//! Brand Aggregate

use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{BrandId, Slug};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: Slug,
    pub is_active: bool,
}

impl Brand {
    pub fn create(name: impl Into<String>, slug: Slug) -> Self {
        Self { id: BrandId::new(), name: name.into(), slug, is_active: true }
    }

    pub fn deactivate(&mut self) { self.is_active = false; }

    pub fn summary(&self) -> BrandSummary {
        BrandSummary { id: self.id, name: self.name.clone(), is_active: self.is_active }
    }
}

/// Denormalized brand fields carried on storefront records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandSummary {
    pub id: BrandId,
    pub name: String,
    pub is_active: bool,
}
