//! Wishlist membership

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{ProductId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub user: UserId,
    pub product: ProductId,
    pub is_liked: bool,
    pub updated: DateTime<Utc>,
}

impl WishlistEntry {
    pub fn new(user: UserId, product: ProductId, is_liked: bool) -> Self {
        Self { user, product, is_liked, updated: Utc::now() }
    }

    pub fn set_liked(&mut self, is_liked: bool) {
        self.is_liked = is_liked;
        self.updated = Utc::now();
    }
}
