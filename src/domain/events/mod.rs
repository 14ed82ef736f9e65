//! Domain events
use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::domain::value_objects::{ProductId, UserId};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    Wishlist(WishlistEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WishlistEvent {
    #[serde(rename_all = "camelCase")]
    Updated { user: UserId, product: ProductId, is_liked: bool, at: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    Cleared { user: UserId, removed: u64, at: DateTime<Utc> },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Wishlist(WishlistEvent::Updated { .. }) => "catalog.wishlist.updated",
            Self::Wishlist(WishlistEvent::Cleared { .. }) => "catalog.wishlist.cleared",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_event_subject_and_payload() {
        let e = DomainEvent::Wishlist(WishlistEvent::Updated { user: UserId::new(), product: ProductId::new(), is_liked: true, at: Utc::now() });
        assert_eq!(e.subject(), "catalog.wishlist.updated");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["wishlist"]["updated"]["isLiked"], true);
    }
}
