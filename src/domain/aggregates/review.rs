//! Product reviews and the aggregate figures derived from them

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{ProductId, ReviewId, UserId};

/// Moderation state. Only approved reviews are shown to shoppers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    #[default]
    WaitingApproval,
    Rejected,
    Approved,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingApproval => "WAITING_APPROVAL",
            Self::Rejected => "REJECTED",
            Self::Approved => "APPROVED",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ReviewStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING_APPROVAL" => Ok(Self::WaitingApproval),
            "REJECTED" => Ok(Self::Rejected),
            "APPROVED" => Ok(Self::Approved),
            other => Err(format!("unknown review status `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product: ProductId,
    pub user: Option<UserId>,
    pub title: String,
    pub rating: i32,
    pub review: String,
    pub is_recommended: bool,
    pub status: ReviewStatus,
    pub created: DateTime<Utc>,
}

impl Review {
    /// A new review awaiting moderation.
    pub fn create(product: ProductId, rating: i32) -> Self {
        Self {
            id: ReviewId::new(), product, user: None, title: String::new(), rating,
            review: String::new(), is_recommended: true, status: ReviewStatus::default(),
            created: Utc::now(),
        }
    }

    pub fn approve(mut self) -> Self { self.status = ReviewStatus::Approved; self }
    pub fn reject(mut self) -> Self { self.status = ReviewStatus::Rejected; self }

    pub fn is_approved(&self) -> bool { self.status == ReviewStatus::Approved }
}

/// Totals over every review document of a product, whatever its moderation status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub total_reviews: i64,
    pub total_ratings: i64,
    pub average_rating: f64,
}

impl ReviewSummary {
    pub fn from_ratings(ratings: impl IntoIterator<Item = i32>) -> Self {
        let (total_reviews, total_ratings) = ratings
            .into_iter()
            .fold((0i64, 0i64), |(n, sum), r| (n + 1, sum + i64::from(r)));
        Self::from_totals(total_reviews, total_ratings)
    }

    pub fn from_totals(total_reviews: i64, total_ratings: i64) -> Self {
        let average_rating = if total_reviews == 0 { 0.0 } else { total_ratings as f64 / total_reviews as f64 };
        Self { total_reviews, total_ratings, average_rating }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_no_reviews_average_is_zero() {
        let s = ReviewSummary::from_ratings(std::iter::empty());
        assert_eq!(s, ReviewSummary { total_reviews: 0, total_ratings: 0, average_rating: 0.0 });
    }
    #[test]
    fn test_average_is_exact() {
        let s = ReviewSummary::from_ratings([5, 4, 4]);
        assert_eq!(s.total_reviews, 3);
        assert_eq!(s.total_ratings, 13);
        assert_eq!(s.average_rating, 13.0 / 3.0);
    }
    #[test]
    fn test_new_review_awaits_moderation() {
        let r = Review::create(ProductId::new(), 4);
        assert_eq!(r.status, ReviewStatus::WaitingApproval);
        assert!(r.clone().approve().is_approved());
        assert!(!r.reject().is_approved());
    }
    #[test]
    fn test_status_text_round_trips() {
        for s in [ReviewStatus::WaitingApproval, ReviewStatus::Rejected, ReviewStatus::Approved] {
            assert_eq!(s.as_str().parse::<ReviewStatus>(), Ok(s));
        }
        assert!("approved".parse::<ReviewStatus>().is_err());
    }
}
