//! Composition of storefront queries.
//!
//! A [`StorefrontQuery`] is an ordered list of [`Stage`]s. Stores execute the stages in
//! order: later stages read fields that earlier ones attach (the match stage filters on
//! `averageRating` and `isDiscounted`, pagination counts what the match stage kept).

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::domain::aggregates::Category;
use crate::domain::value_objects::{BrandId, ProductId, UserId};
use crate::storefront::criteria::{FilterCriteria, Pagination, SortKey};
use crate::storefront::record::StorefrontProduct;

pub const RECOMMENDED_MIN_QUANTITY: i32 = 10;
pub const RECOMMENDED_MIN_RATING: f64 = 4.5;

/// One conjunct of the match stage.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    ActiveOnly,
    PriceRange { min: Decimal, max: Option<Decimal> },
    RatingFloor(f64),
    DiscountActive,
    /// `from <= created < until`
    NewSince { from: DateTime<Utc>, until: DateTime<Utc> },
    /// Well stocked and highly rated.
    GeneralRecommendation,
    CategoryMembership(Vec<ProductId>),
    Brand(BrandId),
}

impl Filter {
    pub fn matches(&self, row: &StorefrontProduct) -> bool {
        match self {
            Self::ActiveOnly => row.is_active,
            Self::PriceRange { min, max } => row.price >= *min && max.map_or(true, |max| row.price <= max),
            Self::RatingFloor(floor) => row.average_rating() >= *floor,
            Self::DiscountActive => row.is_discounted,
            Self::NewSince { from, until } => row.created >= *from && row.created < *until,
            Self::GeneralRecommendation => {
                row.quantity > RECOMMENDED_MIN_QUANTITY && row.average_rating() >= RECOMMENDED_MIN_RATING
            }
            Self::CategoryMembership(ids) => ids.binary_search(&row.id).is_ok(),
            Self::Brand(brand) => row.brand.id == *brand,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    /// Attach the brand; drop rows whose brand is missing or inactive.
    BrandJoin,
    /// Attach review totals and the average rating.
    ReviewSummary,
    /// Attach `isDiscounted` evaluated at `now`.
    DiscountFlag { now: DateTime<Utc> },
    /// Keep rows satisfying every filter.
    Match(Vec<Filter>),
    /// Attach the viewer's `isLiked`; with `liked_only`, drop rows the viewer has not liked.
    WishlistJoin { viewer: UserId, liked_only: bool },
    SortAndPaginate { sort: SortKey, pagination: Option<Pagination> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct StorefrontQuery {
    stages: Vec<Stage>,
}

impl StorefrontQuery {
    pub fn builder(now: DateTime<Utc>) -> StorefrontQueryBuilder {
        StorefrontQueryBuilder {
            now,
            filters: vec![Filter::ActiveOnly],
            wishlist: None,
            sort: SortKey::IdAsc,
            pagination: None,
        }
    }

    pub fn stages(&self) -> &[Stage] { &self.stages }
}

/// Collects filters and options in any order and emits stages in the fixed order.
#[derive(Clone, Debug)]
pub struct StorefrontQueryBuilder {
    now: DateTime<Utc>,
    filters: Vec<Filter>,
    wishlist: Option<(UserId, bool)>,
    sort: SortKey,
    pagination: Option<Pagination>,
}

impl StorefrontQueryBuilder {
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(match filter {
            Filter::CategoryMembership(mut ids) => {
                ids.sort_unstable();
                ids.dedup();
                Filter::CategoryMembership(ids)
            }
            other => other,
        });
        self
    }

    pub fn viewer(mut self, viewer: Option<UserId>) -> Self {
        self.wishlist = viewer.map(|v| (v, false));
        self
    }

    pub fn liked_by(mut self, viewer: UserId) -> Self {
        self.wishlist = Some((viewer, true));
        self
    }

    pub fn sort(mut self, sort: SortKey) -> Self { self.sort = sort; self }

    pub fn paginate(mut self, pagination: Pagination) -> Self { self.pagination = Some(pagination); self }

    pub fn build(self) -> StorefrontQuery {
        let mut stages = vec![
            Stage::BrandJoin,
            Stage::ReviewSummary,
            Stage::DiscountFlag { now: self.now },
            Stage::Match(self.filters),
        ];
        if let Some((viewer, liked_only)) = self.wishlist {
            stages.push(Stage::WishlistJoin { viewer, liked_only });
        }
        stages.push(Stage::SortAndPaginate { sort: self.sort, pagination: self.pagination });
        StorefrontQuery { stages }
    }
}

/// Midnight UTC on the first day of `now`'s month.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first = now.date_naive() - Duration::days(i64::from(now.day0()));
    Utc.from_utc_datetime(&first.and_time(NaiveTime::MIN))
}

/// Build the storefront listing query. `category` is the already resolved active category
/// for the requested slug; when the slug did not resolve, no category restriction applies.
pub fn compose(
    criteria: &FilterCriteria,
    category: Option<&Category>,
    viewer: Option<UserId>,
    now: DateTime<Utc>,
) -> StorefrontQuery {
    let mut builder = StorefrontQuery::builder(now)
        .filter(Filter::PriceRange { min: criteria.min, max: criteria.max })
        .filter(Filter::RatingFloor(criteria.rating));

    if criteria.in_discount {
        builder = builder.filter(Filter::DiscountActive);
    }
    if criteria.is_new {
        builder = builder.filter(Filter::NewSince { from: month_start(now), until: now });
    }
    if criteria.general_recommendation {
        builder = builder.filter(Filter::GeneralRecommendation);
    }
    if let Some(category) = category {
        builder = builder.filter(Filter::CategoryMembership(category.products.iter().copied().collect()));
    }

    builder
        .viewer(viewer)
        .sort(criteria.sort_by.key())
        .paginate(criteria.pagination)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Brand, Product};
    use crate::domain::value_objects::Slug;

    fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 0).unwrap() }

    fn row(price: i64, average: f64) -> StorefrontProduct {
        let brand = Brand::create("Acme", Slug::new("acme").unwrap());
        let product = Product::create("SKU", "Thing", Decimal::new(price, 0)).with_brand(brand.id);
        let mut row = StorefrontProduct::join(&product, &brand);
        row.reviews.average_rating = average;
        row
    }

    fn matches_all(q: &StorefrontQuery, r: &StorefrontProduct) -> bool {
        q.stages().iter().all(|s| match s {
            Stage::Match(filters) => filters.iter().all(|f| f.matches(r)),
            _ => true,
        })
    }

    #[test]
    fn default_query_has_fixed_stage_order() {
        let q = compose(&FilterCriteria::default(), None, None, now());
        assert_eq!(
            q.stages(),
            &[
                Stage::BrandJoin,
                Stage::ReviewSummary,
                Stage::DiscountFlag { now: now() },
                Stage::Match(vec![
                    Filter::ActiveOnly,
                    Filter::PriceRange { min: Decimal::ZERO, max: None },
                    Filter::RatingFloor(0.0),
                ]),
                Stage::SortAndPaginate { sort: SortKey::IdAsc, pagination: Some(Pagination::default()) },
            ]
        );
    }

    #[test]
    fn viewer_adds_wishlist_join_before_pagination() {
        let viewer = UserId::new();
        let q = compose(&FilterCriteria::default(), None, Some(viewer), now());
        let n = q.stages().len();
        assert_eq!(q.stages()[n - 2], Stage::WishlistJoin { viewer, liked_only: false });
        assert!(matches!(q.stages()[n - 1], Stage::SortAndPaginate { .. }));
    }

    #[test]
    fn optional_filters_follow_flags() {
        let criteria = FilterCriteria {
            in_discount: true,
            is_new: true,
            general_recommendation: true,
            ..FilterCriteria::default()
        };
        let q = compose(&criteria, None, None, now());
        let Stage::Match(filters) = &q.stages()[3] else { panic!("expected match stage") };
        assert!(filters.contains(&Filter::DiscountActive));
        assert!(filters.contains(&Filter::GeneralRecommendation));
        assert!(filters.contains(&Filter::NewSince {
            from: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            until: now(),
        }));
    }

    #[test]
    fn price_and_rating_filters_combine() {
        let criteria = FilterCriteria {
            min: Decimal::new(10, 0),
            max: Some(Decimal::new(50, 0)),
            rating: 4.0,
            ..FilterCriteria::default()
        };
        let q = compose(&criteria, None, None, now());
        let rows = [row(30, 4.2), row(60, 5.0), row(20, 3.0)];
        let kept: Vec<_> = rows.iter().filter(|r| matches_all(&q, r)).collect();
        assert_eq!(kept, vec![&rows[0]]);
    }

    #[test]
    fn general_recommendation_needs_stock_and_rating() {
        let f = Filter::GeneralRecommendation;
        let mut r = row(10, 4.5);
        r.quantity = 11;
        assert!(f.matches(&r));
        r.quantity = 10;
        assert!(!f.matches(&r));
        r.quantity = 50;
        r.reviews.average_rating = 4.4;
        assert!(!f.matches(&r));
    }

    #[test]
    fn category_membership_restricts_to_members() {
        let member = row(10, 0.0);
        let outsider = row(10, 0.0);
        let category = Category::create("Shoes", Slug::new("shoes").unwrap()).with_products([member.id]);
        let q = compose(&FilterCriteria::default(), Some(&category), None, now());
        assert!(matches_all(&q, &member));
        assert!(!matches_all(&q, &outsider));
    }

    #[test]
    fn month_start_is_midnight_on_day_one() {
        assert_eq!(month_start(now()), Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }
}
