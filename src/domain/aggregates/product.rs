//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::domain::value_objects::{BrandId, ProductId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(flatten)]
    pub discount: DiscountWindow,
    pub quantity: i32,
    pub is_active: bool,
    pub brand: Option<BrandId>,
    pub created: DateTime<Utc>,
}

/// Discounted price plus the optional window during which it applies.
///
/// A zero or negative `discounted_price` means no discount is configured.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountWindow {
    pub discounted_price: Decimal,
    pub discount_start: Option<DateTime<Utc>>,
    pub discount_end: Option<DateTime<Utc>>,
}

impl DiscountWindow {
    pub fn none() -> Self { Self::default() }

    pub fn perpetual(discounted_price: Decimal) -> Self {
        Self { discounted_price, ..Self::default() }
    }

    pub fn between(discounted_price: Decimal, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { discounted_price, discount_start: start, discount_end: end }
    }

    pub fn has_discounted_price(&self) -> bool { self.discounted_price > Decimal::ZERO }

    /// Whether the discounted price applies at `now`. Both window bounds are inclusive
    /// and a missing bound leaves that side open.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if !self.has_discounted_price() { return false; }
        match (self.discount_start, self.discount_end) {
            (None, None) => true,
            (Some(start), None) => now >= start,
            (None, Some(end)) => now <= end,
            (Some(start), Some(end)) => start <= now && now <= end,
        }
    }
}

impl Product {
    pub fn create(sku: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: ProductId::new(), sku: sku.into(), name: name.into(), description: String::new(),
            price, discount: DiscountWindow::none(), quantity: 0, is_active: true, brand: None,
            created: Utc::now(),
        }
    }

    pub fn with_brand(mut self, brand: BrandId) -> Self { self.brand = Some(brand); self }
    pub fn with_discount(mut self, discount: DiscountWindow) -> Self { self.discount = discount; self }
    pub fn with_quantity(mut self, quantity: i32) -> Self { self.quantity = quantity; self }

    pub fn is_discounted(&self, now: DateTime<Utc>) -> bool { self.discount.is_active_at(now) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn dec(v: i64) -> Decimal { Decimal::new(v, 0) }

    #[test]
    fn test_zero_discounted_price_is_never_discounted() {
        let now = Utc::now();
        let day = Duration::days(1);
        let windows = [
            (None, None),
            (Some(now - day), None),
            (None, Some(now + day)),
            (Some(now - day), Some(now + day)),
        ];
        for price in [dec(0), dec(-5)] {
            for (start, end) in windows {
                assert!(!DiscountWindow::between(price, start, end).is_active_at(now));
            }
        }
    }

    #[test]
    fn test_perpetual_discount() {
        let p = Product::create("SKU-1", "Lamp", dec(100)).with_discount(DiscountWindow::perpetual(dec(80)));
        assert!(p.is_discounted(Utc::now()));
    }

    #[test]
    fn test_start_only_window() {
        let now = Utc::now();
        let w = DiscountWindow::between(dec(80), Some(now), None);
        assert!(w.is_active_at(now));
        assert!(w.is_active_at(now + Duration::seconds(1)));
        assert!(!w.is_active_at(now - Duration::seconds(1)));
    }

    #[test]
    fn test_end_only_window() {
        let now = Utc::now();
        let w = DiscountWindow::between(dec(80), None, Some(now));
        assert!(w.is_active_at(now));
        assert!(w.is_active_at(now - Duration::seconds(1)));
        assert!(!w.is_active_at(now + Duration::seconds(1)));
    }

    #[test]
    fn test_bounded_window() {
        let now = Utc::now();
        let a = Product::create("A", "A", dec(100))
            .with_discount(DiscountWindow::between(dec(80), Some(now - Duration::days(1)), Some(now + Duration::days(1))));
        assert!(a.is_discounted(now));
        assert!(!a.is_discounted(now + Duration::days(2)));
        assert!(!a.is_discounted(now - Duration::days(2)));

        let b = Product::create("B", "B", dec(100));
        assert!(!b.is_discounted(now));
    }
}
