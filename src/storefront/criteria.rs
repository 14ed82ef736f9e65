//! Storefront filter criteria and the coercion of raw query parameters.

use std::str::FromStr;

use rust_decimal::Decimal;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query parameters as they arrive from the client. Everything is optional and untyped;
/// [`FilterCriteria::from_params`] normalizes them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub min: Option<String>,
    pub max: Option<String>,
    pub rating: Option<String>,
    pub in_discount: Option<String>,
    pub is_new: Option<String>,
    pub general_recommendation: Option<String>,
    pub category: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Collects raw `key=value` pairs. A repeated key keeps its last value and unknown keys
/// are ignored.
impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for FilterParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "min" => &mut params.min,
                "max" => &mut params.max,
                "rating" => &mut params.rating,
                "inDiscount" => &mut params.in_discount,
                "isNew" => &mut params.is_new,
                "generalRecommendation" => &mut params.general_recommendation,
                "category" => &mut params.category,
                "sortBy" => &mut params.sort_by,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                _ => continue,
            };
            *slot = Some(value.into());
        }
        params
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    #[default]
    All,
    MostExpensive,
    Cheapest,
}

impl SortBy {
    pub fn key(self) -> SortKey {
        match self {
            Self::All => SortKey::IdAsc,
            Self::MostExpensive => SortKey::PriceDesc,
            Self::Cheapest => SortKey::PriceAsc,
        }
    }
}

impl FromStr for SortBy {
    type Err = UnknownSort;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Self::All),
            "most-expensive" => Ok(Self::MostExpensive),
            "cheapest" => Ok(Self::Cheapest),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort `{0}`")]
pub struct UnknownSort(pub String);

/// Ordering applied before pagination. Price ties are broken by ascending id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    IdAsc,
    PriceDesc,
    PriceAsc,
    /// Latest `created` first.
    Newest,
}

/// 1-based page request. Only [`Pagination::new`] builds one, so `page >= 1` and
/// `1 <= limit <= MAX_PAGE_SIZE` always hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Default for Pagination {
    fn default() -> Self { Self { page: 1, limit: DEFAULT_PAGE_SIZE } }
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page: page.max(1), limit: limit.clamp(1, MAX_PAGE_SIZE) }
    }

    pub fn page(&self) -> u32 { self.page }

    pub fn limit(&self) -> u32 { self.limit }

    /// Rows to skip for a filtered set of `count` rows. A set that fits on one page is
    /// always served from the start, whatever page was asked for.
    pub fn offset(&self, count: u64) -> u64 {
        if count > u64::from(self.limit) { u64::from(self.page.saturating_sub(1)) * u64::from(self.limit) } else { 0 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FilterCriteria {
    pub min: Decimal,
    /// `None` means unbounded.
    pub max: Option<Decimal>,
    pub rating: f64,
    pub in_discount: bool,
    pub is_new: bool,
    pub general_recommendation: bool,
    pub category: Option<String>,
    pub sort_by: SortBy,
    pub pagination: Pagination,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min: Decimal::ZERO,
            max: None,
            rating: 0.0,
            in_discount: false,
            is_new: false,
            general_recommendation: false,
            category: None,
            sort_by: SortBy::All,
            pagination: Pagination::default(),
        }
    }
}

impl FilterCriteria {
    /// Normalize raw parameters. Malformed values fall back to their defaults and never fail.
    pub fn from_params(params: &FilterParams) -> Self {
        let sort_by = match params.sort_by.as_deref() {
            None => SortBy::All,
            Some(raw) => raw.parse().unwrap_or_else(|err: UnknownSort| {
                tracing::warn!(sort_by = %err.0, "unknown sortBy, using natural order");
                SortBy::All
            }),
        };

        let min = parse_decimal(params.min.as_deref())
            .filter(|min| *min >= Decimal::ZERO)
            .unwrap_or(Decimal::ZERO);

        let page = parse_positive(params.page.as_deref()).unwrap_or(1);
        let limit = parse_positive(params.limit.as_deref()).unwrap_or(DEFAULT_PAGE_SIZE);

        Self {
            min,
            max: parse_decimal(params.max.as_deref()),
            rating: params
                .rating
                .as_deref()
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|r| r.is_finite())
                .unwrap_or(0.0),
            in_discount: parse_flag(params.in_discount.as_deref()),
            is_new: parse_flag(params.is_new.as_deref()),
            general_recommendation: parse_flag(params.general_recommendation.as_deref()),
            category: params
                .category
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            sort_by,
            pagination: Pagination::new(page, limit),
        }
    }
}

fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    let raw = raw?.trim();
    Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)).ok()
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    raw?.trim().parse::<i64>().ok().filter(|v| *v >= 1).map(|v| v.min(i64::from(u32::MAX)) as u32)
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw.map(|r| r.trim().to_ascii_lowercase()).as_deref(), Some("true" | "1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn repeated_keys_keep_the_last_value() {
        let p = params(&[("min", "1"), ("min", "2"), ("utm_source", "mail")]);
        assert_eq!(p.min.as_deref(), Some("2"));
        assert_eq!(FilterCriteria::from_params(&p).min, Decimal::new(2, 0));
    }

    #[test]
    fn defaults_when_nothing_given() {
        assert_eq!(FilterCriteria::from_params(&FilterParams::default()), FilterCriteria::default());
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let c = FilterCriteria::from_params(&params(&[
            ("min", "abc"), ("max", "Infinity"), ("rating", "NaN"), ("page", "-3"), ("limit", "0"),
        ]));
        assert_eq!(c.min, Decimal::ZERO);
        assert_eq!(c.max, None);
        assert_eq!(c.rating, 0.0);
        assert_eq!(c.pagination, Pagination::default());
    }

    #[test]
    fn numbers_and_flags_parse() {
        let c = FilterCriteria::from_params(&params(&[
            ("min", "10"), ("max", "49.99"), ("rating", "4"), ("inDiscount", "true"),
            ("isNew", "1"), ("generalRecommendation", "no"), ("category", " shoes "),
            ("sortBy", "cheapest"), ("page", "2"), ("limit", "500"),
        ]));
        assert_eq!(c.min, Decimal::new(10, 0));
        assert_eq!(c.max, Some(Decimal::new(4999, 2)));
        assert_eq!(c.rating, 4.0);
        assert!(c.in_discount && c.is_new && !c.general_recommendation);
        assert_eq!(c.category.as_deref(), Some("shoes"));
        assert_eq!(c.sort_by, SortBy::Cheapest);
        assert_eq!((c.pagination.page(), c.pagination.limit()), (2, MAX_PAGE_SIZE));
    }

    #[test]
    fn unknown_sort_uses_natural_order() {
        let c = FilterCriteria::from_params(&params(&[("sortBy", "popular")]));
        assert_eq!(c.sort_by, SortBy::All);
        assert_eq!(c.sort_by.key(), SortKey::IdAsc);
    }

    #[test]
    fn offset_resets_when_everything_fits_on_one_page() {
        let p = Pagination::new(3, 10);
        assert_eq!(p.offset(25), 20);
        assert_eq!(p.offset(10), 0);
        assert_eq!(p.offset(4), 0);
    }

    #[test]
    fn zero_page_and_limit_are_clamped() {
        let p = Pagination::new(0, 0);
        assert_eq!((p.page(), p.limit()), (1, 1));
        assert_eq!(p.offset(15), 0);
        assert_eq!(Pagination::new(0, 10).offset(15), 0);
    }
}
