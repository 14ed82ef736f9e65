//! Aggregates module
pub mod brand;
pub mod category;
pub mod product;
pub mod review;
pub mod wishlist;

pub use brand::{Brand, BrandSummary};
pub use category::{Category, CategoryLink, CategorySummary};
pub use product::{DiscountWindow, Product};
pub use review::{Review, ReviewStatus, ReviewSummary};
pub use wishlist::WishlistEntry;
