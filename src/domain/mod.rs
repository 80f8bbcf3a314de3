//! Domain models and business logic independent of any document backend.
//!
//! This module contains price detection patterns and number handling,
//! page geometry, the per-run catalog plan and the decoded brand image.

pub mod brand;
pub mod geometry;
pub mod plan;
pub mod price;

pub use brand::BrandImage;
pub use geometry::{Point, Rect, Rgb};
pub use plan::CatalogPlan;
pub use price::{looks_like_price, AmountMatcher, CurrencyMatcher, NumericFormatter};

use regex::Regex;

/// Trait for text pattern matchers.
pub trait PatternMatcher: Send + Sync {
    fn pattern(&self) -> &Regex;
    fn extract_all<'a>(&self, text: &'a str) -> Vec<&'a str>;
}
