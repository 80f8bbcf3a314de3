//! Price re-marking for PDF product catalogs.
//!
//! This library takes a supplier catalog, finds every printed price, adds a
//! fixed markup and paints the new price over the old one so that it
//! blends into the page. It can also stamp a brand logo onto product photos,
//! drop pages, and prepend a cover and an intro page.
//!
//! # Features
//!
//! - **Layered price detection**: four scans from strict to permissive,
//!   deduplicated per page so a price is only rewritten once
//! - **Locale-tolerant parsing**: `1.234,56` and `1,234.56` both parse
//! - **Color matching**: erasure and new text use colors sampled from the page
//! - **Logo overlay**: product-sized pictures get a small logo in the corner
//! - **Catalog assembly**: cover, intro and page exclusion
//!
//! # Architecture
//!
//! - [`domain`]: Price patterns, formatting, geometry and the run plan
//! - [`backend`]: Page/document traits and the MuPDF + lopdf implementation
//! - [`catalog`]: Detection, rewriting, overlay and assembly
//! - [`error`]: Error taxonomy
//!
//! # Quick Start
//!
//! ```no_run
//! use repricer::{CatalogPlan, CatalogService};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let plan = CatalogPlan::with_markup(5.0);
//! let report = CatalogService::new().process_catalog(
//!     Path::new("supplier.pdf"),
//!     Path::new("catalog.pdf"),
//!     &plan,
//!     |p| println!("{:.0}%", p * 100.0),
//! )?;
//! println!("{}", report);
//! # Ok(())
//! # }
//! ```
//!
//! # Examples
//!
//! ## Price Formatting
//!
//! ```
//! use repricer::domain::NumericFormatter;
//!
//! assert_eq!(NumericFormatter::parse("R$ 1.234,56"), 1234.56);
//! assert_eq!(NumericFormatter::format(1234.5), "R$ 1.234,50");
//! ```
//!
//! ## Pattern Matching
//!
//! ```
//! use repricer::domain::{CurrencyMatcher, PatternMatcher};
//!
//! let matcher = CurrencyMatcher::new();
//! let prices = matcher.extract_all("De R$ 20,00 por R$14.90");
//! assert_eq!(prices, vec!["R$ 20,00", "R$14.90"]);
//! ```

// Public API
pub mod backend;
pub mod catalog;
pub mod domain;
pub mod error;

// Re-exports for convenient access
pub use backend::{CatalogBackend, CatalogPage, PdfBackend, SaveMode};
pub use catalog::{
    AssemblyStage, CatalogAssembler, CatalogReport, CatalogService, ColorSampler,
    ImageOverlayPlacer, OcclusionTracker, PriceLocator, PriceOccurrence, PriceRewriter, Strategy,
};
pub use domain::{BrandImage, CatalogPlan, NumericFormatter, PatternMatcher, Rect, Rgb};
pub use error::{CatalogError, CatalogResult};
