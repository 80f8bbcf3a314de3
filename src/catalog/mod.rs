//! Catalog re-marking engine.
//!
//! [`CatalogService`] is the entry point: it validates the inputs, opens the
//! source with [`PdfBackend`] and drives a [`CatalogAssembler`], which in
//! turn runs the [`PriceRewriter`] and [`ImageOverlayPlacer`] on every kept
//! page.

pub mod assembler;
pub mod color;
pub mod locator;
pub mod occlusion;
pub mod overlay;
pub mod rewriter;

pub use assembler::{AssemblyStage, CatalogAssembler, CatalogReport};
pub use color::{ColorSample, ColorSampler};
pub use locator::{PriceLocator, PriceOccurrence, Strategy, StyleHint};
pub use occlusion::OcclusionTracker;
pub use overlay::ImageOverlayPlacer;
pub use rewriter::PriceRewriter;

use crate::backend::PdfBackend;
use crate::domain::{BrandImage, CatalogPlan};
use crate::error::{CatalogError, CatalogResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// High-level API over the catalog pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogService;

impl CatalogService {
    pub fn new() -> Self {
        Self
    }

    /// Re-marks every price in `source`, stamps the plan's logo and writes
    /// the assembled catalog to `dest`.
    ///
    /// `progress` is called with values in `0.0..=1.0` from the calling
    /// thread after each page and around the final save.
    pub fn process_catalog<F>(
        &self,
        source: &Path,
        dest: &Path,
        plan: &CatalogPlan,
        progress: F,
    ) -> CatalogResult<CatalogReport>
    where
        F: FnMut(f32),
    {
        if !source.exists() {
            return Err(CatalogError::InputNotFound {
                path: source.to_path_buf(),
            });
        }
        plan.validate()?;

        let logo = plan.logo_image.as_deref().and_then(load_logo);

        info!(
            source = %source.display(),
            dest = %dest.display(),
            markup = plan.price_markup,
            "Processing catalog"
        );

        let backend = PdfBackend::open(source)?;
        CatalogAssembler::new(plan, logo.as_ref()).assemble(backend, dest, progress)
    }

    /// Writes one low-resolution JPEG per page into the system temp
    /// directory and returns their paths.
    pub fn generate_thumbnails(&self, source: &Path) -> CatalogResult<Vec<PathBuf>> {
        self.generate_thumbnails_in(source, &std::env::temp_dir())
    }

    /// Same as [`generate_thumbnails`](Self::generate_thumbnails), writing
    /// into `dir`.
    pub fn generate_thumbnails_in(&self, source: &Path, dir: &Path) -> CatalogResult<Vec<PathBuf>> {
        if !source.exists() {
            return Err(CatalogError::InputNotFound {
                path: source.to_path_buf(),
            });
        }
        std::fs::create_dir_all(dir).map_err(|e| CatalogError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let thumbs = PdfBackend::thumbnails(source, dir)?;
        info!(count = thumbs.len(), dir = %dir.display(), "Generated thumbnails");
        Ok(thumbs)
    }

    /// Extracts the plain text of a whole document.
    pub fn extract_text(&self, input: &Path) -> CatalogResult<String> {
        let bytes = std::fs::read(input).map_err(|e| CatalogError::Io {
            path: input.to_path_buf(),
            source: e,
        })?;

        pdf_extract::extract_text_from_mem(&bytes).map_err(|e| CatalogError::TextExtraction {
            path: input.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Decodes the brand image; a missing or unreadable file only disables
/// the logo features.
fn load_logo(path: &Path) -> Option<BrandImage> {
    match BrandImage::open(path) {
        Ok(logo) => Some(logo),
        Err(e) => {
            warn!(logo = %path.display(), error = %e, "Brand image unavailable, continuing without logo");
            None
        }
    }
}
